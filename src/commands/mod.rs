//! Subcommand handlers for the `tank-loader` binary.
//!
//! Handlers return the process exit code. Failures that were already shown
//! to the user as a toast come back as `ExitCode::FAILURE`, not as `Err`.

pub mod inspect;
pub mod upload;

pub use inspect::{preview, validate};
pub use upload::{types, upload};
