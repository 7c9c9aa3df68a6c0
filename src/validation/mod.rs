//! Strict pre-flight validation of tank CSV files.
//!
//! Unlike the upload pipeline, which silently drops unusable rows, this
//! reports every problem so the file can be fixed first.

pub mod csv_validator;

pub use csv_validator::{
    validate, validate_bytes, CsvValidationError, CsvValidationResult, CsvValidationStats,
    CsvValidationWarning, LineEndings,
};
