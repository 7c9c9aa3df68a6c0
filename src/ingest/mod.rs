//! CSV ingest pipeline: tokenizing, row validation and batch assembly.
//!
//! Everything here is pure and synchronous; the coordinator owns all I/O.

pub mod batch;
pub mod row_parser;
pub mod tokenizer;

pub use batch::{assemble, SubmissionBatch};
pub use row_parser::{parse, ValidatedRow, CAPACITY_COLUMN, SERIAL_NUMBER_COLUMN};
pub use tokenizer::{CsvTokenizer, RawRow, Tokenizer};
