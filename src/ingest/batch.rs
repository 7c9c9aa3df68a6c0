//! Batch assembly: tokenized rows to one ordered submission.

use serde::Serialize;

use super::row_parser::{self, ValidatedRow};
use super::tokenizer::RawRow;

/// The full set of validated rows sent in a single remote write.
///
/// Serializes to the Apex request body. An unset category is sent as
/// `null`; the assembler never rejects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionBatch {
    #[serde(rename = "tipoTanqueId")]
    pub category_id: Option<String>,
    #[serde(rename = "datos")]
    pub rows: Vec<ValidatedRow>,
}

impl SubmissionBatch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parses every raw row in input order and keeps the valid ones.
///
/// Row indices are positions in `raw_rows`, so dropped rows leave gaps in
/// the keys rather than renumbering the survivors.
pub fn assemble(raw_rows: &[RawRow], category_id: Option<&str>) -> SubmissionBatch {
    let rows = raw_rows
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| row_parser::parse(raw, index))
        .collect();

    SubmissionBatch {
        category_id: category_id.map(str::to_string),
        rows,
    }
}
