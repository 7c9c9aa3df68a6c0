//! Row-level validation: raw CSV cells to tank records.

use serde::{Deserialize, Serialize};

use super::tokenizer::RawRow;

/// Required column holding the tank capacity.
pub const CAPACITY_COLUMN: &str = "Capacidad";

/// Optional column holding the manufacturer serial number.
pub const SERIAL_NUMBER_COLUMN: &str = "Numero_fabricacion";

/// A tank row that passed validation.
///
/// Serializes to the field names the Apex resource expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedRow {
    #[serde(rename = "Capacidad__c")]
    pub capacity: String,
    #[serde(
        rename = "Numero_fabricacion__c",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub serial_number: Option<String>,
    /// Synthetic list key: `<index>-<capacity>-<serial>`.
    #[serde(rename = "key")]
    pub row_key: String,
}

/// Converts one raw row into a [`ValidatedRow`].
///
/// Returns `None` when the capacity cell is absent or blank; such rows are
/// excluded from the batch without being reported. `index` is the row's
/// position in the tokenized file and is baked into the row key.
pub fn parse(raw_row: &RawRow, index: usize) -> Option<ValidatedRow> {
    let capacity = cell(raw_row, CAPACITY_COLUMN)?;
    let serial_number = cell(raw_row, SERIAL_NUMBER_COLUMN);

    let row_key = row_key(index, &capacity, serial_number.as_deref());

    Some(ValidatedRow {
        capacity,
        serial_number,
        row_key,
    })
}

/// Builds the list key for a row.
pub fn row_key(index: usize, capacity: &str, serial_number: Option<&str>) -> String {
    format!("{}-{}-{}", index, capacity, serial_number.unwrap_or(""))
}

/// Trimmed, non-empty cell value.
fn cell(raw_row: &RawRow, column: &str) -> Option<String> {
    raw_row
        .get(column)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
