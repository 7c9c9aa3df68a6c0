//! Header-keyed CSV tokenizer.
//!
//! Turns an uploaded file into one [`RawRow`] per data line, keyed by the
//! header names. The tokenizer is deliberately lenient: short rows simply
//! lack the missing columns, surplus cells are ignored, and blank lines are
//! skipped. Only undecodable input is reported as an error.

use std::collections::HashMap;
use std::io::Cursor;

use csv::{ReaderBuilder, Trim};
use tracing::debug;

use crate::error::AppError;

/// UTF-8 BOM bytes.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// One tokenized CSV line: column name to cell value.
pub type RawRow = HashMap<String, String>;

/// Splits a CSV file into header-keyed rows.
///
/// Implementations must be usable from any task once loaded.
pub trait Tokenizer: Send + Sync {
    /// Tokenizes the whole file.
    ///
    /// # Errors
    ///
    /// Returns `AppError::CsvInvalid` when the file cannot be decoded.
    fn tokenize(&self, data: &[u8]) -> Result<Vec<RawRow>, AppError>;
}

/// [`Tokenizer`] backed by the `csv` crate.
///
/// The first record is the header row and lines whose cells are all empty
/// are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvTokenizer;

impl Tokenizer for CsvTokenizer {
    fn tokenize(&self, data: &[u8]) -> Result<Vec<RawRow>, AppError> {
        let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::None)
            .from_reader(Cursor::new(data));

        let mut records = reader.records();

        let columns: Vec<String> = match records.next() {
            Some(header) => header
                .map_err(|e| AppError::CsvInvalid(e.to_string()))?
                .iter()
                .map(|h| h.trim().to_string())
                .collect(),
            None => return Ok(Vec::new()),
        };

        let mut rows = Vec::new();
        for result in records {
            let record = result.map_err(|e| AppError::CsvInvalid(e.to_string()))?;

            if record.iter().all(str::is_empty) {
                continue;
            }

            rows.push(to_row(&columns, &record));
        }

        debug!("[CSV] Tokenized {} data rows, {} columns", rows.len(), columns.len());
        Ok(rows)
    }
}

/// Pairs cells with column names. The first occurrence of a duplicated
/// column name wins.
pub(crate) fn to_row(columns: &[String], record: &csv::StringRecord) -> RawRow {
    let mut row = RawRow::with_capacity(columns.len());
    for (name, value) in columns.iter().zip(record.iter()) {
        row.entry(name.clone()).or_insert_with(|| value.to_string());
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(data: &[u8]) -> Result<Vec<RawRow>, AppError> {
        CsvTokenizer.tokenize(data)
    }

    #[test]
    fn rows_are_keyed_by_header() {
        let rows = tokenize(b"Capacidad,Numero_fabricacion\n100,SN-1\n50,SN-2\n").unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Capacidad"], "100");
        assert_eq!(rows[0]["Numero_fabricacion"], "SN-1");
        assert_eq!(rows[1]["Capacidad"], "50");
    }

    #[test]
    fn empty_lines_are_skipped() {
        let rows = tokenize(b"Capacidad\n100\n\n\n50\n").unwrap();

        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn header_only_file_has_no_rows() {
        let rows = tokenize(b"Capacidad,Numero_fabricacion\n").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn zero_byte_file_has_no_rows() {
        let rows = tokenize(b"").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn bom_is_stripped_from_first_header() {
        let mut content = Vec::new();
        content.extend_from_slice(UTF8_BOM);
        content.extend_from_slice(b"Capacidad\n75\n");

        let rows = tokenize(&content).unwrap();

        assert_eq!(rows[0]["Capacidad"], "75");
    }

    #[test]
    fn header_names_are_trimmed() {
        let rows = tokenize(b" Capacidad , Numero_fabricacion\n10,A\n").unwrap();

        assert_eq!(rows[0]["Capacidad"], "10");
        assert_eq!(rows[0]["Numero_fabricacion"], "A");
    }

    #[test]
    fn short_rows_lack_missing_columns() {
        let rows = tokenize(b"Numero_fabricacion,Capacidad\nSN-9\n").unwrap();

        assert_eq!(rows[0]["Numero_fabricacion"], "SN-9");
        assert!(!rows[0].contains_key("Capacidad"));
    }

    #[test]
    fn surplus_cells_are_ignored() {
        let rows = tokenize(b"Capacidad\n10,extra,more\n").unwrap();

        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0]["Capacidad"], "10");
    }

    #[test]
    fn quoted_cells_keep_commas_and_newlines() {
        let rows = tokenize(b"Capacidad,Notas\n\"1,000\",\"line1\nline2\"\n").unwrap();

        assert_eq!(rows[0]["Capacidad"], "1,000");
        assert_eq!(rows[0]["Notas"], "line1\nline2");
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let result = tokenize(b"Capacidad\n\xff\xfe\n");

        assert!(matches!(result, Err(AppError::CsvInvalid(_))));
    }

    #[test]
    fn duplicate_header_keeps_first_value() {
        let rows = tokenize(b"Capacidad,Capacidad\n10,20\n").unwrap();

        assert_eq!(rows[0]["Capacidad"], "10");
    }
}
