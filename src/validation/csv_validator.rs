//! Pre-flight validation of a tank CSV.
//!
//! The upload pipeline itself is lenient: it drops rows without a capacity
//! and tolerates ragged lines. This validator is the strict counterpart,
//! reporting every problem it finds so the file can be fixed before upload:
//! - UTF-8 encoding errors
//! - Missing headers or a missing `Capacidad` column
//! - Inconsistent column counts
//! - Rows that would be dropped for lacking a capacity
//! - Line ending style

use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::ingest::{row_parser, tokenizer, CAPACITY_COLUMN, SERIAL_NUMBER_COLUMN};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// UTF-8 BOM bytes.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Inconsistent rows reported individually before the rest are summarized.
const MAX_REPORTED_ROW_ERRORS: usize = 20;

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// Result of CSV validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvValidationResult {
    /// Whether the file passed validation (no errors).
    pub ok: bool,
    pub errors: Vec<CsvValidationError>,
    pub warnings: Vec<CsvValidationWarning>,
    pub stats: CsvValidationStats,
}

/// Statistics collected during validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CsvValidationStats {
    pub file_size_bytes: u64,
    pub headers: Vec<String>,
    pub column_count: usize,
    pub line_endings: LineEndings,
    /// Non-empty data lines.
    pub data_rows: u64,
    /// Data lines that would make it into a batch.
    pub uploadable_rows: u64,
}

/// Detected line ending style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineEndings {
    LF,
    CRLF,
    Mixed,
    #[default]
    Unknown,
}

/// Problems that make the file unfit for upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CsvValidationError {
    NotUtf8,
    EmptyFile,
    NoHeaders,
    MissingRequiredColumn {
        column: String,
    },
    /// Row has inconsistent number of columns (1-based, header is row 1).
    InconsistentColumns {
        expected: usize,
        found: usize,
        row: u64,
    },
    CsvParseError {
        message: String,
    },
}

/// Issues that do not block the upload but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CsvValidationWarning {
    HasBom,
    MixedLineEndings,
    /// The serial number column is absent; tanks are created without one.
    MissingOptionalColumn {
        column: String,
    },
    /// Column names that appear more than once; the first occurrence wins.
    DuplicateColumn {
        column: String,
    },
    /// Rows that will be skipped because their capacity is blank.
    RowsWithoutCapacity {
        count: u64,
        /// 1-based file rows of the first few skipped rows.
        first_rows: Vec<u64>,
    },
    /// More inconsistent rows exist than were reported.
    MoreInconsistentRows {
        count: u64,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Validates the CSV file at `path`.
///
/// # Errors
///
/// Returns `AppError::FileUnreadable` only when the file cannot be read.
/// Validation problems are returned in `CsvValidationResult.errors`.
pub async fn validate(path: &Path) -> Result<CsvValidationResult, AppError> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| AppError::FileUnreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    let result = validate_bytes(&data);
    info!(
        "[CSV] Validated {} bytes: ok={}, {} errors, {} warnings",
        data.len(),
        result.ok,
        result.errors.len(),
        result.warnings.len()
    );
    Ok(result)
}

/// Validates CSV content already in memory.
pub fn validate_bytes(buffer: &[u8]) -> CsvValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut stats = CsvValidationStats {
        file_size_bytes: buffer.len() as u64,
        ..Default::default()
    };

    if buffer.is_empty() {
        return finish(vec![CsvValidationError::EmptyFile], warnings, stats);
    }

    let data = match buffer.strip_prefix(UTF8_BOM) {
        Some(rest) => {
            warnings.push(CsvValidationWarning::HasBom);
            rest
        }
        None => buffer,
    };

    if std::str::from_utf8(data).is_err() {
        return finish(vec![CsvValidationError::NotUtf8], warnings, stats);
    }

    stats.line_endings = detect_line_endings(data);
    if stats.line_endings == LineEndings::Mixed {
        warnings.push(CsvValidationWarning::MixedLineEndings);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(Cursor::new(data));

    let headers: Vec<String> = match reader.headers() {
        Ok(h) => h.iter().map(|name| name.trim().to_string()).collect(),
        Err(e) => {
            errors.push(CsvValidationError::CsvParseError {
                message: e.to_string(),
            });
            return finish(errors, warnings, stats);
        }
    };

    if headers.iter().all(|h| h.is_empty()) {
        errors.push(CsvValidationError::NoHeaders);
        return finish(errors, warnings, stats);
    }

    check_columns(&headers, &mut errors, &mut warnings);
    stats.column_count = headers.len();
    stats.headers = headers;

    let mut inconsistent: u64 = 0;
    let mut skipped_rows: Vec<u64> = Vec::new();
    let mut skipped_count: u64 = 0;

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                errors.push(CsvValidationError::CsvParseError {
                    message: e.to_string(),
                });
                break;
            }
        };

        if record.iter().all(str::is_empty) {
            continue;
        }

        // Position line is where the record starts; header is line 1.
        let row = record
            .position()
            .map(|p| p.line())
            .unwrap_or(stats.data_rows + 2);

        if record.len() != stats.column_count {
            inconsistent += 1;
            if (inconsistent as usize) <= MAX_REPORTED_ROW_ERRORS {
                errors.push(CsvValidationError::InconsistentColumns {
                    expected: stats.column_count,
                    found: record.len(),
                    row,
                });
            }
        }

        let raw = tokenizer::to_row(&stats.headers, &record);
        if row_parser::parse(&raw, stats.data_rows as usize).is_some() {
            stats.uploadable_rows += 1;
        } else {
            skipped_count += 1;
            if skipped_rows.len() < MAX_REPORTED_ROW_ERRORS {
                skipped_rows.push(row);
            }
        }
        stats.data_rows += 1;
    }

    if inconsistent as usize > MAX_REPORTED_ROW_ERRORS {
        warnings.push(CsvValidationWarning::MoreInconsistentRows {
            count: inconsistent - MAX_REPORTED_ROW_ERRORS as u64,
        });
    }

    if skipped_count > 0 && stats.headers.iter().any(|h| h == CAPACITY_COLUMN) {
        warnings.push(CsvValidationWarning::RowsWithoutCapacity {
            count: skipped_count,
            first_rows: skipped_rows,
        });
    }

    finish(errors, warnings, stats)
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn finish(
    errors: Vec<CsvValidationError>,
    warnings: Vec<CsvValidationWarning>,
    stats: CsvValidationStats,
) -> CsvValidationResult {
    CsvValidationResult {
        ok: errors.is_empty(),
        errors,
        warnings,
        stats,
    }
}

fn check_columns(
    headers: &[String],
    errors: &mut Vec<CsvValidationError>,
    warnings: &mut Vec<CsvValidationWarning>,
) {
    if !headers.iter().any(|h| h == CAPACITY_COLUMN) {
        errors.push(CsvValidationError::MissingRequiredColumn {
            column: CAPACITY_COLUMN.to_string(),
        });
    }
    if !headers.iter().any(|h| h == SERIAL_NUMBER_COLUMN) {
        warnings.push(CsvValidationWarning::MissingOptionalColumn {
            column: SERIAL_NUMBER_COLUMN.to_string(),
        });
    }

    let mut seen = HashSet::new();
    for header in headers.iter().filter(|h| !h.is_empty()) {
        if !seen.insert(header) {
            warnings.push(CsvValidationWarning::DuplicateColumn {
                column: header.clone(),
            });
        }
    }
}

/// Detects line ending style in the given bytes.
fn detect_line_endings(data: &[u8]) -> LineEndings {
    let mut has_lf = false;
    let mut has_crlf = false;

    for (i, &byte) in data.iter().enumerate() {
        if byte == b'\n' {
            if i > 0 && data[i - 1] == b'\r' {
                has_crlf = true;
            } else {
                has_lf = true;
            }
        }
    }

    match (has_lf, has_crlf) {
        (true, true) => LineEndings::Mixed,
        (true, false) => LineEndings::LF,
        (false, true) => LineEndings::CRLF,
        (false, false) => LineEndings::Unknown,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content).expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[tokio::test]
    async fn valid_file_passes() {
        let file = create_temp_csv(b"Capacidad,Numero_fabricacion\n100,SN-1\n50,SN-2\n");

        let result = validate(file.path()).await.expect("Validation should not fail");

        assert!(result.ok, "{:?}", result.errors);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        assert_eq!(result.stats.headers, vec!["Capacidad", "Numero_fabricacion"]);
        assert_eq!(result.stats.data_rows, 2);
        assert_eq!(result.stats.uploadable_rows, 2);
        assert_eq!(result.stats.line_endings, LineEndings::LF);
    }

    #[tokio::test]
    async fn missing_file_is_an_app_error() {
        let dir = tempfile::tempdir().unwrap();

        let result = validate(&dir.path().join("absent.csv")).await;

        match result {
            Err(AppError::FileUnreadable { path, .. }) => assert!(path.ends_with("absent.csv")),
            other => panic!("expected FileUnreadable, got {:?}", other.map(|r| r.ok)),
        }
    }

    #[test]
    fn empty_file_error() {
        let result = validate_bytes(b"");

        assert!(!result.ok);
        assert_eq!(result.errors, vec![CsvValidationError::EmptyFile]);
    }

    #[test]
    fn non_utf8_returns_error() {
        let result = validate_bytes(b"Capacidad\n\xff\xfe\n");

        assert!(!result.ok);
        assert!(result.errors.contains(&CsvValidationError::NotUtf8));
    }

    #[test]
    fn bom_is_a_warning() {
        let mut content = Vec::new();
        content.extend_from_slice(UTF8_BOM);
        content.extend_from_slice(b"Capacidad,Numero_fabricacion\n10,A\n");

        let result = validate_bytes(&content);

        assert!(result.ok);
        assert!(result.warnings.contains(&CsvValidationWarning::HasBom));
        assert_eq!(result.stats.headers[0], "Capacidad");
    }

    #[test]
    fn missing_capacity_column_is_an_error() {
        let result = validate_bytes(b"Volumen,Numero_fabricacion\n10,A\n");

        assert!(!result.ok);
        assert!(result.errors.contains(&CsvValidationError::MissingRequiredColumn {
            column: "Capacidad".into()
        }));
        assert_eq!(result.stats.uploadable_rows, 0);
    }

    #[test]
    fn missing_serial_column_is_a_warning() {
        let result = validate_bytes(b"Capacidad\n10\n");

        assert!(result.ok);
        assert!(result.warnings.contains(&CsvValidationWarning::MissingOptionalColumn {
            column: "Numero_fabricacion".into()
        }));
    }

    #[test]
    fn blank_capacities_are_counted() {
        let result = validate_bytes(b"Capacidad,Numero_fabricacion\n100,A\n,B\n  ,C\n50,D\n");

        assert!(result.ok);
        assert_eq!(result.stats.data_rows, 4);
        assert_eq!(result.stats.uploadable_rows, 2);
        assert!(result.warnings.contains(&CsvValidationWarning::RowsWithoutCapacity {
            count: 2,
            first_rows: vec![3, 4],
        }));
    }

    #[test]
    fn inconsistent_columns_detected() {
        let result =
            validate_bytes(b"Capacidad,Numero_fabricacion\n100,A\n200,B,Extra\n300,C\n");

        assert!(!result.ok);
        assert!(result.errors.contains(&CsvValidationError::InconsistentColumns {
            expected: 2,
            found: 3,
            row: 3,
        }));
    }

    #[test]
    fn many_inconsistent_rows_are_summarized() {
        let mut content = String::from("Capacidad,Numero_fabricacion\n");
        for i in 0..25 {
            content.push_str(&format!("{}\n", i + 1));
        }

        let result = validate_bytes(content.as_bytes());

        let reported = result
            .errors
            .iter()
            .filter(|e| matches!(e, CsvValidationError::InconsistentColumns { .. }))
            .count();
        assert_eq!(reported, MAX_REPORTED_ROW_ERRORS);
        assert!(result
            .warnings
            .contains(&CsvValidationWarning::MoreInconsistentRows { count: 5 }));
    }

    #[test]
    fn duplicate_columns_warn() {
        let result = validate_bytes(b"Capacidad,Capacidad,Numero_fabricacion\n1,2,A\n");

        assert!(result.warnings.contains(&CsvValidationWarning::DuplicateColumn {
            column: "Capacidad".into()
        }));
    }

    #[test]
    fn headers_only_is_valid() {
        let result = validate_bytes(b"Capacidad,Numero_fabricacion\n");

        assert!(result.ok);
        assert_eq!(result.stats.data_rows, 0);
    }

    #[test]
    fn quoted_newlines_count_as_one_row() {
        let result = validate_bytes(b"Capacidad,Numero_fabricacion\n\"100\",\"SN\n1\"\n");

        assert!(result.ok, "{:?}", result.errors);
        assert_eq!(result.stats.data_rows, 1);
    }

    #[test]
    fn detect_line_endings_variants() {
        assert_eq!(detect_line_endings(b"a\nb\n"), LineEndings::LF);
        assert_eq!(detect_line_endings(b"a\r\nb\r\n"), LineEndings::CRLF);
        assert_eq!(detect_line_endings(b"a\r\nb\n"), LineEndings::Mixed);
        assert_eq!(detect_line_endings(b"single line"), LineEndings::Unknown);
    }

    #[test]
    fn mixed_line_endings_warn() {
        let result = validate_bytes(b"Capacidad,Numero_fabricacion\r\n1,A\n2,B\r\n");

        assert!(result.warnings.contains(&CsvValidationWarning::MixedLineEndings));
    }
}
