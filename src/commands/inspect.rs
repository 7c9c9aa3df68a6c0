//! Offline commands: `preview` and `validate`.

use std::path::Path;
use std::process::ExitCode;

use colored::Colorize;

use crate::coordinator::{PreviewLine, UploadedFile};
use crate::error::AppError;
use crate::ingest::{assemble, CsvTokenizer, SubmissionBatch, Tokenizer};
use crate::validation::{self, CsvValidationResult};

/// Tokenizes and assembles `bytes` exactly as an upload would.
pub fn build_preview(bytes: &[u8]) -> Result<(usize, SubmissionBatch), AppError> {
    let raw_rows = CsvTokenizer::default().tokenize(bytes)?;
    let batch = assemble(&raw_rows, None);
    Ok((raw_rows.len(), batch))
}

/// Prints the tanks `file` would create.
pub async fn preview(file: &Path) -> Result<ExitCode, AppError> {
    let file = UploadedFile::read(file).await?;
    let (total, batch) = build_preview(&file.bytes)?;

    println!(
        "{}: {} of {} rows would be uploaded",
        file.name.bold(),
        batch.len(),
        total
    );
    for line in batch.rows.iter().map(PreviewLine::from) {
        println!("  {} {}", line.key.dimmed(), line.text);
    }
    Ok(ExitCode::SUCCESS)
}

/// Checks `file` and prints every problem found.
pub async fn validate(file: &Path) -> Result<ExitCode, AppError> {
    let result = validation::validate(file).await?;
    print_validation(&result);

    Ok(if result.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_validation(result: &CsvValidationResult) {
    let stats = &result.stats;
    println!(
        "{} bytes, {} columns, {:?} line endings",
        stats.file_size_bytes, stats.column_count, stats.line_endings
    );
    println!(
        "{} data rows, {} uploadable",
        stats.data_rows, stats.uploadable_rows
    );

    for error in &result.errors {
        println!("{} {:?}", "error:".red().bold(), error);
    }
    for warning in &result.warnings {
        println!("{} {:?}", "warning:".yellow().bold(), warning);
    }

    if result.ok {
        println!("{}", "File is valid.".green().bold());
    } else {
        println!("{}", "File is not valid.".red().bold());
    }
}
