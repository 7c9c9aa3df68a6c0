//! Commands that talk to the org: `types` and `upload`.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use colored::Colorize;
use tracing::{info, warn};

use crate::config::Config;
use crate::coordinator::{SubmissionCoordinator, UploadedFile};
use crate::error::AppError;
use crate::notify::{ConsoleNotifier, Notifier};
use crate::salesforce::{ApexUploadClient, SalesforceClient};

// ─────────────────────────────────────────────────────────────────────────────
// Helper: Build the Apex client from config
// ─────────────────────────────────────────────────────────────────────────────

/// Builds the upload client for the configured org.
///
/// # Errors
/// - `AppError::Config` if the instance URL or token is missing or invalid
/// - `AppError::Internal` if the HTTP client fails to initialize
pub fn build_apex_client(config: &Config) -> Result<ApexUploadClient, AppError> {
    let creds = config.credentials()?;
    info!("[UPLOAD] Using Apex resource {}", config.apex_resource);
    let client = SalesforceClient::with_timeout(creds, config.timeout())?;
    Ok(ApexUploadClient::new(client, &config.apex_resource))
}

fn coordinator(config: &Config) -> Result<SubmissionCoordinator<ApexUploadClient>, AppError> {
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);
    Ok(SubmissionCoordinator::new(build_apex_client(config)?, notifier))
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Prints the tank types available in the org.
pub async fn types(config: &Config) -> Result<ExitCode, AppError> {
    let coordinator = coordinator(config)?;

    if coordinator.initialize().await.is_err() {
        return Ok(ExitCode::FAILURE);
    }

    let options = coordinator.category_options().await;
    if options.is_empty() {
        println!("{}", "No tank types found.".yellow());
        return Ok(ExitCode::SUCCESS);
    }

    let width = options.iter().map(|o| o.value.len()).max().unwrap_or(0);
    println!("{:<width$}  {}", "ID".bold(), "NAME".bold(), width = width);
    for option in options {
        println!("{:<width$}  {}", option.value, option.label, width = width);
    }
    Ok(ExitCode::SUCCESS)
}

/// Uploads every valid row of `file` as one batch.
pub async fn upload(config: &Config, file: &Path, type_id: Option<&str>) -> Result<ExitCode, AppError> {
    let coordinator = coordinator(config)?;
    let file = UploadedFile::read(file).await?;

    if let Err(e) = coordinator.initialize().await {
        if !coordinator.is_ready().await {
            return Ok(ExitCode::FAILURE);
        }
        // Tank types are only needed to check --type.
        warn!("[UPLOAD] Continuing without the tank type list: {}", e);
    }

    if let Some(id) = type_id {
        let categories = coordinator.categories().await;
        if !categories.is_empty() && !categories.iter().any(|c| c.id == id.trim()) {
            eprintln!(
                "{} tank type {} is not in the org's list; sending it anyway",
                "warning:".yellow().bold(),
                id
            );
        }
        coordinator.select_category(id).await;
    }

    match coordinator.upload_file(Some(file)).await {
        Ok(outcome) => {
            for line in coordinator.preview().await {
                println!("  {} {}", line.key.dimmed(), line.text);
            }
            if let Some(created) = outcome.confirmed_count {
                println!("Org confirmed {} tanks created.", created);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(_) => Ok(ExitCode::FAILURE),
    }
}
