pub mod cli;
pub mod commands;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod notify;
pub mod salesforce;
pub mod validation;

use std::process::ExitCode;

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::error::AppError;

/// Runs one parsed command line.
///
/// Offline commands never touch the config, so they work without an org.
pub async fn run(cli: Cli) -> Result<ExitCode, AppError> {
    match cli.command {
        Command::Preview { file } => commands::preview(&file).await,
        Command::Validate { file } => commands::validate(&file).await,
        Command::Types => {
            let config = load_config(&cli.config, cli.instance_url, cli.access_token)?;
            commands::types(&config).await
        }
        Command::Upload { file, type_id } => {
            let config = load_config(&cli.config, cli.instance_url, cli.access_token)?;
            commands::upload(&config, &file, type_id.as_deref()).await
        }
    }
}

fn load_config(
    path: &Option<std::path::PathBuf>,
    instance_url: Option<String>,
    access_token: Option<String>,
) -> Result<Config, AppError> {
    let config = Config::load(path.as_deref())?.with_overrides(instance_url, access_token);
    config.validate()?;
    Ok(config)
}
