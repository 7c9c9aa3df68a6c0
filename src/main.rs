use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use tank_loader::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = tank_loader::logging::init(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("{} {}", "error:".red().bold(), e);
        return ExitCode::FAILURE;
    }

    match tank_loader::run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            let presentation = e.to_presentation();
            eprintln!(
                "{} {}",
                format!("✖ {}:", presentation.title).red().bold(),
                presentation.message
            );
            ExitCode::FAILURE
        }
    }
}
