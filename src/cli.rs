use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tank-loader")]
#[command(version)]
#[command(about = "Bulk-load tanks from a CSV file into a Salesforce org", long_about = None)]
pub struct Cli {
    /// TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Org instance URL, e.g. https://acme.my.salesforce.com
    #[arg(long, env = "SF_INSTANCE_URL", global = true)]
    pub instance_url: Option<String>,

    /// Access token or session id
    #[arg(long, env = "SF_ACCESS_TOKEN", global = true, hide_env_values = true)]
    pub access_token: Option<String>,

    /// Also append logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the tank types available in the org
    Types,

    /// Upload the tanks in a CSV file
    Upload {
        /// CSV file with a Capacidad column and an optional Numero_fabricacion column
        file: PathBuf,

        /// Tank type id for every tank in the file
        #[arg(short = 't', long = "type")]
        type_id: Option<String>,
    },

    /// Show the tanks a CSV file would create, without uploading
    Preview {
        file: PathBuf,
    },

    /// Check a CSV file for problems
    Validate {
        file: PathBuf,
    },
}
