//! CLI definition for the webhook service

use std::path::PathBuf;

use clap::Parser;

/// hookd - dbt Cloud run-completion webhook
#[derive(Parser)]
#[command(
    name = "hookd",
    about = "Webhook that triggers an ADF pipeline when a dbt Cloud run completes",
    version
)]
pub struct Cli {
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Path to the trigger config file (pipeline name + parameters)
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
