//! hookd - service entry point

use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use hookd::adf::AdfClient;
use hookd::cli::Cli;
use hookd::config::APP_INSIGHTS_ENV;
use hookd::handler::AppState;
use hookd::server;

fn setup_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    if std::env::var(APP_INSIGHTS_ENV).is_ok() {
        // Export wiring is owned by the hosting platform, not this process
        info!("Application Insights connection string detected");
    }

    let client = AdfClient::from_env().context("failed to build ADF client")?;
    let state = Arc::new(AppState {
        service: Arc::new(client),
        config_path: cli.config,
    });

    server::serve(&cli.listen, state).await
}
