//! HomeKey Relay CLI
//!
//! Starts the relay HTTP server for the property assistant.

use anyhow::{Context, Result};
use clap::Parser;
use homekey_relay::{config::RelayConfig, start_server};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "homekey-relay")]
#[command(about = "Streaming property assistant relay", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "HOMEKEY_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, as host:port
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("homekey_relay=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RelayConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            tracing::warn!("No config file specified, using defaults");
            RelayConfig::default()
        }
    };

    let mut config = config
        .with_env_overrides()
        .context("Invalid environment override")?;

    if let Some(bind) = &cli.bind {
        config.set_bind(bind).context("Invalid --bind value")?;
    }

    start_server(config).await?;

    Ok(())
}
