//! Binary entry point: CLI, config, listener, server.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use audit_proxy::config::{loader, ProxyConfig};
use audit_proxy::lifecycle::{self, Shutdown};
use audit_proxy::observability;
use audit_proxy::HttpServer;

#[derive(Parser, Debug)]
#[command(
    name = "audit-proxy",
    about = "Environment-routing reverse proxy with a structured audit trail"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => loader::load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    observability::logging::init_logging(&config.observability.log_level);

    tracing::info!("audit-proxy v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        environments = ?config
            .environments
            .iter()
            .map(|env| env.name.as_str())
            .collect::<Vec<_>>(),
        log_directory = %config.log.directory,
        flush_interval_ms = config.log.flush_interval_ms,
        "Configuration loaded"
    );
    if config.environments.is_empty() {
        tracing::warn!("no environments configured; every request will be rejected");
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Arc::new(Shutdown::new());
    lifecycle::spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
