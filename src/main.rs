//! alertcast - Security Event Alert Fan-out
//!
//! Receives security-event payloads over HTTP and emails an alert to every
//! subscriber in the directory.

use alertcast::{app::App, cli::Cli, config::Config};
use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            tracing_subscriber::fmt().init();
            error!("Failed to load configuration: {}", err);
            std::process::exit(1);
        }
    };

    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("alertcast starting up...");

    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Listen Address: {}", config.server.listen_addr);
    info!("Provider API URL: {}", config.provider.api_url);
    info!(
        "Provider API Key: {}",
        if config.provider.api_key.is_some() {
            "Set"
        } else {
            "Not set (invocations will fail)"
        }
    );
    info!("Sender: {}", config.provider.sender);
    match config.provider.max_recipients_per_message {
        Some(max) => info!("Max Recipients Per Message: {}", max),
        None => info!("Max Recipients Per Message: Unlimited (single batch)"),
    }
    info!("Directory URL: {}", config.directory.url);
    info!(
        "Directory Source: {}.{}",
        config.directory.table, config.directory.column
    );
    info!(
        "Metrics: {}",
        if config.metrics.enabled {
            "Enabled"
        } else {
            "Disabled"
        }
    );
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let app = App::builder(config).build(shutdown_rx).await?;

    info!("alertcast initialized successfully. Waiting for events...");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Shutting down gracefully...");
    // Receivers may already be gone if the server exited on its own.
    let _ = shutdown_tx.send(true);

    app.run().await?;
    info!("All tasks shut down. Exiting.");
    Ok(())
}
