//! The main application logic, decoupled from the entry point.

use crate::{
    config::Config,
    core::{DeliveryProvider, RecipientDirectory},
    internal_metrics::{Metrics, MetricsBuilder},
    pipeline::NotificationPipeline,
    server::{NotificationServer, ServerState},
};
use anyhow::{Context, Result};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

/// A handle to the running service.
pub struct App {
    local_addr: SocketAddr,
    server_handle: JoinHandle<()>,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// The address the server is actually listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the server to finish after the shutdown signal.
    pub async fn run(self) -> Result<()> {
        self.server_handle.await?;
        info!("Notification server shut down.");
        Ok(())
    }
}

/// Builder for the main application.
///
/// Separates constructing the components from running them, and lets tests
/// swap the external collaborators for fakes.
pub struct AppBuilder {
    config: Config,
    directory_override: Option<Arc<dyn RecipientDirectory>>,
    provider_override: Option<Arc<dyn DeliveryProvider>>,
    metrics_override: Option<Metrics>,
}

impl AppBuilder {
    /// Creates a new `AppBuilder` with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            directory_override: None,
            provider_override: None,
            metrics_override: None,
        }
    }

    /// Overrides the recipient directory for testing.
    pub fn directory_override(mut self, directory: Arc<dyn RecipientDirectory>) -> Self {
        self.directory_override = Some(directory);
        self
    }

    /// Overrides the delivery provider for testing.
    pub fn provider_override(mut self, provider: Arc<dyn DeliveryProvider>) -> Self {
        self.provider_override = Some(provider);
        self
    }

    /// Overrides the metrics system for testing.
    pub fn metrics_override(mut self, metrics: Metrics) -> Self {
        self.metrics_override = Some(metrics);
        self
    }

    /// Binds the listener and spawns the server, returning a runnable `App`.
    #[instrument(skip_all)]
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let config = Arc::new(self.config);

        let (metrics, prom_handle) = match self.metrics_override {
            Some(m) => (m, None),
            None => MetricsBuilder::new(config.metrics.clone()).build(),
        };

        let mut pipeline = NotificationPipeline::new(config.clone(), metrics);
        if let Some(directory) = self.directory_override {
            pipeline = pipeline.with_directory(directory);
        }
        if let Some(provider) = self.provider_override {
            pipeline = pipeline.with_provider(provider);
        }

        let listener = TcpListener::bind(config.server.listen_addr.as_str())
            .await
            .with_context(|| format!("Failed to bind {}", config.server.listen_addr))?;
        let local_addr = listener.local_addr()?;

        let state = ServerState {
            pipeline: Arc::new(pipeline),
            prom_handle,
        };
        let server = NotificationServer::new(listener, state, shutdown_rx);
        let server_handle = tokio::spawn(server.run());
        info!("Listening for events on {}", local_addr);

        Ok(App {
            local_addr,
            server_handle,
        })
    }
}
