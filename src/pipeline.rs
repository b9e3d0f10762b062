//! The per-invocation notification workflow.
//!
//! `Received → Resolving → { NoRecipients | Dispatching → { Delivered | DeliveryFailed } }`,
//! with `MalformedPayload`, `ConfigMissing` and `DirectoryUnavailable` as
//! the early failure exits. Each stage short-circuits the rest.

use crate::{
    config::Config,
    core::{DeliveryProvider, NotifyOutcome, RecipientDirectory},
    directory::{resolve_recipients, PostgrestDirectory},
    error::NotifyError,
    formatting::{AlertFormatter, HtmlAlertFormatter},
    intake,
    internal_metrics::Metrics,
    notification::{Dispatcher, ResendClient},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};

/// Runs one invocation from raw body to outcome.
///
/// Holds only read-only state. Directory and provider clients are built
/// fresh for every invocation unless an override is installed.
pub struct NotificationPipeline {
    config: Arc<Config>,
    formatter: Arc<dyn AlertFormatter>,
    directory_override: Option<Arc<dyn RecipientDirectory>>,
    provider_override: Option<Arc<dyn DeliveryProvider>>,
    metrics: Metrics,
}

impl NotificationPipeline {
    pub fn new(config: Arc<Config>, metrics: Metrics) -> Self {
        Self {
            config,
            formatter: Arc::new(HtmlAlertFormatter),
            directory_override: None,
            provider_override: None,
            metrics,
        }
    }

    /// Replaces the directory client built from configuration.
    pub fn with_directory(mut self, directory: Arc<dyn RecipientDirectory>) -> Self {
        self.directory_override = Some(directory);
        self
    }

    /// Replaces the delivery provider built from configuration.
    pub fn with_provider(mut self, provider: Arc<dyn DeliveryProvider>) -> Self {
        self.provider_override = Some(provider);
        self
    }

    /// Replaces the default HTML alert rendering.
    pub fn with_formatter(mut self, formatter: Arc<dyn AlertFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Processes one inbound body and records the outcome.
    #[instrument(skip_all)]
    pub async fn run(&self, body: &[u8]) -> Result<NotifyOutcome, NotifyError> {
        self.metrics.events_received_total.increment(1);
        let result = self.process(body).await;
        match &result {
            Ok(NotifyOutcome::NoRecipients) => self.metrics.increment_outcome("no_recipients"),
            Ok(NotifyOutcome::Delivered(_)) => self.metrics.increment_outcome("delivered"),
            Err(e) => {
                error!(kind = e.kind(), "Critical error in notification handler: {}", e);
                self.metrics.increment_outcome("failed");
                self.metrics.increment_error(e.kind());
            }
        }
        result
    }

    async fn process(&self, body: &[u8]) -> Result<NotifyOutcome, NotifyError> {
        let event = intake::parse_event(body)?;
        let settings = self.config.notifier_settings()?;

        let directory: Arc<dyn RecipientDirectory> = match &self.directory_override {
            Some(directory) => directory.clone(),
            None => Arc::new(PostgrestDirectory::from_config(&settings.directory)),
        };
        let recipients = resolve_recipients(directory.as_ref()).await?;
        self.metrics.recipients_resolved.record(recipients.len() as f64);
        if recipients.is_empty() {
            return Ok(NotifyOutcome::NoRecipients);
        }

        let provider: Arc<dyn DeliveryProvider> = match &self.provider_override {
            Some(provider) => provider.clone(),
            None => Arc::new(
                ResendClient::new(settings.api_url.clone(), settings.api_key.clone())
                    .with_timeout(settings.provider_timeout),
            ),
        };
        let dispatcher = Dispatcher::new(provider, self.formatter.clone(), settings.sender.clone())
            .with_max_recipients_per_message(settings.max_recipients_per_message);

        let start = Instant::now();
        let result = dispatcher.dispatch(&event, &recipients).await;
        self.metrics
            .dispatch_duration_seconds
            .record(start.elapsed().as_secs_f64());

        let data = result?;
        info!("Alert for device {} delivered", event.device_id());
        Ok(NotifyOutcome::Delivered(data))
    }
}
