//! Composes the alert email and submits it to the delivery provider.

use crate::core::{DeliveryProvider, OutboundEmail, RecipientSet, SecurityEvent};
use crate::error::NotifyError;
use crate::formatting::AlertFormatter;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Sends one alert per invocation to a resolved recipient set.
///
/// By default every recipient goes into a single submission, so a provider
/// with a per-call recipient cap will reject large sets. Setting
/// `max_recipients_per_message` splits the set into sequential submissions.
pub struct Dispatcher {
    provider: Arc<dyn DeliveryProvider>,
    formatter: Arc<dyn AlertFormatter>,
    sender: String,
    max_recipients_per_message: Option<usize>,
}

impl Dispatcher {
    pub fn new(
        provider: Arc<dyn DeliveryProvider>,
        formatter: Arc<dyn AlertFormatter>,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            formatter,
            sender: sender.into(),
            max_recipients_per_message: None,
        }
    }

    /// Caps the recipients per submission. `None` or `Some(0)` means no cap.
    pub fn with_max_recipients_per_message(mut self, max: Option<usize>) -> Self {
        self.max_recipients_per_message = max.filter(|m| *m > 0);
        self
    }

    /// Builds the message for `recipients` without sending it.
    pub fn compose(&self, event: &SecurityEvent, recipients: &[String]) -> OutboundEmail {
        OutboundEmail {
            from: self.sender.clone(),
            to: recipients.to_vec(),
            subject: self.formatter.subject(event),
            html: self.formatter.html_body(event),
        }
    }

    /// Submits the alert and returns the provider's success payload.
    ///
    /// With more than one chunk the payload is a JSON array of per-chunk
    /// payloads. The first failing chunk aborts the remaining ones.
    #[instrument(skip_all, fields(provider = self.provider.name(), recipients = recipients.len()))]
    pub async fn dispatch(
        &self,
        event: &SecurityEvent,
        recipients: &RecipientSet,
    ) -> Result<Value, NotifyError> {
        if recipients.is_empty() {
            return Err(NotifyError::Unexpected(
                "dispatch called with an empty recipient set".to_string(),
            ));
        }

        let chunk_size = self.max_recipients_per_message.unwrap_or(recipients.len());
        let chunks: Vec<&[String]> = recipients.as_slice().chunks(chunk_size).collect();
        if chunks.len() > 1 {
            warn!(
                chunks = chunks.len(),
                chunk_size, "Recipient set exceeds the per-message cap, splitting submissions"
            );
        }

        let mut payloads = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            let email = self.compose(event, chunk);
            debug!(chunk = i, to = chunk.len(), "Submitting alert email");
            let payload = self.provider.send(&email).await.inspect_err(|e| {
                warn!(chunk = i, error = %e, "Error sending email");
            })?;
            payloads.push(payload);
        }

        info!("Successfully sent emails via {}", self.provider.name());
        if payloads.len() == 1 {
            Ok(payloads.remove(0))
        } else {
            Ok(Value::Array(payloads))
        }
    }
}
