//! A client for submitting emails to the Resend HTTP API.

use crate::core::{DeliveryProvider, OutboundEmail};
use crate::error::NotifyError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{error, info, instrument};

/// A client for the `POST /emails` endpoint.
pub struct ResendClient {
    api_url: String,
    api_key: String,
    timeout: Duration,
}

impl ResendClient {
    /// Creates a new `ResendClient` against the given API base URL.
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/emails", self.api_url.trim_end_matches('/'))
    }
}

/// Renders a provider error as the JSON text handed back to the caller.
///
/// JSON error bodies are passed through compacted; anything else is wrapped
/// in the same `{ statusCode, name, message }` shape the API uses.
fn error_detail(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value @ Value::Object(_)) => value.to_string(),
        _ => json!({
            "statusCode": status.as_u16(),
            "name": "application_error",
            "message": body,
        })
        .to_string(),
    }
}

fn transport_error(e: &reqwest::Error) -> NotifyError {
    let name = if e.is_timeout() {
        "timeout_error"
    } else {
        "application_error"
    };
    NotifyError::DeliveryFailed(json!({ "name": name, "message": e.to_string() }).to_string())
}

#[async_trait]
impl DeliveryProvider for ResendClient {
    fn name(&self) -> &str {
        "resend"
    }

    #[instrument(skip(self, email), fields(recipients = email.to.len()))]
    async fn send(&self, email: &OutboundEmail) -> Result<Value, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| transport_error(&e))?;

        let response = client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request to Resend failed");
                transport_error(&e)
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| transport_error(&e))?;

        if !status.is_success() {
            error!(status = %status, body = %text, "Error sending email");
            return Err(NotifyError::DeliveryFailed(error_detail(status, &text)));
        }

        info!("Successfully sent email to {} recipients.", email.to.len());
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}
