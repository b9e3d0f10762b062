//! Error taxonomy for a single notification invocation.
//!
//! Every stage of the pipeline returns `Result<_, NotifyError>`. The HTTP
//! boundary flattens any variant into the same `500 { "error": ... }` body,
//! so the `Display` text is the only thing a caller ever sees.

use thiserror::Error;

/// Errors that terminate a notification invocation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// A required setting (e.g. the provider API key) is absent.
    #[error("{0} is not set in the service configuration.")]
    ConfigMissing(String),

    /// The inbound body could not be parsed into an event payload.
    #[error("Malformed event payload: {0}")]
    MalformedPayload(String),

    /// The directory store could not be queried.
    #[error("Failed to fetch profiles: {0}")]
    DirectoryUnavailable(String),

    /// The delivery provider rejected the submission or could not be reached.
    #[error("{0}")]
    DeliveryFailed(String),

    /// Anything not anticipated by the other variants.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl NotifyError {
    /// A stable, low-cardinality label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            NotifyError::ConfigMissing(_) => "config_missing",
            NotifyError::MalformedPayload(_) => "malformed_payload",
            NotifyError::DirectoryUnavailable(_) => "directory_unavailable",
            NotifyError::DeliveryFailed(_) => "delivery_failed",
            NotifyError::Unexpected(_) => "unexpected",
        }
    }
}

impl From<serde_json::Error> for NotifyError {
    fn from(e: serde_json::Error) -> Self {
        NotifyError::MalformedPayload(e.to_string())
    }
}
