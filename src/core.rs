//! Core domain types and service traits for alertcast
//!
//! This module defines the data structures that flow through a notification
//! invocation and the trait contracts for the two external collaborators:
//! the recipient directory and the email delivery provider.

use crate::error::NotifyError;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A detected security event, as delivered by the upstream trigger.
///
/// Every field is optional on the wire. Absent fields render as empty text
/// in the outbound email instead of failing the invocation. Non-string
/// values (e.g. an integer `device_id` from a database row) are kept as
/// their JSON text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SecurityEvent {
    /// Identifier of the device that captured the event.
    #[serde(default, deserialize_with = "text_or_absent")]
    pub device_id: Option<String>,
    /// Label describing the nature of the threat (e.g. "Intrusion").
    #[serde(default, deserialize_with = "text_or_absent")]
    pub event_type: Option<String>,
    /// Human-readable location of the device.
    #[serde(default, deserialize_with = "text_or_absent")]
    pub location_name: Option<String>,
    /// URL of the image captured alongside the event.
    #[serde(default, deserialize_with = "text_or_absent")]
    pub image_ref: Option<String>,
}

impl SecurityEvent {
    pub fn device_id(&self) -> &str {
        self.device_id.as_deref().unwrap_or_default()
    }

    pub fn event_type(&self) -> &str {
        self.event_type.as_deref().unwrap_or_default()
    }

    pub fn location_name(&self) -> &str {
        self.location_name.as_deref().unwrap_or_default()
    }

    pub fn image_ref(&self) -> &str {
        self.image_ref.as_deref().unwrap_or_default()
    }
}

/// Reads any JSON value as text. `null` counts as absent.
fn text_or_absent<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// The inbound body shape: `{ "record": { ... } }`.
#[derive(Debug, Clone, Deserialize)]
pub struct EventPayload {
    pub record: SecurityEvent,
}

/// One row of the directory store, reduced to the address column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DirectoryRecord {
    pub email: Option<String>,
}

/// The resolved, usable destination addresses for one invocation.
///
/// Order follows the directory. Duplicates are not removed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecipientSet(Vec<String>);

impl RecipientSet {
    /// Builds a set from raw directory records, keeping non-empty addresses.
    pub fn from_records(records: impl IntoIterator<Item = DirectoryRecord>) -> Self {
        Self(
            records
                .into_iter()
                .filter_map(|r| r.email)
                .filter(|email| !email.is_empty())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for RecipientSet {
    fn from(addresses: Vec<String>) -> Self {
        Self(addresses)
    }
}

/// A fully composed message, ready for submission to the provider.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OutboundEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// The two successful terminal states of an invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyOutcome {
    /// The directory yielded no usable addresses; nothing was sent.
    NoRecipients,
    /// The provider accepted the submission; carries its payload verbatim.
    Delivered(Value),
}

// =============================================================================
// Service Traits
// =============================================================================

/// Read-only access to the subscriber directory.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// Fetches every record's address field.
    ///
    /// # Returns
    /// * `Ok(records)` when the query succeeded, possibly with zero rows
    /// * `Err(NotifyError::DirectoryUnavailable)` when the store could not be queried
    async fn fetch_records(&self) -> Result<Vec<DirectoryRecord>, NotifyError>;
}

/// A transactional email transport with a submit-one-batch operation.
#[async_trait]
pub trait DeliveryProvider: Send + Sync {
    /// A short name for logging (e.g. "resend").
    fn name(&self) -> &str;

    /// Submits one message addressed to all of `email.to`.
    ///
    /// # Returns
    /// * `Ok(payload)` with the provider's success payload
    /// * `Err(NotifyError::DeliveryFailed)` carrying the provider's error detail
    async fn send(&self, email: &OutboundEmail) -> Result<Value, NotifyError>;
}
