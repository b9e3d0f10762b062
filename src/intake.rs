//! Event intake: turns a raw inbound body into a `SecurityEvent`.

use crate::core::{EventPayload, SecurityEvent};
use crate::error::NotifyError;
use tracing::info;

/// Parses `{ "record": { ... } }` and returns the nested event.
///
/// The `record` wrapper is mandatory. Fields inside it are not: a record of
/// `{}` is accepted and renders as empty text downstream.
pub fn parse_event(body: &[u8]) -> Result<SecurityEvent, NotifyError> {
    let payload: EventPayload = serde_json::from_slice(body)?;
    let event = payload.record;
    info!("New event received for device: {}", event.device_id());
    Ok(event)
}
