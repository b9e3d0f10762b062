//! alertcast - fan-out email alerts for detected security events
//!
//! This library provides the notification pipeline: event intake, recipient
//! resolution against a directory store, and alert dispatch through an email
//! delivery provider, served over HTTP.

pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod directory;
pub mod error;
pub mod formatting;
pub mod intake;
pub mod internal_metrics;
pub mod notification;
pub mod pipeline;
pub mod server;

// Re-export core types for convenience
pub use crate::core::*;
pub use error::NotifyError;
