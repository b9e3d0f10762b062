//! Configuration management for alertcast
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all service settings. It uses the `figment`
//! crate to layer defaults, an optional `alertcast.toml` file, environment
//! variables and command-line arguments.

use crate::cli::Cli;
use crate::error::NotifyError;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Config file consulted when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "alertcast.toml";

/// Deployment secrets recognised under their conventional names.
const SECRET_ENV_VARS: [(&str, &str); 3] = [
    ("RESEND_API_KEY", "provider.api_key"),
    ("SUPABASE_URL", "directory.url"),
    ("SUPABASE_SERVICE_ROLE_KEY", "directory.service_key"),
];

/// The main configuration struct for the service.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// The logging level for the service.
    pub log_level: String,
    /// Configuration for the inbound HTTP server.
    pub server: ServerConfig,
    /// Configuration for the email delivery provider.
    pub provider: ProviderConfig,
    /// Configuration for the recipient directory.
    pub directory: DirectoryConfig,
    /// Configuration for the Prometheus exporter.
    pub metrics: MetricsConfig,
}

/// Configuration for the inbound HTTP server.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on, e.g. "0.0.0.0:8080".
    pub listen_addr: String,
}

/// Configuration for the email delivery provider.
#[derive(Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    /// API key for the provider. Required for every invocation.
    pub api_key: Option<String>,
    /// Base URL of the provider's HTTP API.
    pub api_url: String,
    /// Sender identity, e.g. "Display Name <address@example.com>".
    pub sender: String,
    /// Per-request timeout for submissions.
    pub timeout_seconds: u64,
    /// Upper bound on recipients per submission. Unset sends a single batch.
    pub max_recipients_per_message: Option<usize>,
}

/// Configuration for the recipient directory.
#[derive(Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Base URL of the directory store.
    pub url: String,
    /// Privileged access key for the directory store.
    pub service_key: String,
    /// Collection holding subscriber records.
    pub table: String,
    /// Field holding each subscriber's address.
    pub column: String,
    /// Per-request timeout for directory queries.
    pub timeout_seconds: u64,
}

/// Configuration for the Prometheus exporter.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct MetricsConfig {
    /// Expose `GET /metrics` on the main listener.
    pub enabled: bool,
}

/// Settings resolved and validated at the start of an invocation.
#[derive(Clone)]
pub struct NotifierSettings {
    pub api_key: String,
    pub api_url: String,
    pub sender: String,
    pub provider_timeout: Duration,
    pub max_recipients_per_message: Option<usize>,
    pub directory: DirectoryConfig,
}

impl Config {
    /// Loads the configuration by layering defaults, the TOML file,
    /// environment variables and command-line arguments, in that order.
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.into());

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(secret_env())
            // e.g. ALERTCAST_PROVIDER__SENDER="Alerts <alerts@example.com>"
            .merge(Env::prefixed("ALERTCAST_").split("__"))
            .merge(cli.clone())
            .extract()?;
        Ok(config)
    }

    /// Validates the settings needed to run one invocation.
    ///
    /// Only the provider API key is mandatory. A blank directory URL is
    /// allowed here and fails later as an unreachable directory.
    pub fn notifier_settings(&self) -> Result<NotifierSettings, NotifyError> {
        let api_key = self
            .provider
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| NotifyError::ConfigMissing("RESEND_API_KEY".to_string()))?;

        Ok(NotifierSettings {
            api_key: api_key.to_string(),
            api_url: self.provider.api_url.clone(),
            sender: self.provider.sender.clone(),
            provider_timeout: Duration::from_secs(self.provider.timeout_seconds),
            max_recipients_per_message: self.provider.max_recipients_per_message,
            directory: self.directory.clone(),
        })
    }
}

/// Maps the conventional secret variable names onto config keys.
fn secret_env() -> Env {
    let names: Vec<&str> = SECRET_ENV_VARS.iter().map(|(name, _)| *name).collect();
    Env::raw().only(&names).map(|key| {
        SECRET_ENV_VARS
            .iter()
            .find(|(name, _)| key == *name)
            .map(|(_, target)| (*target).into())
            .unwrap_or_else(|| key.as_str().into())
    })
}

impl DirectoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("sender", &self.sender)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("max_recipients_per_message", &self.max_recipients_per_message)
            .finish()
    }
}

impl fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("url", &self.url)
            .field("service_key", &"<redacted>")
            .field("table", &self.table)
            .field("column", &self.column)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            server: ServerConfig::default(),
            provider: ProviderConfig::default(),
            directory: DirectoryConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "https://api.resend.com".to_string(),
            sender: "Smart Anti Theft System <onboarding@resend.dev>".to_string(),
            timeout_seconds: 10,
            max_recipients_per_message: None,
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            service_key: String::new(),
            table: "profiles".to_string(),
            column: "email".to_string(),
            timeout_seconds: 10,
        }
    }
}
