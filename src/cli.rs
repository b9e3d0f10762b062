//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the service using the
//! `clap` crate. These arguments are parsed at startup and then merged with
//! the configuration from the `alertcast.toml` file and environment variables.

use clap::Parser;
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Fans out security-event alerts to every subscriber by email.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Socket address to listen on.
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// Sender identity used for outbound alerts.
    #[arg(long, value_name = "MAILBOX")]
    pub sender: Option<String>,

    /// Upper bound on recipients per submission.
    #[arg(long, value_name = "COUNT")]
    pub max_recipients: Option<usize>,

    /// Expose Prometheus metrics at /metrics.
    #[arg(long)]
    pub metrics: bool,

    /// The logging level (overridden by RUST_LOG).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut server = Dict::new();
        let mut provider = Dict::new();
        let mut metrics = Dict::new();
        let mut dict = Dict::new();

        if let Some(listen) = &self.listen {
            server.insert("listen_addr".into(), Value::from(listen.clone()));
        }
        if let Some(sender) = &self.sender {
            provider.insert("sender".into(), Value::from(sender.clone()));
        }
        if let Some(max) = self.max_recipients {
            provider.insert("max_recipients_per_message".into(), Value::from(max as u64));
        }
        // Only an explicit flag overrides; absence leaves the file/env value.
        if self.metrics {
            metrics.insert("enabled".into(), Value::from(true));
        }
        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        for (key, section) in [("server", server), ("provider", provider), ("metrics", metrics)] {
            if !section.is_empty() {
                dict.insert(key.into(), Value::from(section));
            }
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
