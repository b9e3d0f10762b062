//! A directory client for PostgREST-style REST endpoints (e.g. Supabase).

use crate::config::DirectoryConfig;
use crate::core::{DirectoryRecord, RecipientDirectory};
use crate::error::NotifyError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{error, instrument};

/// Reads one column of one table over `GET /rest/v1/{table}?select={column}`.
pub struct PostgrestDirectory {
    base_url: String,
    service_key: String,
    table: String,
    column: String,
    timeout: Duration,
}

impl PostgrestDirectory {
    pub fn new(
        base_url: impl Into<String>,
        service_key: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            service_key: service_key.into(),
            table: table.into(),
            column: column.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn from_config(config: &DirectoryConfig) -> Self {
        Self::new(
            config.url.clone(),
            config.service_key.clone(),
            config.table.clone(),
            config.column.clone(),
        )
        .with_timeout(config.timeout())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), self.table)
    }

    /// Pulls the configured column out of one row. Non-string values count as missing.
    fn to_record(&self, row: &Map<String, Value>) -> DirectoryRecord {
        DirectoryRecord {
            email: row.get(&self.column).and_then(Value::as_str).map(str::to_string),
        }
    }
}

/// Prefers the `message` field of a PostgREST error body, falling back to the raw text.
fn error_detail(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| format!("status {}, body: {}", status, body))
}

#[async_trait]
impl RecipientDirectory for PostgrestDirectory {
    #[instrument(skip(self), fields(table = %self.table, column = %self.column))]
    async fn fetch_records(&self) -> Result<Vec<DirectoryRecord>, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| NotifyError::DirectoryUnavailable(e.to_string()))?;

        let response = client
            .get(self.endpoint())
            .query(&[("select", self.column.as_str())])
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request to directory failed");
                NotifyError::DirectoryUnavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(status = %status, body = %text, "Directory query was rejected");
            return Err(NotifyError::DirectoryUnavailable(error_detail(status, &text)));
        }

        let rows: Vec<Map<String, Value>> = response
            .json()
            .await
            .map_err(|e| NotifyError::DirectoryUnavailable(e.to_string()))?;

        Ok(rows.iter().map(|row| self.to_record(row)).collect())
    }
}
