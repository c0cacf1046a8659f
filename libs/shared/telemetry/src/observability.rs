// [libs/shared/telemetry/src/observability.rs]
//! Streams log records to the platform's progress endpoint
//! (`POST /po/stream_logs`, spec.md §6). This is C6 in the component
//! table: a thin, infallible-from-the-caller's-perspective adapter —
//! stream failures are logged through `tracing` and never propagated,
//! since losing one progress line must never interrupt the analysis.

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::record::LogRecord;

#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("progress endpoint unreachable: {0}")]
    Network(#[from] reqwest::Error),
    #[error("progress endpoint rejected the record with status {0}")]
    Rejected(u16),
}

#[derive(Serialize)]
struct StreamLogPayload<'a> {
    log: &'a str,
    log_type: &'a str,
    analysis_id: &'a str,
    status: &'a str,
}

pub struct ObservabilityClient {
    http: Client,
    base_url: String,
    analysis_id: String,
}

impl ObservabilityClient {
    pub fn new(base_url: impl Into<String>, analysis_id: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("failed to build observability HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            analysis_id: analysis_id.into(),
        }
    }

    pub async fn stream(&self, record: &LogRecord) -> Result<(), ObservabilityError> {
        let url = format!("{}/po/stream_logs", self.base_url);
        let payload = StreamLogPayload {
            log: &record.message,
            log_type: &record.log_type,
            analysis_id: &self.analysis_id,
            status: record.run_status_label(),
        };
        let response = self.http.post(&url).json(&payload).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ObservabilityError::Rejected(response.status().as_u16()))
        }
    }

    /// Best-effort send: logs a warning on failure instead of raising
    /// (spec.md §7: transient network failures on this path are
    /// non-fatal observability noise, not analysis-blocking errors).
    pub async fn stream_best_effort(&self, record: &LogRecord) {
        if let Err(err) = self.stream(record).await {
            warn!(error = %err, "failed to stream log record to observability endpoint");
        }
    }
}

trait RunStatusLabel {
    fn run_status_label(&self) -> &'static str;
}

impl RunStatusLabel for LogRecord {
    fn run_status_label(&self) -> &'static str {
        match self.run_status {
            flame_domain_models::RunState::Starting => "starting",
            flame_domain_models::RunState::Running => "running",
            flame_domain_models::RunState::Finished => "finished",
            flame_domain_models::RunState::Failed => "failed",
            flame_domain_models::RunState::Stuck => "stuck",
        }
    }
}
