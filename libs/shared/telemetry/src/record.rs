// [libs/shared/telemetry/src/record.rs]
//! A single log record as sent to the platform's progress endpoint.

use chrono::{DateTime, Utc};
use flame_domain_models::{ProgressCounter, RunState};
use serde::{Deserialize, Serialize};

use crate::severity::Severity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub message: String,
    pub log_type: String,
    pub run_status: RunState,
    pub progress_percent: u8,
    pub timestamp: DateTime<Utc>,
}

impl LogRecord {
    pub fn new(message: impl Into<String>, severity: Severity, run_status: RunState, progress: ProgressCounter) -> Self {
        Self {
            message: message.into(),
            log_type: severity.as_str().to_string(),
            run_status,
            progress_percent: progress.value(),
            timestamp: Utc::now(),
        }
    }
}
