// [libs/shared/telemetry/src/severity.rs]
//! The fixed set of hub severities. Callers may declare aliases onto
//! these but cannot invent a new severity (spec.md §4.7).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Notice,
    Debug,
    Warn,
    Alert,
    Emerg,
    Error,
    Crit,
}

impl Severity {
    pub const ALL: [Severity; 8] = [
        Severity::Info,
        Severity::Notice,
        Severity::Debug,
        Severity::Warn,
        Severity::Alert,
        Severity::Emerg,
        Severity::Error,
        Severity::Crit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Notice => "notice",
            Severity::Debug => "debug",
            Severity::Warn => "warn",
            Severity::Alert => "alert",
            Severity::Emerg => "emerg",
            Severity::Error => "error",
            Severity::Crit => "crit",
        }
    }

    pub fn parse(name: &str) -> Option<Severity> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }
}
