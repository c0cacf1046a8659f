// [libs/shared/telemetry/src/logger.rs]
/*!
 * APARATO: REGISTRADOR (V1.0 - SIN CICLOS)
 * CLASIFICACIÓN: INFRAESTRUCTURA COMPARTIDA (ESTRATO L3)
 * RESPONSABILIDAD: BUFFER/STREAM DE LOGS Y ENLACE NO-PROPIETARIO A C6
 *
 * El enlace con el cliente de observabilidad se fija una sola vez,
 * post-construccion, via `OnceLock` — asi se rompe el ciclo
 * registrador <-> cliente-observabilidad <-> fachada sin recurrir a
 * `Rc<RefCell<_>>`: el registrador nunca es dueno del cliente, solo
 * lo ve una vez que existe.
 */

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use flame_domain_models::{ProgressCounter, RunState};
use thiserror::Error;
use tracing::error;

use crate::observability::ObservabilityClient;
use crate::record::LogRecord;
use crate::severity::Severity;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log type '{0}'")]
    UnknownLogType(String),
    #[error("'{alias}' cannot alias '{target}': not one of the fixed hub severities")]
    AliasOntoUnknownSeverity { alias: String, target: String },
}

struct LoggerState {
    queue: VecDeque<LogRecord>,
    aliases: HashMap<String, Severity>,
    run_status: RunState,
    progress: ProgressCounter,
}

/// Structured logger. Phase 1 ("queued"): records accumulate in a FIFO
/// queue because the observability client isn't attached yet. Phase 2
/// ("streaming"): the client is attached, the queue drains once, and
/// every subsequent record streams immediately.
pub struct Logger {
    state: Mutex<LoggerState>,
    client: OnceLock<ObservabilityClient>,
    grace_period: Duration,
}

impl Logger {
    pub fn new() -> Self {
        Self::with_grace_period(Duration::from_secs(5))
    }

    pub fn with_grace_period(grace_period: Duration) -> Self {
        Self {
            state: Mutex::new(LoggerState {
                queue: VecDeque::new(),
                aliases: HashMap::new(),
                run_status: RunState::Starting,
                progress: ProgressCounter::zero(),
            }),
            client: OnceLock::new(),
            grace_period,
        }
    }

    /// Registers a custom log type name onto an existing hub severity.
    /// Attempting to alias onto a non-severity string is the one
    /// invalid case — the fixed set in `Severity` is the only target.
    pub fn declare_alias(&self, name: impl Into<String>, onto: Severity) {
        let name = name.into();
        self.state.lock().unwrap().aliases.insert(name, onto);
    }

    fn resolve_severity(&self, log_type: &str) -> Option<Severity> {
        if let Some(severity) = Severity::parse(log_type) {
            return Some(severity);
        }
        self.state.lock().unwrap().aliases.get(log_type).copied()
    }

    pub fn set_run_status(&self, status: RunState) {
        self.state.lock().unwrap().run_status = status;
    }

    pub fn set_progress(&self, percent: u8) {
        self.state.lock().unwrap().progress.advance(percent);
    }

    pub fn force_complete_progress(&self) {
        self.state.lock().unwrap().progress.force_complete();
    }

    pub fn run_status(&self) -> RunState {
        self.state.lock().unwrap().run_status
    }

    pub fn progress(&self) -> ProgressCounter {
        self.state.lock().unwrap().progress
    }

    /// Attaches the observability client, switching to the streaming
    /// phase and draining whatever queued up during bootstrap. Called
    /// exactly once; later calls are ignored (the first bootstrap
    /// attempt wins, matching "attachment happens exactly once").
    pub async fn attach_observability_client(&self, client: ObservabilityClient) {
        if self.client.set(client).is_err() {
            return;
        }
        let queued: Vec<LogRecord> = {
            let mut state = self.state.lock().unwrap();
            state.queue.drain(..).collect()
        };
        let client = self.client.get().expect("just set");
        for record in queued {
            client.stream_best_effort(&record).await;
        }
    }

    /// Logs at a caller-named type; unknown types are themselves
    /// logged (at `error`, spec.md §4.7) rather than panicking.
    pub async fn log(&self, message: impl Into<String>, log_type: &str) {
        let message = message.into();
        let severity = match self.resolve_severity(log_type) {
            Some(severity) => severity,
            None => {
                let err = LoggerError::UnknownLogType(log_type.to_string());
                error!(%err, "rejected log record with unrecognized type");
                self.emit(format!("{err}"), Severity::Error).await;
                return;
            }
        };
        self.emit(message, severity).await;
    }

    async fn emit(&self, message: String, severity: Severity) {
        let record = {
            let state = self.state.lock().unwrap();
            LogRecord::new(message, severity, state.run_status, state.progress)
        };
        match self.client.get() {
            Some(client) => client.stream_best_effort(&record).await,
            None => self.state.lock().unwrap().queue.push_back(record),
        }
    }

    /// Raises a fatal error: sets `run_status = failed`, emits the
    /// error, then sleeps the grace period so the platform can scrape
    /// `/healthz` before the container exits (spec.md §4.7).
    pub async fn fatal(&self, message: impl Into<String>) {
        self.set_run_status(RunState::Failed);
        self.emit(message.into(), Severity::Error).await;
        tokio::time::sleep(self.grace_period).await;
    }

    #[cfg(test)]
    pub(crate) fn queue_len(&self) -> usize {
        self.state.lock().unwrap().queue.len()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn records_queue_until_client_attached() {
        let logger = Logger::new();
        logger.log("first", "info").await;
        logger.log("second", "warn").await;
        assert_eq!(logger.queue_len(), 2);
    }

    #[tokio::test]
    async fn attaching_drains_the_queue() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/po/stream_logs"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let logger = Logger::new();
        logger.log("queued-while-offline", "info").await;
        assert_eq!(logger.queue_len(), 1);

        logger.attach_observability_client(ObservabilityClient::new(server.uri(), "analysis-1")).await;
        assert_eq!(logger.queue_len(), 0);

        logger.log("streamed-live", "info").await;
        assert_eq!(logger.queue_len(), 0);
    }

    #[tokio::test]
    async fn alias_resolves_onto_existing_severity() {
        let logger = Logger::new();
        logger.declare_alias("custom_metric", Severity::Notice);
        logger.log("aliased", "custom_metric").await;
        assert_eq!(logger.queue_len(), 1);
    }

    #[tokio::test]
    async fn unknown_log_type_is_logged_as_error_not_panicking() {
        let logger = Logger::new();
        logger.log("bad", "not_a_real_type").await;
        assert_eq!(logger.queue_len(), 1);
    }

    #[tokio::test]
    async fn fatal_sets_failed_status_and_waits_grace_period() {
        let logger = Logger::with_grace_period(Duration::from_millis(10));
        logger.fatal("boom").await;
        assert_eq!(logger.state.lock().unwrap().run_status, RunState::Failed);
    }
}
