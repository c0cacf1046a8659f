// INICIO DEL ARCHIVO [libs/core/sdk/src/sdk.rs]
/*!
 * =================================================================
 * APARATO: FACHADA DEL SDK (V3.0 - COMPOSICION TOTAL)
 * CLASIFICACIÓN: NUCLEO DEL SDK (ESTRATO L5)
 * RESPONSABILIDAD: BOOTSTRAP, IDENTIDAD, Y SUPERFICIE COMPLETA DE OPERACION
 *
 * VISION HIPER-HOLÍSTICA:
 * Compone C1-C9 en una unica fachada: handshake de arranque, tarea del
 * webhook, y cada operacion que el codigo de analisis del usuario
 * invoca — mensajeria, almacenamiento, datos, senalizacion de fin. El
 * modo "stuck" (handshake fallido) deja los campos degradados en
 * `None` en vez de abortar el proceso, para que `/healthz` siga
 * respondiendo incluso cuando el nodo nunca pudo unirse al analisis.
 * =================================================================
 */

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use flame_broker_client::BrokerClient;
use flame_data_client::{DataClient, DataSourceHandle};
use flame_domain_models::{
    LocalDifferentialPrivacyParams, Message, MessageDirection, MessageStatus, NodeIdentity, NodeRole, ParticipantSet, RunState,
};
use flame_messaging_api::{MessagingApi, SendOptions, SendOutcome};
use flame_storage_api::{FinalResult, OutputType, SendIntermediateResult, StorageApi};
use flame_storage_client::{StorageClient, TagEntry};
use flame_telemetry::{Logger, ObservabilityClient};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::NodeConfig;
use crate::errors::SdkError;
use crate::webhook::{serve, WebhookState};

/// Own-node health, as reported by `get_node_status` (spec.md §9's
/// decision: honest self-report, not a cluster-wide probe — the
/// original's `get_node_status` was dead code; see DESIGN.md).
#[derive(Debug, Clone, Copy)]
pub struct NodeStatus {
    pub run_state: RunState,
    pub progress: u8,
}

pub struct FlameSdk {
    identity: RwLock<NodeIdentity>,
    logger: Arc<Logger>,
    broker: Option<Arc<BrokerClient>>,
    data_client: Option<Arc<DataClient>>,
    messaging: Option<Arc<MessagingApi>>,
    storage: Option<Arc<StorageApi>>,
    participants: Arc<RwLock<ParticipantSet>>,
    finished: Arc<AtomicBool>,
    analysis_alive: Arc<AtomicBool>,
    _webhook_task: JoinHandle<()>,
}

/// Held by whoever drives the main analysis loop (`flame-orchestrator`'s
/// `run`). Its `Drop` flips this node's liveness flag to false, so a
/// panic or an early `?`-propagated error that never reaches
/// `analysis_finished` surfaces as `/healthz` reporting `failed`
/// (spec.md §7) instead of leaving the node stuck reporting `running`
/// forever.
pub struct AnalysisLivenessGuard {
    alive: Arc<AtomicBool>,
}

impl Drop for AnalysisLivenessGuard {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

impl FlameSdk {
    /// Runs the bootstrap sequence from spec.md §4.1. Misconfiguration
    /// (missing environment variables) is the only failure that aborts
    /// construction outright; a failed broker handshake instead leaves
    /// the node `stuck` with only the health endpoint alive, because
    /// the platform needs `/healthz` reachable to observe the failure.
    pub async fn bootstrap(aggregator_requires_data: bool) -> Result<Self, SdkError> {
        let config = NodeConfig::from_env()?;
        let logger = Arc::new(Logger::new());
        logger.log(format!("starting FLAME node for analysis {}", config.analysis_id), "info").await;

        poll_ingress_healthz(&config.ingress_host).await;
        logger.log("ingress reachable", "info").await;

        let mut identity = NodeIdentity::provisional(
            config.analysis_id.clone(),
            config.project_id.clone(),
            config.ingress_host.clone(),
            config.credentials.clone(),
        );

        let broker = Arc::new(BrokerClient::new(
            format!("http://{}/message-broker", config.ingress_host),
            config.analysis_id.clone(),
            config.credentials.platform_token.clone(),
        ));
        let webhook_url = format!("http://{}/analysis/webhook", config.ingress_host);
        let participants = Arc::new(RwLock::new(ParticipantSet::default()));

        let handshake_ok = match broker.subscribe(&webhook_url).await {
            Ok(()) => match broker.fetch_self_participant().await {
                Ok(participant) => match broker.list_participants().await {
                    Ok(entries) => {
                        broker.set_self_node_id(participant.node_id.clone());
                        identity.finalize(participant.node_id.clone(), participant.node_type);
                        *participants.write().unwrap() = ParticipantSet::from_entries(entries);
                        Some(participant.node_type)
                    }
                    Err(err) => {
                        logger.log(format!("failed to list participants: {err}"), "error").await;
                        None
                    }
                },
                Err(err) => {
                    logger.log(format!("failed to fetch self participant: {err}"), "error").await;
                    None
                }
            },
            Err(err) => {
                logger.log(format!("broker subscription failed: {err}"), "error").await;
                None
            }
        };

        let (broker, storage_client, data_client, messaging, storage) = match handshake_ok {
            Some(role) => {
                let storage_client = Arc::new(StorageClient::new(
                    format!("http://{}/storage", config.ingress_host),
                    config.credentials.platform_token.clone(),
                ));
                let observability = ObservabilityClient::new(format!("http://{}/po", config.ingress_host), config.analysis_id.clone());
                logger.attach_observability_client(observability).await;

                let data_client = if role == NodeRole::Default || aggregator_requires_data {
                    Some(Arc::new(DataClient::new(
                        format!("http://{}", config.ingress_host),
                        config.project_id.clone(),
                        config.credentials.data_source_token.clone(),
                    )))
                } else {
                    None
                };

                let messaging = Arc::new(MessagingApi::new(broker.clone(), logger.clone()));
                let storage = Arc::new(StorageApi::new(storage_client.clone(), logger.clone()));

                logger.set_run_status(RunState::Running);
                (Some(broker), Some(storage_client), data_client, Some(messaging), Some(storage))
            }
            None => {
                logger.set_run_status(RunState::Stuck);
                (None, None, None, None, None)
            }
        };

        let finished = Arc::new(AtomicBool::new(false));
        let analysis_alive = Arc::new(AtomicBool::new(true));
        let webhook_state = Arc::new(WebhookState {
            broker: broker.clone(),
            storage_client,
            logger: logger.clone(),
            finished: finished.clone(),
            analysis_alive: analysis_alive.clone(),
            token: RwLock::new(config.credentials.platform_token.clone()),
        });
        let webhook_task = tokio::spawn(serve(webhook_state));

        logger.log("FlameSdk ready", "info").await;
        Ok(Self {
            identity: RwLock::new(identity),
            logger,
            broker,
            data_client,
            messaging,
            storage,
            participants,
            finished,
            analysis_alive,
            _webhook_task: webhook_task,
        })
    }

    // --- identity -------------------------------------------------

    pub fn analysis_id(&self) -> String {
        self.identity.read().unwrap().analysis_id.clone()
    }

    pub fn project_id(&self) -> String {
        self.identity.read().unwrap().project_id.clone()
    }

    pub fn node_id(&self) -> String {
        self.identity.read().unwrap().node_id.clone()
    }

    pub fn role(&self) -> NodeRole {
        self.identity.read().unwrap().role
    }

    pub fn is_stuck(&self) -> bool {
        self.broker.is_none()
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn participant_ids(&self) -> Vec<String> {
        self.participants.read().unwrap().node_ids().map(String::from).collect()
    }

    pub fn aggregator_id(&self) -> Option<String> {
        self.participants.read().unwrap().aggregator().map(|p| p.node_id.clone())
    }

    /// Own-node status only — see `NodeStatus` doc comment.
    pub fn node_status(&self) -> NodeStatus {
        NodeStatus { run_state: self.logger.run_status(), progress: self.logger.progress().value() }
    }

    // --- logging ----------------------------------------------------

    pub async fn log(&self, message: impl Into<String>, log_type: &str) {
        self.logger.log(message, log_type).await;
    }

    pub fn declare_log_type_alias(&self, name: impl Into<String>, onto: flame_telemetry::Severity) {
        self.logger.declare_alias(name, onto);
    }

    // --- messaging ----------------------------------------------------

    pub async fn send_message(&self, receivers: Vec<String>, category: &str, body: Map<String, Value>, options: SendOptions) -> Result<SendOutcome, SdkError> {
        Ok(self.messaging()?.send_message(receivers, category, body, options).await)
    }

    pub async fn await_messages(&self, senders: Vec<String>, category: &str, message_id: Option<String>, timeout: Option<Duration>) -> Result<HashMap<String, Option<Vec<Message>>>, SdkError> {
        Ok(self.messaging()?.await_messages(senders, category, message_id, timeout).await)
    }

    pub fn get_messages(&self, status: Option<MessageStatus>) -> Result<Vec<Message>, SdkError> {
        Ok(self.messaging()?.get_messages(status))
    }

    pub fn delete_messages(&self, ids: &[String], direction: MessageDirection) -> Result<(), SdkError> {
        self.messaging()?.delete_by_id(ids, direction);
        Ok(())
    }

    /// Broadcasts `analysis_finished` to every participant, then marks
    /// this node finished (spec.md §4.1 shutdown path (a)).
    pub async fn analysis_finished(&self) -> Result<(), SdkError> {
        let receivers = self.participant_ids();
        if !receivers.is_empty() {
            let options = SendOptions { max_attempts: 5, total_timeout: None, per_attempt_timeout: Duration::from_secs(30) };
            self.messaging()?.send_message(receivers, "analysis_finished", Map::new(), options).await;
        }
        self.finished.store(true, Ordering::SeqCst);
        self.logger.force_complete_progress();
        self.logger.set_run_status(RunState::Finished);
        Ok(())
    }

    fn messaging(&self) -> Result<&MessagingApi, SdkError> {
        self.messaging.as_deref().ok_or(SdkError::Stuck)
    }

    /// Acquires the liveness guard the main analysis loop should hold
    /// for as long as it runs. See `AnalysisLivenessGuard`.
    pub fn analysis_liveness_guard(&self) -> AnalysisLivenessGuard {
        AnalysisLivenessGuard { alive: self.analysis_alive.clone() }
    }

    /// Readiness barrier: repeatedly `send_message`s a `ready_check` to
    /// `nodes` (every participant when empty) until each one acks or
    /// `timeout` elapses. Each attempt uses `attempt_interval` as its
    /// per-attempt budget (spec.md §4.6 preamble step 2).
    pub async fn ready_check(&self, nodes: Vec<String>, attempt_interval: Duration, timeout: Option<Duration>) -> Result<HashMap<String, bool>, SdkError> {
        let mut pending: Vec<String> = if nodes.is_empty() { self.participant_ids() } else { nodes };
        let mut received: HashMap<String, bool> = pending.iter().cloned().map(|id| (id, false)).collect();
        let deadline = timeout.map(|t| tokio::time::Instant::now() + t);

        while !pending.is_empty() {
            if let Some(deadline) = deadline {
                if tokio::time::Instant::now() >= deadline {
                    break;
                }
            }
            let options = SendOptions { max_attempts: 1, total_timeout: None, per_attempt_timeout: attempt_interval };
            let outcome = self.messaging()?.send_message(pending.clone(), "ready_check", Map::new(), options).await;
            for node in &outcome.acked {
                received.insert(node.clone(), true);
            }
            pending.retain(|node| !outcome.acked.contains(node));
            if !pending.is_empty() {
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
        Ok(received)
    }

    // --- storage ----------------------------------------------------

    pub async fn submit_final<T: Serialize>(&self, result: &FinalResult<'_, T>, output_type: OutputType, dp: Option<LocalDifferentialPrivacyParams>) -> Result<String, SdkError> {
        Ok(self.storage()?.submit_final(result, output_type, dp).await?)
    }

    pub async fn save_local<T: Serialize>(&self, result: &FinalResult<'_, T>, tag: Option<&str>) -> Result<String, SdkError> {
        Ok(self.storage()?.save_local(result, tag).await?)
    }

    pub async fn load_local<T: DeserializeOwned>(&self, id: &str) -> Result<T, SdkError> {
        Ok(self.storage()?.load_local(id).await?)
    }

    pub async fn list_local_tags(&self) -> Result<Vec<TagEntry>, SdkError> {
        Ok(self.storage()?.list_local_tags().await?)
    }

    /// Saves `value` to global intermediate storage, then notifies
    /// `receivers` of its `result_id` over messaging (spec.md §4.3 +
    /// §4.4 composed, grounded on the original's `send_intermediate_data`
    /// which is a save-then-notify pair rather than a single primitive).
    pub async fn send_intermediate_data<T: Serialize>(&self, receivers: &[String], value: &FinalResult<'_, T>, category: &str, encrypted: bool, options: SendOptions) -> Result<SendOutcome, SdkError> {
        let stored = self.storage()?.send_intermediate_data(receivers, value, encrypted).await?;
        let mut body = Map::new();
        body.insert("result_id".to_string(), result_id_value(&stored));
        Ok(self.messaging()?.send_message(receivers.to_vec(), category, body, options).await)
    }

    /// Awaits one `category` message per sender, reads each one's
    /// `result_id`, and fetches the corresponding payload from global
    /// intermediate storage. A sender that never responds maps to
    /// `None`; a sender whose payload fails to fetch also maps to
    /// `None` rather than aborting the whole batch.
    pub async fn await_intermediate_data<T: DeserializeOwned>(&self, senders: &[String], category: &str, timeout: Option<Duration>) -> Result<HashMap<String, Option<T>>, SdkError> {
        let self_node_id = self.node_id();
        let responses = self.messaging()?.await_messages(senders.to_vec(), category, None, timeout).await;
        let mut results = HashMap::with_capacity(senders.len());
        for sender in senders {
            let value = match responses.get(sender).and_then(|v| v.as_ref()).and_then(|messages| messages.last()) {
                Some(message) => match message.body.get("result_id").and_then(|v| intermediate_result_from_value(v)) {
                    Some(result_id) => self.storage()?.await_intermediate_data(sender, &result_id, &self_node_id).await.ok(),
                    None => None,
                },
                None => None,
            };
            results.insert(sender.clone(), value);
        }
        Ok(results)
    }

    fn storage(&self) -> Result<&StorageApi, SdkError> {
        self.storage.as_deref().ok_or(SdkError::Stuck)
    }

    // --- data ---------------------------------------------------------

    pub async fn list_sources(&self) -> Result<Vec<flame_domain_models::DataSourceDescriptor>, SdkError> {
        Ok(self.data()?.list_sources().await?)
    }

    pub async fn get_fhir(&self, queries: &[String]) -> Result<HashMap<String, HashMap<String, Value>>, SdkError> {
        Ok(self.data()?.get_fhir(queries).await?)
    }

    pub async fn get_s3(&self, key_filter: &[String]) -> Result<HashMap<String, HashMap<String, Vec<u8>>>, SdkError> {
        Ok(self.data()?.get_s3(key_filter).await?)
    }

    pub async fn get_data_client(&self, data_id: &str) -> Result<DataSourceHandle, SdkError> {
        Ok(self.data()?.get_data_client(data_id).await?)
    }

    fn data(&self) -> Result<&DataClient, SdkError> {
        self.data_client.as_deref().ok_or(SdkError::NoDataClient)
    }
}

fn result_id_value(result: &SendIntermediateResult) -> Value {
    match result {
        SendIntermediateResult::Plain(id) => Value::String(id.clone()),
        SendIntermediateResult::Encrypted(ids) => {
            let map: Map<String, Value> = ids.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect();
            Value::Object(map)
        }
    }
}

/// `result_id` arrives as either a plain string (unencrypted) or an
/// object keyed by recipient node id (encrypted) — see
/// `result_id_value` for the inverse on the sending side.
fn intermediate_result_from_value(value: &Value) -> Option<SendIntermediateResult> {
    match value {
        Value::String(id) => Some(SendIntermediateResult::Plain(id.clone())),
        Value::Object(map) => {
            let ids = map.iter().filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string()))).collect();
            Some(SendIntermediateResult::Encrypted(ids))
        }
        _ => None,
    }
}

async fn poll_ingress_healthz(ingress_host: &str) {
    let http = Client::builder().timeout(Duration::from_secs(5)).build().expect("failed to build bootstrap HTTP client");
    let url = format!("http://{ingress_host}/healthz");
    loop {
        match http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                return;
            }
            Ok(response) => info!(status = response.status().as_u16(), "ingress not ready yet"),
            Err(err) => info!(error = %err, "ingress unreachable"),
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}
// FIN DEL ARCHIVO [libs/core/sdk/src/sdk.rs]
