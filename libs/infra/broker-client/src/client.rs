// INICIO DEL ARCHIVO [libs/infra/broker-client/src/client.rs]
/*!
 * =================================================================
 * APARATO: CLIENTE DEL BROKER (V2.1 - DEDUP POR ID)
 * CLASIFICACIÓN: ADAPTADOR DE INFRAESTRUCTURA (ESTRATO L3)
 * RESPONSABILIDAD: SUSCRIPCION, PUBLICACION Y PROTOCOLO DE ECO
 *
 * VISION HIPER-HOLÍSTICA:
 * `receive` es el unico punto de entrada para trafico inbound. Antes
 * de procesar nada, consulta la bitacora por `meta.id`: una redelivery
 * jamas se re-procesa, y si ya existia un eco de confirmacion, ese
 * mismo eco se retransmite — nunca se genera un segundo.
 * =================================================================
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{OnceLock, RwLock};
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use flame_domain_models::{
    Message, MessageDirection, MessageMeta, MessageStatus, ParticipantInfo, RESERVED_META_KEY,
};
use rand::Rng;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{instrument, warn};

use crate::errors::BrokerError;
use crate::message_log::MessageLog;

#[derive(Serialize)]
struct SubscriptionPayload<'a> {
    #[serde(rename = "webhookUrl")]
    webhook_url: &'a str,
}

#[derive(Serialize)]
struct PublishPayload<'a> {
    recipients: &'a [String],
    message: &'a Message,
}

pub struct BrokerClient {
    http: Client,
    token: RwLock<String>,
    base_url: String,
    analysis_id: String,
    self_node_id: OnceLock<String>,
    sequence: AtomicU64,
    log: MessageLog,
}

impl BrokerClient {
    pub fn new(base_url: impl Into<String>, analysis_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("failed to build broker HTTP client"),
            token: RwLock::new(token.into()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            analysis_id: analysis_id.into(),
            self_node_id: OnceLock::new(),
            sequence: AtomicU64::new(0),
            log: MessageLog::default(),
        }
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn self_node_id(&self) -> Option<&str> {
        self.self_node_id.get().map(String::as_str)
    }

    /// Applies the broker handshake result. Called exactly once, from
    /// bootstrap step 3.
    pub fn set_self_node_id(&self, node_id: String) {
        let _ = self.self_node_id.set(node_id);
    }

    /// Swaps the bearer token atomically; in-flight requests keep
    /// using whichever token they already captured (spec.md §5).
    pub fn refresh_token(&self, token: String) {
        *self.token.write().unwrap() = token;
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(self.token.read().unwrap().clone())
    }

    #[instrument(skip(self))]
    pub async fn subscribe(&self, webhook_url: &str) -> Result<(), BrokerError> {
        let url = format!("{}/analyses/{}/messages/subscriptions", self.base_url, self.analysis_id);
        let response = self
            .authorized(self.http.post(&url))
            .json(&SubscriptionPayload { webhook_url })
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(BrokerError::Rejected(response.status().as_u16()))
        }
    }

    #[instrument(skip(self))]
    pub async fn fetch_self_participant(&self) -> Result<ParticipantInfo, BrokerError> {
        let url = format!("{}/analyses/{}/participants/self", self.base_url, self.analysis_id);
        let response = self.authorized(self.http.get(&url)).send().await?;
        if response.status().is_success() {
            Ok(response.json::<ParticipantInfo>().await?)
        } else {
            Err(BrokerError::Rejected(response.status().as_u16()))
        }
    }

    #[instrument(skip(self))]
    pub async fn list_participants(&self) -> Result<Vec<ParticipantInfo>, BrokerError> {
        let url = format!("{}/analyses/{}/participants", self.base_url, self.analysis_id);
        let response = self.authorized(self.http.get(&url)).send().await?;
        if response.status().is_success() {
            Ok(response.json::<Vec<ParticipantInfo>>().await?)
        } else {
            Err(BrokerError::Rejected(response.status().as_u16()))
        }
    }

    fn next_meta(&self, category: &str) -> Result<MessageMeta, BrokerError> {
        let sender = self.self_node_id().ok_or(BrokerError::IdentityNotResolved)?;
        let number = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let random_suffix: String = {
            let mut rng = rand::thread_rng();
            (0..6).map(|_| rng.sample(rand::distributions::Alphanumeric) as char).collect()
        };
        Ok(MessageMeta::new_outgoing(sender, number, category, &random_suffix))
    }

    /// Sends a message to `recipients`. Does not block on delivery —
    /// the POST completing only means the broker accepted it for
    /// routing, never that a recipient has acknowledged it.
    #[instrument(skip(self, body))]
    pub async fn send(&self, recipients: &[String], category: &str, body: Map<String, Value>) -> Result<Message, BrokerError> {
        if body.contains_key(RESERVED_META_KEY) {
            return Err(BrokerError::ReservedField(RESERVED_META_KEY));
        }
        let meta = self.next_meta(category)?;
        let message = Message::new(meta, body);
        self.publish(recipients, &message).await?;
        self.log.push_outgoing(message.clone());
        Ok(message)
    }

    async fn publish(&self, recipients: &[String], message: &Message) -> Result<(), BrokerError> {
        let url = format!("{}/analyses/{}/messages", self.base_url, self.analysis_id);
        let response = self
            .authorized(self.http.post(&url))
            .json(&PublishPayload { recipients, message })
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(BrokerError::Rejected(response.status().as_u16()))
        }
    }

    /// Re-sends an already-built echo without reserving a fresh
    /// `meta.id` — acknowledgement echoes keep the original message's
    /// id (spec.md §3 "Ack symmetry").
    async fn publish_existing(&self, recipients: &[String], message: Message) -> Result<(), BrokerError> {
        self.publish(recipients, &message).await?;
        self.log.push_outgoing(message);
        Ok(())
    }

    /// Handles one inbound delivery from the webhook. A message whose
    /// `meta.id` is already in the incoming log is a broker redelivery,
    /// not a new message: it is never reprocessed or re-pushed, and if
    /// this node already echoed an acknowledgement for it, that same
    /// echo is re-transmitted (not re-logged) so a dropped ack doesn't
    /// strand the sender's `awaitAcknowledgement`. Otherwise, if this
    /// is the first receipt of the message (`akn_id` unset), echoes a
    /// fresh acknowledgement back to the sender; an already-acknowledged
    /// incoming message (an ack echo arriving at the original sender)
    /// is recorded but never acknowledged in turn (spec.md §4.2 dedup,
    /// spec.md §8 testable property 4: at most one outgoing message per
    /// `meta.id`).
    #[instrument(skip(self, message))]
    pub async fn receive(&self, mut message: Message) -> Result<(), BrokerError> {
        message.meta.kind = MessageDirection::Incoming;
        message.meta.arrived_at = Some(chrono::Utc::now());

        if let Some(seen) = self.log.find_incoming_by_id(&message.meta.id) {
            if let Some(akn_id) = seen.meta.akn_id.as_deref() {
                if let Some(echo) = self.log.find_outgoing_by_id(&seen.meta.id) {
                    if let Err(err) = self.publish(&[seen.meta.sender.clone()], &echo).await {
                        warn!(error = %err, acknowledger = akn_id, "failed to re-send acknowledgement echo for redelivered message");
                    }
                }
            }
            return Ok(());
        }

        let needs_ack = message.meta.akn_id.is_none();
        if needs_ack {
            let self_id = self.self_node_id().ok_or(BrokerError::IdentityNotResolved)?;
            message.meta.akn_id = Some(self_id.to_string());
            let sender = message.meta.sender.clone();
            let number = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
            let echo = message.acknowledgement_of(self_id, number);
            self.log.push_incoming(message);
            if let Err(err) = self.publish_existing(&[sender], echo).await {
                warn!(error = %err, "failed to echo acknowledgement; sender's awaitAcknowledgement will retry via its own send");
            }
        } else {
            self.log.push_incoming(message);
        }
        Ok(())
    }

    pub fn delete_by_id(&self, id: &str, direction: MessageDirection) {
        self.log.delete_by_id(id, direction);
    }

    pub fn clear(&self, direction: MessageDirection, status: Option<MessageStatus>, min_age_sec: Option<i64>) {
        self.log.clear(direction, status, min_age_sec.map(ChronoDuration::seconds));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> BrokerClient {
        let c = BrokerClient::new(server.uri(), "analysis-1", "tok");
        c.set_self_node_id("node-a".into());
        c
    }

    #[tokio::test]
    async fn send_rejects_a_body_carrying_reserved_meta_key() {
        let server = MockServer::start().await;
        let c = client(&server);
        let mut body = Map::new();
        body.insert("meta".into(), Value::String("nope".into()));
        let err = c.send(&["node-b".into()], "cat", body).await.unwrap_err();
        assert!(matches!(err, BrokerError::ReservedField(_)));
    }

    #[tokio::test]
    async fn send_assigns_strictly_increasing_numbers() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).and(path("/analyses/analysis-1/messages")).respond_with(ResponseTemplate::new(200)).mount(&server).await;
        let c = client(&server);
        let a = c.send(&["node-b".into()], "cat", Map::new()).await.unwrap();
        let b = c.send(&["node-b".into()], "cat", Map::new()).await.unwrap();
        assert!(b.meta.number > a.meta.number);
        assert_ne!(a.meta.id, b.meta.id);
    }

    #[tokio::test]
    async fn receiving_a_fresh_message_echoes_exactly_one_acknowledgement() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).and(path("/analyses/analysis-1/messages")).respond_with(ResponseTemplate::new(200)).mount(&server).await;
        let c = client(&server);

        let meta = MessageMeta::new_outgoing("node-b", 1, "ready_check", "r1");
        let incoming = Message::new(meta, Map::new());
        c.receive(incoming).await.unwrap();

        let outgoing = c.log().outgoing_snapshot();
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].meta.akn_id.as_deref(), Some("node-a"));
        assert_eq!(outgoing[0].meta.id, "node-b-1-r1");
    }

    #[tokio::test]
    async fn receiving_an_already_acknowledged_echo_does_not_reacknowledge() {
        let server = MockServer::start().await;
        let c = client(&server);

        let mut meta = MessageMeta::new_outgoing("node-b", 1, "ready_check", "r1");
        meta.akn_id = Some("node-b".into());
        let ack_echo = Message::new(meta, Map::new());
        c.receive(ack_echo).await.unwrap();

        assert!(c.log().outgoing_snapshot().is_empty());
        assert_eq!(c.log().incoming_snapshot().len(), 1);
    }

    #[tokio::test]
    async fn redelivery_of_the_same_message_id_does_not_produce_a_second_ack() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).and(path("/analyses/analysis-1/messages")).respond_with(ResponseTemplate::new(200)).mount(&server).await;
        let c = client(&server);

        let meta = MessageMeta::new_outgoing("node-b", 1, "ready_check", "r1");
        let first = Message::new(meta.clone(), Map::new());
        c.receive(first).await.unwrap();
        assert_eq!(c.log().outgoing_snapshot().len(), 1);

        let redelivered = Message::new(meta, Map::new());
        c.receive(redelivered).await.unwrap();

        let outgoing = c.log().outgoing_snapshot();
        assert_eq!(outgoing.len(), 1, "redelivery must not log a second outgoing ack");
        assert_eq!(c.log().incoming_snapshot().len(), 1, "redelivery must not be reprocessed into the incoming log");
    }

    #[tokio::test]
    async fn subscribe_posts_the_webhook_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyses/analysis-1/messages/subscriptions"))
            .and(body_json(&SubscriptionPayload { webhook_url: "http://node/webhook" }))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        let c = client(&server);
        c.subscribe("http://node/webhook").await.unwrap();
    }
}
// FIN DEL ARCHIVO [libs/infra/broker-client/src/client.rs]
