// [libs/api/messaging/src/api.rs]
/*!
 * =================================================================
 * APARATO: API DE MENSAJERIA (V1.0 - PRESUPUESTO DE INTENTOS)
 * CLASIFICACIÓN: API DE APLICACIÓN (ESTRATO L4)
 * RESPONSABILIDAD: ENVIO/ESPERA/LIMPIEZA CON REINTENTOS Y TIMEOUTS
 *
 * VISION HIPER-HOLÍSTICA:
 * Eleva el cliente crudo del broker a una superficie con presupuesto:
 * cada intento no confirmado se reintenta hasta agotar `max_attempts`
 * o el `total_timeout`, y las fallas de transporte nunca se propagan
 * como error — se registran y se tratan como "aun no confirmado".
 * =================================================================
 */

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use flame_broker_client::BrokerClient;
use flame_domain_models::{Message, MessageDirection, MessageStatus};
use flame_telemetry::Logger;
use futures::future::join_all;
use serde_json::{Map, Value};
use tracing::{instrument, warn};

use crate::options::{SendOptions, SendOutcome};

pub struct MessagingApi {
    broker: Arc<BrokerClient>,
    logger: Arc<Logger>,
}

impl MessagingApi {
    pub fn new(broker: Arc<BrokerClient>, logger: Arc<Logger>) -> Self {
        Self { broker, logger }
    }

    /// Sends to `receivers`, retrying un-acknowledged receivers for up
    /// to `options.max_attempts` attempts. Per spec.md §4.3: transport
    /// failures during a send are logged at warning and treated as
    /// "not acknowledged yet" rather than raised.
    #[instrument(skip(self, body, options))]
    pub async fn send_message(&self, receivers: Vec<String>, category: &str, body: Map<String, Value>, options: SendOptions) -> SendOutcome {
        let mut pending: HashSet<String> = receivers.into_iter().collect();
        let mut acked = Vec::new();
        let overall_deadline = options.total_timeout.map(|timeout| tokio::time::Instant::now() + timeout);

        for attempt in 0..options.max_attempts.max(1) {
            if pending.is_empty() {
                break;
            }
            if let Some(deadline) = overall_deadline {
                if tokio::time::Instant::now() >= deadline {
                    break;
                }
            }

            let targets: Vec<String> = pending.iter().cloned().collect();
            let sent = match self.broker.send(&targets, category, body.clone()).await {
                Ok(message) => message,
                Err(err) => {
                    self.logger.log(format!("send attempt {attempt} failed: {err}"), "warn").await;
                    warn!(error = %err, attempt, "send_message transport failure, will retry");
                    continue;
                }
            };

            let is_last_attempt = attempt + 1 == options.max_attempts;
            let attempt_timeout = if let Some(total) = options.total_timeout {
                Some(total / options.max_attempts.max(1))
            } else if is_last_attempt && options.max_attempts > 1 {
                None
            } else {
                Some(options.per_attempt_timeout)
            };

            let message_id = sent.meta.id.clone();
            let waits = targets.iter().cloned().map(|receiver| {
                let broker = self.broker.clone();
                let message_id = message_id.clone();
                async move {
                    broker.log().await_acknowledgement(&message_id, &receiver).await;
                }
            });

            match attempt_timeout {
                Some(duration) => {
                    let _ = tokio::time::timeout(duration, join_all(waits)).await;
                }
                None => {
                    join_all(waits).await;
                }
            }

            for receiver in &targets {
                if self.broker.log().find_acknowledgement(&message_id, receiver) {
                    pending.remove(receiver);
                    acked.push(receiver.clone());
                }
            }
        }

        SendOutcome { acked, not_acked: pending.into_iter().collect() }
    }

    /// Awaits one reply per `sender`; absent senders map to `None`.
    /// Every returned message is marked read by the underlying
    /// `await_message` (spec.md §8 property 5).
    #[instrument(skip(self))]
    pub async fn await_messages(
        &self,
        senders: Vec<String>,
        category: &str,
        message_id: Option<String>,
        timeout: Option<Duration>,
    ) -> HashMap<String, Option<Vec<Message>>> {
        let tasks = senders.into_iter().map(|sender| {
            let broker = self.broker.clone();
            let category = category.to_string();
            let message_id = message_id.clone();
            async move {
                let fut = broker.log().await_message(&sender, &category, message_id.as_deref());
                let result = match timeout {
                    Some(duration) => tokio::time::timeout(duration, fut).await.ok(),
                    None => Some(fut.await),
                };
                (sender, result)
            }
        });

        join_all(tasks).await.into_iter().collect()
    }

    /// `sendMessage` then `awaitMessages` with the remaining budget.
    #[instrument(skip(self, body, send_options))]
    pub async fn send_and_await(
        &self,
        receivers: Vec<String>,
        category: &str,
        body: Map<String, Value>,
        send_options: SendOptions,
        await_timeout: Option<Duration>,
    ) -> (SendOutcome, HashMap<String, Option<Vec<Message>>>) {
        let outcome = self.send_message(receivers.clone(), category, body, send_options).await;
        let responses = self.await_messages(receivers, category, None, await_timeout).await;
        (outcome, responses)
    }

    pub fn get_messages(&self, status: Option<MessageStatus>) -> Vec<Message> {
        self.broker
            .log()
            .incoming_snapshot()
            .into_iter()
            .filter(|m| status.map(|s| m.meta.status == s).unwrap_or(true))
            .collect()
    }

    pub fn delete_by_id(&self, ids: &[String], direction: MessageDirection) {
        for id in ids {
            self.broker.delete_by_id(id, direction);
        }
    }

    pub fn clear(&self, direction: MessageDirection, status: Option<MessageStatus>, min_age_sec: Option<i64>) {
        self.broker.clear(direction, status, min_age_sec);
    }
}
