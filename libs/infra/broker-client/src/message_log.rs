// [libs/infra/broker-client/src/message_log.rs]
/*!
 * APARATO: BITACORA DE MENSAJES (V1.1)
 * CLASIFICACIÓN: ESTADO DE INFRAESTRUCTURA (ESTRATO L3)
 * RESPONSABILIDAD: SECUENCIAS ENTRANTE/SALIENTE DE SOLO-APPEND
 *
 * Propiedad exclusiva de `BrokerClient`; ningun otro componente la
 * toca directamente, solo a traves de la API de mensajeria.
 */

use std::sync::Mutex;
use std::time::Duration;

use flame_domain_models::{Message, MessageDirection, MessageStatus};
use tokio::time::interval;

#[derive(Default)]
pub struct MessageLog {
    incoming: Mutex<Vec<Message>>,
    outgoing: Mutex<Vec<Message>>,
}

/// Polling cadence for every `await*` operation in this crate — 1s,
/// per spec.md §4.2/§5. Never a busy spin.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

impl MessageLog {
    pub fn push_outgoing(&self, message: Message) {
        self.outgoing.lock().unwrap().push(message);
    }

    pub fn push_incoming(&self, message: Message) {
        self.incoming.lock().unwrap().push(message);
    }

    pub fn outgoing_snapshot(&self) -> Vec<Message> {
        self.outgoing.lock().unwrap().clone()
    }

    pub fn incoming_snapshot(&self) -> Vec<Message> {
        self.incoming.lock().unwrap().clone()
    }

    /// Finds an already-present incoming message with `meta.id ==
    /// message_id` and `meta.akn_id == Some(acknowledger)`.
    pub fn find_acknowledgement(&self, message_id: &str, acknowledger: &str) -> bool {
        self.incoming
            .lock()
            .unwrap()
            .iter()
            .any(|m| m.meta.id == message_id && m.meta.akn_id.as_deref() == Some(acknowledger))
    }

    /// Looks up an already-recorded incoming message by `meta.id`,
    /// regardless of read/unread status — used to detect broker
    /// redelivery of a message this log has already seen.
    pub fn find_incoming_by_id(&self, id: &str) -> Option<Message> {
        self.incoming.lock().unwrap().iter().find(|m| m.meta.id == id).cloned()
    }

    /// Looks up an already-recorded outgoing message by `meta.id` —
    /// used to re-transmit a previously-sent acknowledgement echo
    /// without logging it as a second outgoing message.
    pub fn find_outgoing_by_id(&self, id: &str) -> Option<Message> {
        self.outgoing.lock().unwrap().iter().find(|m| m.meta.id == id).cloned()
    }

    /// Unread incoming messages matching `sender`/`category`, and
    /// optionally a specific `message_id`; marks every match read.
    fn take_unread_matches(&self, sender: &str, category: &str, message_id: Option<&str>) -> Vec<Message> {
        let mut incoming = self.incoming.lock().unwrap();
        let mut matched = Vec::new();
        for message in incoming.iter_mut() {
            let is_match = message.meta.sender == sender
                && message.meta.category == category
                && message.meta.status == MessageStatus::Unread
                && message.meta.kind == MessageDirection::Incoming
                && message_id.map(|id| message.meta.id == id).unwrap_or(true);
            if is_match {
                message.meta.mark_read();
                matched.push(message.clone());
            }
        }
        matched
    }

    /// Polls until at least one unread match appears, then returns
    /// every match present at that moment (spec.md §4.2 `awaitMessage`).
    pub async fn await_message(&self, sender: &str, category: &str, message_id: Option<&str>) -> Vec<Message> {
        let immediate = self.take_unread_matches(sender, category, message_id);
        if !immediate.is_empty() {
            return immediate;
        }
        let mut ticker = interval(POLL_INTERVAL);
        ticker.tick().await; // consume the immediate first tick
        loop {
            ticker.tick().await;
            let matched = self.take_unread_matches(sender, category, message_id);
            if !matched.is_empty() {
                return matched;
            }
        }
    }

    /// Polls until an acknowledgement of `message_id` from `receiver`
    /// is observed (spec.md §4.2 `awaitAcknowledgement`).
    pub async fn await_acknowledgement(&self, message_id: &str, receiver: &str) {
        if self.find_acknowledgement(message_id, receiver) {
            return;
        }
        let mut ticker = interval(POLL_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if self.find_acknowledgement(message_id, receiver) {
                return;
            }
        }
    }

    pub fn delete_by_id(&self, id: &str, direction: MessageDirection) {
        let log = match direction {
            MessageDirection::Incoming => &self.incoming,
            MessageDirection::Outgoing => &self.outgoing,
        };
        log.lock().unwrap().retain(|m| m.meta.id != id);
    }

    pub fn clear(&self, direction: MessageDirection, status: Option<MessageStatus>, min_age: Option<chrono::Duration>) {
        let log = match direction {
            MessageDirection::Incoming => &self.incoming,
            MessageDirection::Outgoing => &self.outgoing,
        };
        let now = chrono::Utc::now();
        log.lock().unwrap().retain(|m| {
            let status_keeps_it = status.map(|s| m.meta.status != s).unwrap_or(false);
            let age_keeps_it = min_age.map(|age| now - m.meta.created_at < age).unwrap_or(false);
            status_keeps_it || age_keeps_it
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flame_domain_models::MessageMeta;
    use serde_json::Map;

    fn incoming(sender: &str, category: &str, id: &str, akn_id: Option<&str>) -> Message {
        let mut meta = MessageMeta::new_outgoing(sender, 1, category, id);
        meta.kind = MessageDirection::Incoming;
        meta.akn_id = akn_id.map(String::from);
        Message::new(meta, Map::new())
    }

    #[tokio::test]
    async fn await_message_returns_immediately_when_already_unread() {
        let log = MessageLog::default();
        log.push_incoming(incoming("peer", "ready_check", "r1", None));
        let matches = log.await_message("peer", "ready_check", None).await;
        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn read_messages_are_never_returned_again() {
        let log = MessageLog::default();
        log.push_incoming(incoming("peer", "ready_check", "r1", None));
        let first = log.await_message("peer", "ready_check", None).await;
        assert_eq!(first.len(), 1);
        assert_eq!(log.incoming_snapshot()[0].meta.status, MessageStatus::Read);
    }

    #[test]
    fn acknowledgement_lookup_matches_id_and_acknowledger() {
        let log = MessageLog::default();
        log.push_incoming(incoming("peer", "cat", "msg-1", Some("me")));
        assert!(log.find_acknowledgement("msg-1", "me"));
        assert!(!log.find_acknowledgement("msg-1", "someone-else"));
        assert!(!log.find_acknowledgement("msg-2", "me"));
    }

    #[test]
    fn delete_by_id_removes_only_that_message() {
        let log = MessageLog::default();
        log.push_incoming(incoming("peer", "cat", "a", None));
        log.push_incoming(incoming("peer", "cat", "b", None));
        log.delete_by_id("a", MessageDirection::Incoming);
        let remaining = log.incoming_snapshot();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].meta.id, "b");
    }
}
