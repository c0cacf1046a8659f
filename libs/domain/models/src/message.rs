// [libs/domain/models/src/message.rs]
/*!
 * APARATO: SOBRE DE MENSAJE (V1.0)
 * CLASIFICACIÓN: ENTIDAD DE DOMINIO (ESTRATO L2)
 * RESPONSABILIDAD: ENVOLTORIO DE MENSAJE Y EL CAMPO META RESERVADO
 *
 * El `meta` viaja junto al cuerpo de usuario pero nunca dentro de el;
 * se separa al deserializar y se reinserta al serializar.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved JSON key. User bodies must not contain this key on send
/// (protocol violation, spec.md §7 "Protocol violation" row).
pub const RESERVED_META_KEY: &str = "meta";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Unread,
    Read,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    Outgoing,
    Incoming,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMeta {
    pub id: String,
    pub number: u64,
    pub category: String,
    pub sender: String,
    pub akn_id: Option<String>,
    pub status: MessageStatus,
    #[serde(rename = "type")]
    pub kind: MessageDirection,
    pub created_at: DateTime<Utc>,
    pub arrived_at: Option<DateTime<Utc>>,
}

impl MessageMeta {
    /// `meta.id` format: `{senderId}-{seq}-{random}`, globally unique
    /// per spec.md §3. `random` only needs to disambiguate two sends
    /// issued in the same process tick; it is not a security token.
    fn make_id(sender: &str, number: u64, random_suffix: &str) -> String {
        format!("{sender}-{number}-{random_suffix}")
    }

    pub fn new_outgoing(sender: &str, number: u64, category: impl Into<String>, random_suffix: &str) -> Self {
        Self {
            id: Self::make_id(sender, number, random_suffix),
            number,
            category: category.into(),
            sender: sender.to_string(),
            akn_id: None,
            status: MessageStatus::Unread,
            kind: MessageDirection::Outgoing,
            created_at: Utc::now(),
            arrived_at: None,
        }
    }

    pub fn is_acknowledged(&self) -> bool {
        self.akn_id.is_some()
    }

    pub fn mark_read(&mut self) {
        self.status = MessageStatus::Read;
    }
}

/// A message as exchanged over the broker: `meta` plus an opaque user
/// body. The body never contains the `meta` key — it is split out on
/// deserialization and reattached on serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub meta: MessageMeta,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl Message {
    pub fn new(meta: MessageMeta, body: Map<String, Value>) -> Self {
        Self { meta, body }
    }

    /// Construye el eco de confirmacion de un mensaje entrante: mismo
    /// `meta.id`, `akn_id` fijado al confirmador, direccion invertida
    /// a saliente, `created_at`/`number` renovados por el invocador.
    pub fn acknowledgement_of(&self, acknowledger: &str, outgoing_number: u64) -> Message {
        let mut meta = self.meta.clone();
        meta.akn_id = Some(acknowledger.to_string());
        meta.status = MessageStatus::Unread;
        meta.kind = MessageDirection::Outgoing;
        meta.number = outgoing_number;
        meta.created_at = Utc::now();
        meta.arrived_at = None;
        Message { meta, body: self.body.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outgoing_meta_starts_unacknowledged_and_unread() {
        let meta = MessageMeta::new_outgoing("node-a", 1, "ready_check", "xyz");
        assert_eq!(meta.id, "node-a-1-xyz");
        assert!(!meta.is_acknowledged());
        assert_eq!(meta.status, MessageStatus::Unread);
        assert_eq!(meta.kind, MessageDirection::Outgoing);
    }

    #[test]
    fn two_sends_never_share_an_id() {
        let a = MessageMeta::new_outgoing("node-a", 1, "cat", "aaa");
        let b = MessageMeta::new_outgoing("node-a", 2, "cat", "bbb");
        assert_ne!(a.id, b.id);
        assert_ne!(a.number, b.number);
    }

    #[test]
    fn message_round_trips_with_meta_flattened() {
        let meta = MessageMeta::new_outgoing("node-a", 1, "intermediate_results", "r1");
        let mut body = Map::new();
        body.insert("result_id".into(), Value::String("abc".into()));
        let message = Message::new(meta, body);

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["result_id"], "abc");
        assert_eq!(json["meta"]["id"], "node-a-1-r1");

        let decoded: Message = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.body.get("result_id").unwrap(), "abc");
        assert!(!decoded.body.contains_key("meta"));
    }
}
