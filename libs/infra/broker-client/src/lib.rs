// INICIO DEL ARCHIVO [libs/infra/broker-client/src/lib.rs]
/*!
 * =================================================================
 * APARATO: ENLACE AL BROKER DE MENSAJES (V2.0 - AL MENOS UNA VEZ)
 * CLASIFICACIÓN: ADAPTADOR DE INFRAESTRUCTURA (ESTRATO L3)
 * RESPONSABILIDAD: TRANSPORTE HTTP HACIA EL BROKER Y BITACORA LOCAL
 *
 * VISION HIPER-HOLÍSTICA:
 * Absorbe la semantica de entrega "al menos una vez" del broker: toda
 * redelivery se detecta por `meta.id` antes de tocar la bitacora, de
 * modo que ningun consumidor rio abajo necesita deduplicar por su cuenta.
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod message_log;

pub use client::BrokerClient;
pub use errors::BrokerError;
pub use message_log::{MessageLog, POLL_INTERVAL};
// FIN DEL ARCHIVO [libs/infra/broker-client/src/lib.rs]
