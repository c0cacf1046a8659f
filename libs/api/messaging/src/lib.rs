// [libs/api/messaging/src/lib.rs]
//! The messaging API (C8).
//! API de mensajeria — envio, espera y limpieza sobre el broker.

pub mod api;
pub mod options;

pub use api::MessagingApi;
pub use options::{SendOptions, SendOutcome};
