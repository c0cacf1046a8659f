// [libs/infra/broker-client/src/errors.rs]

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker unreachable: {0}")]
    Network(#[from] reqwest::Error),
    #[error("broker rejected the request with status {0}")]
    Rejected(u16),
    #[error("message body reserved key '{0}' may not be set by the caller")]
    ReservedField(&'static str),
    #[error("self node id was not set — bootstrap handshake has not completed")]
    IdentityNotResolved,
}
