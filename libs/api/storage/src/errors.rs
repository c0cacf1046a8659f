// [libs/api/storage/src/errors.rs]

use flame_domain_models::{DpError, TagError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageApiError {
    #[error(transparent)]
    Transport(#[from] flame_storage_client::StorageError),
    #[error(transparent)]
    Tag(#[from] TagError),
    #[error(transparent)]
    Dp(#[from] DpError),
    #[error("local differential privacy requires a numeric result, got a non-numeric payload")]
    DpResultNotNumeric,
    #[error("encryption was requested but no recipient list was given")]
    MissingRecipients,
    #[error("recipient '{0}' has no entry in the encrypted intermediate id map")]
    UnknownRecipient(String),
    #[error("could not encode the payload for transmission: {0}")]
    Encoding(#[from] flame_serialization::SerializationError),
}
