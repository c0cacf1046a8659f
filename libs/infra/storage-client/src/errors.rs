// [libs/infra/storage-client/src/errors.rs]

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object store unreachable: {0}")]
    Network(#[from] reqwest::Error),
    #[error("object store rejected the request with status {0}")]
    Rejected(u16),
    #[error("object store returned a PUT response with no usable url")]
    MissingUrl,
}
