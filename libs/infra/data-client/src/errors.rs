// [libs/infra/data-client/src/errors.rs]

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("data proxy unreachable: {0}")]
    Network(#[from] reqwest::Error),
    #[error("data proxy rejected the request with status {0}")]
    Rejected(u16),
    #[error("unknown data source id '{0}'")]
    UnknownDataSource(String),
}
