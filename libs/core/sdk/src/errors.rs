// [libs/core/sdk/src/errors.rs]

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable '{0}'")]
    MissingEnv(&'static str),
}

#[derive(Debug, Error)]
pub enum SdkError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("the node is stuck: a required subsystem failed to initialize during bootstrap")]
    Stuck,
    #[error(transparent)]
    Broker(#[from] flame_broker_client::BrokerError),
    #[error(transparent)]
    Storage(#[from] flame_storage_client::StorageError),
    #[error(transparent)]
    StorageApi(#[from] flame_storage_api::StorageApiError),
    #[error(transparent)]
    Data(#[from] flame_data_client::DataError),
    #[error("no data client was instantiated for this node's role")]
    NoDataClient,
}
