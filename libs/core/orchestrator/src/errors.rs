// [libs/core/orchestrator/src/errors.rs]

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Sdk(#[from] flame_sdk::SdkError),
    #[error("this node is declared '{actual}' but was started as a '{expected}' orchestrator")]
    RoleMismatch { expected: &'static str, actual: &'static str },
    #[error("this node has role 'aggregator' assigned by the hub, but no aggregator is listed among the participants")]
    NoAggregator,
    #[error("aggregator received no usable result from any analyzer this round")]
    AllPeersAbsent,
    #[error("failed to serialize fetched data: {0}")]
    Serialization(#[from] serde_json::Error),
}
