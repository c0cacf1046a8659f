// [libs/core/sdk/src/lib.rs]
//! The participant-side SDK facade: bootstraps a node against the
//! platform and exposes messaging, storage, and data operations to
//! user analysis code.
//! Punto de entrada del SDK del participante.

pub mod config;
pub mod errors;
pub mod sdk;
pub mod token;
pub mod webhook;

pub use config::NodeConfig;
pub use errors::{ConfigError, SdkError};
pub use sdk::{AnalysisLivenessGuard, FlameSdk, NodeStatus};
pub use webhook::{WebhookState, WEBHOOK_PORT};
