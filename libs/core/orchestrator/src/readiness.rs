// [libs/core/orchestrator/src/readiness.rs]
//! The readiness barrier (spec.md §4.6 preamble step 2): both roles
//! retry `ready_check` at a 1 s cadence with a generous per-attempt
//! budget and no overall timeout, so a late-starting peer is never a
//! permanent failure.

use std::time::Duration;

use flame_sdk::FlameSdk;
use tracing::info;

use crate::errors::OrchestratorError;

const ATTEMPT_BUDGET: Duration = Duration::from_secs(120);

pub async fn wait_for(sdk: &FlameSdk, nodes: Vec<String>) -> Result<(), OrchestratorError> {
    info!(?nodes, "waiting for readiness barrier");
    sdk.ready_check(nodes, ATTEMPT_BUDGET, None).await?;
    Ok(())
}
