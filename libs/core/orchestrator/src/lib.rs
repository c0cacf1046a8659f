// INICIO DEL ARCHIVO [libs/core/orchestrator/src/lib.rs]
/*!
 * =================================================================
 * APARATO: ORQUESTADOR DE TOPOLOGIA ESTRELLA (V1.1 - CENTINELA DE VIDA)
 * CLASIFICACIÓN: NUCLEO DE ORQUESTACIÓN (ESTRATO L6)
 * RESPONSABILIDAD: BARRERA DE DISPONIBILIDAD Y BUCLES DE ITERACION
 *
 * VISION HIPER-HOLÍSTICA:
 * Despacha al bucle de agregador o analizador segun el rol que el
 * broker asigno, impulsado por los closures `analyze`/`aggregate` que
 * aporta el usuario. Sostiene el guardian de vida del SDK durante toda
 * la ejecucion para que una caida de esta tarea — panico o retorno
 * temprano — se refleje de inmediato en `/healthz`.
 * =================================================================
 */

pub mod aggregator;
pub mod analyzer;
pub mod data;
pub mod errors;
pub mod readiness;
pub mod types;

pub use errors::OrchestratorError;
pub use types::{AggregateFn, AggregatorSpec, AnalyzeFn, AnalyzerSpec, DataQuery, RoleSpec, RunOutcome};

use flame_domain_models::NodeRole;
use flame_sdk::FlameSdk;

/// Dispatches to the aggregator or analyzer loop according to the role
/// the broker assigned this node, rejecting a mismatch before either
/// loop starts (spec.md §4.6/§7: a misconfigured `RoleSpec` is a fatal
/// startup error, not a mid-run failure).
pub async fn run(sdk: &FlameSdk, spec: RoleSpec, simple_analysis: bool) -> Result<RunOutcome, OrchestratorError> {
    let _liveness = sdk.analysis_liveness_guard();
    match (sdk.role(), spec) {
        (NodeRole::Aggregator, RoleSpec::Aggregator(spec)) => {
            let analyzers = peer_ids(sdk);
            let final_result_id = aggregator::run(sdk, spec, analyzers, simple_analysis).await?;
            Ok(RunOutcome::Aggregator { final_result_id })
        }
        (NodeRole::Default, RoleSpec::Analyzer(spec)) => {
            analyzer::run(sdk, spec, simple_analysis).await?;
            Ok(RunOutcome::Analyzer)
        }
        (NodeRole::Aggregator, RoleSpec::Analyzer(_)) => {
            Err(OrchestratorError::RoleMismatch { expected: "analyzer", actual: "aggregator" })
        }
        (NodeRole::Default, RoleSpec::Aggregator(_)) => {
            Err(OrchestratorError::RoleMismatch { expected: "aggregator", actual: "analyzer" })
        }
    }
}

/// Every other participant besides this node.
fn peer_ids(sdk: &FlameSdk) -> Vec<String> {
    let self_id = sdk.node_id();
    sdk.participant_ids().into_iter().filter(|id| *id != self_id).collect()
}
// FIN DEL ARCHIVO [libs/core/orchestrator/src/lib.rs]
