// [libs/core/orchestrator/src/aggregator.rs]
/*!
 * APARATO: BUCLE DEL AGREGADOR (V1.0)
 * CLASIFICACIÓN: ORQUESTACIÓN DE ROL (ESTRATO L6)
 * RESPONSABILIDAD: CONVERGENCIA GLOBAL Y DIFUSION DE TERMINACION
 *
 * Espera el resultado intermedio de cada analizador, agrega, y decide
 * entre entregar el resultado final (difundiendo `analysis_finished`
 * a todo participante) o redistribuir el nuevo estado global y repetir.
 */

use std::time::Duration;

use flame_messaging_api::SendOptions;
use flame_sdk::FlameSdk;
use flame_storage_api::FinalResult;
use serde_json::Value;
use tracing::{info, instrument};

use crate::errors::OrchestratorError;
use crate::readiness;
use crate::types::AggregatorSpec;

const INTERMEDIATE_RESULTS: &str = "intermediate_results";
const AGGREGATED_RESULTS: &str = "aggregated_results";

#[instrument(skip(sdk, spec))]
pub async fn run(sdk: &FlameSdk, spec: AggregatorSpec, analyzers: Vec<String>, simple_analysis: bool) -> Result<String, OrchestratorError> {
    readiness::wait_for(sdk, analyzers.clone()).await?;

    let mut aggregated = Value::Null;
    let mut iteration = 0u32;
    loop {
        iteration += 1;
        info!(iteration, "aggregator awaiting analyzer results");
        let responses = sdk.await_intermediate_data::<Value>(&analyzers, INTERMEDIATE_RESULTS, None).await?;

        let node_results: Vec<Value> = analyzers.iter().filter_map(|id| responses.get(id).cloned().flatten()).collect();
        if node_results.is_empty() {
            return Err(OrchestratorError::AllPeersAbsent);
        }

        let (result, converged) = (spec.aggregate)(&node_results, simple_analysis);
        aggregated = result;
        let converged = converged || simple_analysis;

        if converged {
            let final_id = sdk.submit_final(&FinalResult::Object(&aggregated), spec.output_type, None).await?;
            sdk.analysis_finished().await?;
            info!(iteration, final_id, "aggregation converged, final result submitted");
            return Ok(final_id);
        }

        let options = SendOptions { max_attempts: 1, total_timeout: None, per_attempt_timeout: Duration::from_secs(10) };
        sdk.send_intermediate_data(&analyzers, &FinalResult::Object(&aggregated), AGGREGATED_RESULTS, false, options).await?;
    }
}
