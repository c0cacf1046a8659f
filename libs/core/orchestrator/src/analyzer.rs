// [libs/core/orchestrator/src/analyzer.rs]
/*!
 * APARATO: BUCLE DEL ANALIZADOR (V1.1 - TERMINACION ESTRICTA)
 * CLASIFICACIÓN: ORQUESTACIÓN DE ROL (ESTRATO L6)
 * RESPONSABILIDAD: ITERACION ANALYZE/ESPERA HASTA CONVERGENCIA LOCAL
 *
 * El flag de terminacion se revisa al inicio de cada vuelta, antes de
 * invocar `analyze` o enviar resultados intermedios — una vez
 * observado `analysis_finished`, esta vuelta jamas produce un envio mas.
 */

use std::time::Duration;

use flame_messaging_api::SendOptions;
use flame_sdk::FlameSdk;
use flame_storage_api::FinalResult;
use serde_json::Value;
use tracing::{info, instrument};

use crate::data;
use crate::errors::OrchestratorError;
use crate::readiness;
use crate::types::AnalyzerSpec;

const INTERMEDIATE_RESULTS: &str = "intermediate_results";
const AGGREGATED_RESULTS: &str = "aggregated_results";
const AWAIT_AGGREGATED_TIMEOUT: Duration = Duration::from_secs(300);
const FINISHED_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[instrument(skip(sdk, spec))]
pub async fn run(sdk: &FlameSdk, spec: AnalyzerSpec, simple_analysis: bool) -> Result<(), OrchestratorError> {
    let aggregator_id = sdk.aggregator_id().ok_or(OrchestratorError::NoAggregator)?;
    readiness::wait_for(sdk, vec![aggregator_id.clone()]).await?;

    let analyzed_data = data::fetch(sdk, &spec.query).await?;

    let mut aggregator_result: Option<Value> = None;
    let mut previous: Option<(Value, Value)> = None;
    let mut iteration = 0u32;

    loop {
        if sdk.is_finished() {
            break;
        }

        iteration += 1;
        let (result, converged) = (spec.analyze)(&analyzed_data, aggregator_result.as_ref(), simple_analysis);

        let repeated = previous.as_ref().is_some_and(|(prev_data, prev_result)| *prev_data == analyzed_data && *prev_result == result);
        let locally_converged = converged || simple_analysis || repeated;
        info!(iteration, locally_converged, "analyzer iteration complete");
        previous = Some((analyzed_data.clone(), result.clone()));

        if !locally_converged {
            let options = SendOptions { max_attempts: 1, total_timeout: None, per_attempt_timeout: Duration::from_secs(10) };
            sdk.send_intermediate_data(&[aggregator_id.clone()], &FinalResult::Object(&result), INTERMEDIATE_RESULTS, false, options).await?;
        }

        if sdk.is_finished() || locally_converged {
            break;
        }

        let responses = sdk.await_intermediate_data::<Value>(&[aggregator_id.clone()], AGGREGATED_RESULTS, Some(AWAIT_AGGREGATED_TIMEOUT)).await?;
        aggregator_result = responses.get(&aggregator_id).cloned().flatten();
    }

    while !sdk.is_finished() {
        tokio::time::sleep(FINISHED_POLL_INTERVAL).await;
    }
    Ok(())
}
