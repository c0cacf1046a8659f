// [libs/core/orchestrator/src/data.rs]
//! Fetches the data an analyzer iterates over, once, up front
//! (spec.md §4.6 analyzer loop step 1), and renders it as a single
//! JSON value so user callables see one shape regardless of source.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flame_sdk::FlameSdk;
use serde_json::Value;
use std::collections::HashMap;

use crate::errors::OrchestratorError;
use crate::types::DataQuery;

pub async fn fetch(sdk: &FlameSdk, query: &DataQuery) -> Result<Value, OrchestratorError> {
    match query {
        DataQuery::Fhir(queries) => {
            let data = sdk.get_fhir(queries).await?;
            Ok(serde_json::to_value(data)?)
        }
        DataQuery::S3(keys) => {
            let data = sdk.get_s3(keys).await?;
            let encoded: HashMap<String, HashMap<String, String>> = data
                .into_iter()
                .map(|(source, objects)| (source, objects.into_iter().map(|(key, bytes)| (key, STANDARD.encode(bytes))).collect()))
                .collect();
            Ok(serde_json::to_value(encoded)?)
        }
    }
}
