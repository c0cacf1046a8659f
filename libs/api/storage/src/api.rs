// [libs/api/storage/src/api.rs]
/*!
 * APARATO: API DE ALMACENAMIENTO (V1.0)
 * CLASIFICACIÓN: API DE APLICACIÓN (ESTRATO L4)
 * RESPONSABILIDAD: RESULTADOS INTERMEDIOS, ENTREGA FINAL, TAGS LOCALES
 *
 * Eleva el cliente crudo de almacenamiento a helpers de envio/espera
 * de datos intermedios, reglas de privacidad diferencial local para
 * la entrega final, y etiquetado del bucket local.
 */

use std::collections::HashMap;
use std::sync::Arc;

use flame_domain_models::{validate_tag, ArtifactLocation, LocalDifferentialPrivacyParams, TagOption};
use flame_storage_client::{StorageClient, TagEntry};
use flame_telemetry::Logger;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::instrument;

use crate::errors::StorageApiError;
use crate::payload::{encode_final, encode_pickled, numeric_value, FinalResult, OutputType};
use crate::tags;

/// The id(s) returned by `send_intermediate_data`: a single id in
/// plaintext mode, or one id per recipient under encryption (spec.md
/// §4.4).
#[derive(Debug, Clone)]
pub enum SendIntermediateResult {
    Plain(String),
    Encrypted(HashMap<String, String>),
}

pub struct StorageApi {
    storage: Arc<StorageClient>,
    logger: Arc<Logger>,
}

impl StorageApi {
    pub fn new(storage: Arc<StorageClient>, logger: Arc<Logger>) -> Self {
        Self { storage, logger }
    }

    /// Writes a `final` result. With `dp` set, the result must be
    /// finite and numeric and the store's localdp endpoint is used
    /// instead of the plain PUT; DP noise is never added client-side.
    #[instrument(skip(self, result))]
    pub async fn submit_final<T: Serialize>(&self, result: &FinalResult<'_, T>, output_type: OutputType, dp: Option<LocalDifferentialPrivacyParams>) -> Result<String, StorageApiError> {
        match dp {
            Some(params) => {
                let numeric = numeric_value(result).ok_or(StorageApiError::DpResultNotNumeric)?;
                params.validate(numeric)?;
                let bytes = encode_final(result, output_type, &self.logger).await?;
                Ok(self.storage.put_with_local_dp(bytes, params.epsilon, params.sensitivity).await?)
            }
            None => {
                let bytes = encode_final(result, output_type, &self.logger).await?;
                Ok(self.storage.put(ArtifactLocation::Final, bytes, None, None).await?)
            }
        }
    }

    /// Writes to the `local` bucket, always self-describing encoded,
    /// with an optional caller-chosen tag.
    #[instrument(skip(self, result))]
    pub async fn save_local<T: Serialize>(&self, result: &FinalResult<'_, T>, tag: Option<&str>) -> Result<String, StorageApiError> {
        if let Some(tag) = tag {
            validate_tag(tag, ArtifactLocation::Local)?;
        }
        let bytes = encode_pickled(result)?;
        Ok(self.storage.put(ArtifactLocation::Local, bytes, tag, None).await?)
    }

    #[instrument(skip(self))]
    pub async fn load_local<T: DeserializeOwned>(&self, id: &str) -> Result<T, StorageApiError> {
        let bytes = self.storage.get(ArtifactLocation::Local, id, None).await?;
        Ok(flame_serialization::decode(&bytes)?)
    }

    pub async fn list_local_tags(&self) -> Result<Vec<TagEntry>, StorageApiError> {
        Ok(self.storage.list_tags().await?)
    }

    /// Resolves a tag to the URL(s) selected by `tag_option`.
    pub async fn tag_urls(&self, tag: &str, option: TagOption) -> Result<Vec<String>, StorageApiError> {
        let urls = self.storage.tag_urls(tag).await?;
        Ok(tags::select(&urls, option))
    }

    /// Writes to `intermediate`. Plaintext mode issues a single PUT and
    /// returns one id visible to any node; encrypted mode issues one
    /// PUT per recipient and returns a `{recipientId: id}` map.
    #[instrument(skip(self, value))]
    pub async fn send_intermediate_data<T: Serialize>(&self, receivers: &[String], value: &FinalResult<'_, T>, encrypted: bool) -> Result<SendIntermediateResult, StorageApiError> {
        let bytes = encode_pickled(value)?;

        if encrypted {
            if receivers.is_empty() {
                return Err(StorageApiError::MissingRecipients);
            }
            let mut ids = HashMap::with_capacity(receivers.len());
            for receiver in receivers {
                let id = self.storage.put(ArtifactLocation::Intermediate, bytes.clone(), None, Some(receiver)).await?;
                ids.insert(receiver.clone(), id);
            }
            Ok(SendIntermediateResult::Encrypted(ids))
        } else {
            let id = self.storage.put(ArtifactLocation::Intermediate, bytes, None, None).await?;
            Ok(SendIntermediateResult::Plain(id))
        }
    }

    /// Reads back an intermediate artifact sent by `sender`. Under
    /// encryption, looks up `self_node_id`'s entry in the id map and
    /// passes `sender` as the `node_id` hint so the store can decrypt.
    #[instrument(skip(self, result_id))]
    pub async fn await_intermediate_data<T: DeserializeOwned>(&self, sender: &str, result_id: &SendIntermediateResult, self_node_id: &str) -> Result<T, StorageApiError> {
        let bytes = match result_id {
            SendIntermediateResult::Plain(id) => self.storage.get(ArtifactLocation::Intermediate, id, None).await?,
            SendIntermediateResult::Encrypted(ids) => {
                let id = ids.get(self_node_id).ok_or_else(|| StorageApiError::UnknownRecipient(self_node_id.to_string()))?;
                self.storage.get(ArtifactLocation::Intermediate, id, Some(sender)).await?
            }
        };
        Ok(flame_serialization::decode(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_over(server: &MockServer) -> StorageApi {
        let storage = Arc::new(StorageClient::new(server.uri(), "tok"));
        let logger = Arc::new(Logger::new());
        StorageApi::new(storage, logger)
    }

    #[tokio::test]
    async fn submit_final_as_str_sends_utf8_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/final/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "url": "https://store/final/id1" })))
            .mount(&server)
            .await;

        let api = api_over(&server);
        let result: FinalResult<'_, ()> = FinalResult::Str("0.87".to_string());
        let id = api.submit_final(&result, OutputType::Str, None).await.unwrap();
        assert_eq!(id, "id1");
    }

    #[tokio::test]
    async fn submit_final_with_dp_uses_localdp_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/final/localdp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "url": "https://store/final/dp1" })))
            .mount(&server)
            .await;

        let api = api_over(&server);
        let result: FinalResult<'_, ()> = FinalResult::Str("0.5".to_string());
        let params = LocalDifferentialPrivacyParams { epsilon: 1.0, sensitivity: 0.1 };
        let id = api.submit_final(&result, OutputType::Str, Some(params)).await.unwrap();
        assert_eq!(id, "dp1");
    }

    #[tokio::test]
    async fn submit_final_with_dp_rejects_non_numeric_results() {
        let server = MockServer::start().await;
        let api = api_over(&server);
        let result: FinalResult<'_, ()> = FinalResult::Bytes(vec![1, 2, 3]);
        let params = LocalDifferentialPrivacyParams { epsilon: 1.0, sensitivity: 0.1 };
        let err = api.submit_final(&result, OutputType::Bytes, Some(params)).await.unwrap_err();
        assert!(matches!(err, StorageApiError::DpResultNotNumeric));
    }

    #[tokio::test]
    async fn save_local_rejects_invalid_tags() {
        let server = MockServer::start().await;
        let api = api_over(&server);
        let result: FinalResult<'_, ()> = FinalResult::Str("x".to_string());
        let err = api.save_local(&result, Some("Not Valid")).await.unwrap_err();
        assert!(matches!(err, StorageApiError::Tag(_)));
    }

    #[tokio::test]
    async fn send_intermediate_data_encrypted_returns_one_id_per_recipient() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/intermediate/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "url": "https://store/intermediate/abc" })))
            .mount(&server)
            .await;

        let api = api_over(&server);
        let value = 0.5_f64;
        let result = FinalResult::Object(&value);
        let receivers = vec!["aggregator".to_string()];
        let outcome = api.send_intermediate_data(&receivers, &result, true).await.unwrap();
        match outcome {
            SendIntermediateResult::Encrypted(map) => {
                assert_eq!(map.len(), 1);
                assert_eq!(map.get("aggregator"), Some(&"abc".to_string()));
            }
            SendIntermediateResult::Plain(_) => panic!("expected encrypted outcome"),
        }
    }

    #[tokio::test]
    async fn send_intermediate_data_encrypted_without_receivers_fails() {
        let server = MockServer::start().await;
        let api = api_over(&server);
        let value = 0.5_f64;
        let result = FinalResult::Object(&value);
        let err = api.send_intermediate_data(&[], &result, true).await.unwrap_err();
        assert!(matches!(err, StorageApiError::MissingRecipients));
    }

    #[tokio::test]
    async fn await_intermediate_data_round_trips_through_the_store() {
        let server = MockServer::start().await;
        let bytes = flame_serialization::encode(&0.5_f64).unwrap();
        Mock::given(method("GET"))
            .and(path("/intermediate/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes))
            .mount(&server)
            .await;

        let api = api_over(&server);
        let mut ids = HashMap::new();
        ids.insert("aggregator".to_string(), "abc".to_string());
        let outcome = SendIntermediateResult::Encrypted(ids);
        let value: f64 = api.await_intermediate_data("analyzer-1", &outcome, "aggregator").await.unwrap();
        assert_eq!(value, 0.5);
    }
}
