// [libs/infra/data-client/src/client.rs]
/*!
 * APARATO: CLIENTE DE DATOS (V1.1 - PORTADOR AUTENTICADO)
 * CLASIFICACIÓN: ADAPTADOR DE INFRAESTRUCTURA (ESTRATO L3)
 * RESPONSABILIDAD: FHIR Y OBJETOS A TRAVES DEL PROXY POR PROYECTO
 *
 * Toda peticion hacia el proxy del hub lleva el token de fuente de
 * datos como portador; jamas se consulta el proxy sin el.
 */

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use flame_domain_models::DataSourceDescriptor;
use reqwest::Client;
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::errors::DataError;
use crate::s3::extract_keys;

#[derive(Deserialize)]
struct DataSourceListResponse {
    data: Vec<DataSourceDescriptor>,
}

/// A lightweight handle bound to one data source's base path, as
/// returned by `get_data_client` (spec.md §4.5). Carries its own copy
/// of the data-source token so it keeps working across a
/// `refresh_token` on the client that produced it.
#[derive(Debug)]
pub struct DataSourceHandle {
    http: Client,
    base_path: String,
    token: String,
}

impl DataSourceHandle {
    pub async fn get(&self, relative_path: &str) -> Result<reqwest::Response, DataError> {
        let url = format!("{}/{}", self.base_path.trim_end_matches('/'), relative_path.trim_start_matches('/'));
        Ok(self.http.get(&url).bearer_auth(&self.token).send().await?)
    }
}

pub struct DataClient {
    http: Client,
    hub_base_url: String,
    project_id: String,
    token: RwLock<String>,
}

impl DataClient {
    pub fn new(hub_base_url: impl Into<String>, project_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("failed to build data HTTP client"),
            hub_base_url: hub_base_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            token: RwLock::new(token.into()),
        }
    }

    pub fn refresh_token(&self, token: String) {
        *self.token.write().unwrap() = token;
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(self.token.read().unwrap().clone())
    }

    #[instrument(skip(self))]
    pub async fn list_sources(&self) -> Result<Vec<DataSourceDescriptor>, DataError> {
        let url = format!("{}/kong/datastore/{}", self.hub_base_url, self.project_id);
        let response = self.authorized(self.http.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(DataError::Rejected(response.status().as_u16()));
        }
        Ok(response.json::<DataSourceListResponse>().await?.data)
    }

    /// For each source, for each query, `GET {source.name}/fhir/{query}`.
    /// Per-source failures are logged and skipped — the source's
    /// result map is still present, possibly empty (spec.md §4.5).
    #[instrument(skip(self, queries))]
    pub async fn get_fhir(&self, queries: &[String]) -> Result<HashMap<String, HashMap<String, serde_json::Value>>, DataError> {
        let sources = self.list_sources().await?;
        let mut results = HashMap::new();
        for source in sources {
            let mut per_query = HashMap::new();
            for query in queries {
                let url = format!("{}/kong/{}/fhir/{}", self.hub_base_url, source.name, query);
                match self.authorized(self.http.get(&url)).send().await {
                    Ok(response) if response.status().is_success() => match response.json::<serde_json::Value>().await {
                        Ok(payload) => {
                            per_query.insert(query.clone(), payload);
                        }
                        Err(err) => warn!(source = %source.id, query, error = %err, "failed to decode FHIR response"),
                    },
                    Ok(response) => warn!(source = %source.id, query, status = response.status().as_u16(), "FHIR query rejected"),
                    Err(err) => warn!(source = %source.id, query, error = %err, "FHIR query unreachable"),
                }
            }
            results.insert(source.id, per_query);
        }
        Ok(results)
    }

    /// For each source, enumerates keys via `GET {source.name}/s3`,
    /// filters, then fetches the matching objects. Per-source failures
    /// are fatal here, unlike `get_fhir` (spec.md §4.5).
    #[instrument(skip(self, key_filter))]
    pub async fn get_s3(&self, key_filter: &[String]) -> Result<HashMap<String, HashMap<String, Vec<u8>>>, DataError> {
        let sources = self.list_sources().await?;
        let mut results = HashMap::new();
        for source in sources {
            let listing_url = format!("{}/kong/{}/s3", self.hub_base_url, source.name);
            let listing_response = self.authorized(self.http.get(&listing_url)).send().await?;
            if !listing_response.status().is_success() {
                return Err(DataError::Rejected(listing_response.status().as_u16()));
            }
            let listing_body = listing_response.text().await?;
            let available_keys = extract_keys(&listing_body);
            let wanted: Vec<&String> = if key_filter.is_empty() {
                available_keys.iter().collect()
            } else {
                available_keys.iter().filter(|k| key_filter.contains(k)).collect()
            };

            let mut objects = HashMap::new();
            for key in wanted {
                let object_url = format!("{}/kong/{}/s3/{}", self.hub_base_url, source.name, key);
                let object_response = self.authorized(self.http.get(&object_url)).send().await?;
                if !object_response.status().is_success() {
                    return Err(DataError::Rejected(object_response.status().as_u16()));
                }
                objects.insert(key.clone(), object_response.bytes().await?.to_vec());
            }
            results.insert(source.id, objects);
        }
        Ok(results)
    }

    #[instrument(skip(self))]
    pub async fn get_data_client(&self, data_id: &str) -> Result<DataSourceHandle, DataError> {
        let sources = self.list_sources().await?;
        let source = sources
            .into_iter()
            .find(|s| s.id == data_id)
            .ok_or_else(|| DataError::UnknownDataSource(data_id.to_string()))?;
        Ok(DataSourceHandle {
            http: self.http.clone(),
            base_path: format!("{}/kong/{}", self.hub_base_url, source.name),
            token: self.token.read().unwrap().clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn server_with_one_source() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kong/datastore/proj-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "id": "src-1", "name": "site-a", "paths": [] }]
            })))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn fhir_skips_failing_sources_but_keeps_the_entry() {
        let server = server_with_one_source().await;
        Mock::given(method("GET"))
            .and(path("/kong/site-a/fhir/Patient"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = DataClient::new(server.uri(), "proj-1", "tok");
        let result = client.get_fhir(&["Patient".to_string()]).await.unwrap();
        assert!(result.contains_key("src-1"));
        assert!(result["src-1"].is_empty());
    }

    #[tokio::test]
    async fn fhir_collects_successful_queries() {
        let server = server_with_one_source().await;
        Mock::given(method("GET"))
            .and(path("/kong/site-a/fhir/Patient"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"total": 5})))
            .mount(&server)
            .await;

        let client = DataClient::new(server.uri(), "proj-1", "tok");
        let result = client.get_fhir(&["Patient".to_string()]).await.unwrap();
        assert_eq!(result["src-1"]["Patient"]["total"], 5);
    }

    #[tokio::test]
    async fn get_data_client_rejects_unknown_ids() {
        let server = server_with_one_source().await;
        let client = DataClient::new(server.uri(), "proj-1", "tok");
        let err = client.get_data_client("does-not-exist").await.unwrap_err();
        assert!(matches!(err, DataError::UnknownDataSource(_)));
    }
}
