// [libs/infra/storage-client/src/client.rs]
/*!
 * APARATO: CLIENTE DE ALMACENAMIENTO (V1.0)
 * CLASIFICACIÓN: ADAPTADOR DE INFRAESTRUCTURA (ESTRATO L3)
 * RESPONSABILIDAD: PUT/GET CRUDOS SOBRE EL DEPOSITO DE OBJETOS
 *
 * No conserva estado propio — codificacion y semantica de tags viven
 * una capa arriba, en la API de almacenamiento.
 */

use std::sync::RwLock;
use std::time::Duration;

use flame_domain_models::ArtifactLocation;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::errors::StorageError;

#[derive(Deserialize)]
struct PutResponse {
    url: String,
}

#[derive(Deserialize)]
pub struct TagEntry {
    pub name: String,
    pub url: String,
}

#[derive(Deserialize)]
struct TagListResponse {
    tags: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagLookupEntry {
    url: String,
}

#[derive(Deserialize)]
struct TagLookupResponse {
    results: Vec<TagLookupEntry>,
}

fn id_from_url(url: &str) -> Option<String> {
    url.trim_end_matches('/').rsplit('/').next().map(str::to_string)
}

pub struct StorageClient {
    http: Client,
    token: RwLock<String>,
    base_url: String,
}

impl StorageClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("failed to build storage HTTP client"),
            token: RwLock::new(token.into()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn refresh_token(&self, token: String) {
        *self.token.write().unwrap() = token;
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(self.token.read().unwrap().clone())
    }

    /// `PUT /{bucket}/` with the payload as a multipart file, plus
    /// optional `tag`/`remote_node_id` form fields. Returns the
    /// server-assigned id (the last URL path segment).
    #[instrument(skip(self, payload))]
    pub async fn put(
        &self,
        location: ArtifactLocation,
        payload: Vec<u8>,
        tag: Option<&str>,
        remote_node_id: Option<&str>,
    ) -> Result<String, StorageError> {
        let url = format!("{}/{}/", self.base_url, location.bucket_path());
        let mut form = Form::new().part("file", Part::bytes(payload).file_name("artifact.bin"));
        if let Some(tag) = tag {
            form = form.text("tag", tag.to_string());
        }
        if let Some(node_id) = remote_node_id {
            form = form.text("remote_node_id", node_id.to_string());
        }
        self.put_form(&url, form).await
    }

    /// `PUT /final/localdp`: the final bucket's local differential
    /// privacy variant, with `epsilon`/`sensitivity` form fields.
    #[instrument(skip(self, payload))]
    pub async fn put_with_local_dp(&self, payload: Vec<u8>, epsilon: f64, sensitivity: f64) -> Result<String, StorageError> {
        let url = format!("{}/final/localdp", self.base_url);
        let form = Form::new()
            .part("file", Part::bytes(payload).file_name("artifact.bin"))
            .text("epsilon", epsilon.to_string())
            .text("sensitivity", sensitivity.to_string());
        self.put_form(&url, form).await
    }

    async fn put_form(&self, url: &str, form: Form) -> Result<String, StorageError> {
        let response = self.authorized(self.http.put(url)).multipart(form).send().await?;
        if !response.status().is_success() {
            return Err(StorageError::Rejected(response.status().as_u16()));
        }
        let body: PutResponse = response.json().await?;
        id_from_url(&body.url).ok_or(StorageError::MissingUrl)
    }

    /// `GET /{bucket}/{id}`, optionally `?node_id=...` when retrieving
    /// an encrypted intermediate artifact addressed to that recipient.
    #[instrument(skip(self))]
    pub async fn get(&self, location: ArtifactLocation, id: &str, node_id: Option<&str>) -> Result<Vec<u8>, StorageError> {
        let mut url = format!("{}/{}/{}", self.base_url, location.bucket_path(), id);
        if let Some(node_id) = node_id {
            url = format!("{url}?node_id={node_id}");
        }
        let response = self.authorized(self.http.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(StorageError::Rejected(response.status().as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }

    #[instrument(skip(self))]
    pub async fn list_tags(&self) -> Result<Vec<TagEntry>, StorageError> {
        let url = format!("{}/local/tags", self.base_url);
        let response = self.authorized(self.http.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(StorageError::Rejected(response.status().as_u16()));
        }
        Ok(response.json::<TagListResponse>().await?.tags)
    }

    #[instrument(skip(self))]
    pub async fn tag_urls(&self, tag: &str) -> Result<Vec<String>, StorageError> {
        let url = format!("{}/local/tags/{}", self.base_url, tag);
        let response = self.authorized(self.http.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(StorageError::Rejected(response.status().as_u16()));
        }
        Ok(response.json::<TagLookupResponse>().await?.results.into_iter().map(|e| e.url).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_extracted_from_trailing_url_segment() {
        assert_eq!(id_from_url("https://store/final/abc123"), Some("abc123".to_string()));
        assert_eq!(id_from_url("https://store/final/abc123/"), Some("abc123".to_string()));
    }

    #[tokio::test]
    async fn put_returns_the_server_assigned_id() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/intermediate/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "url": "https://store/intermediate/xyz" })))
            .mount(&server)
            .await;

        let client = StorageClient::new(server.uri(), "tok");
        let id = client.put(ArtifactLocation::Intermediate, b"payload".to_vec(), None, None).await.unwrap();
        assert_eq!(id, "xyz");
    }

    #[tokio::test]
    async fn get_returns_raw_bytes() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/final/xyz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello".to_vec()))
            .mount(&server)
            .await;

        let client = StorageClient::new(server.uri(), "tok");
        let bytes = client.get(ArtifactLocation::Final, "xyz", None).await.unwrap();
        assert_eq!(bytes, b"hello");
    }
}
