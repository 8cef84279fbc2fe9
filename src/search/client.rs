//! Elasticsearch implementation of [`SearchBackend`]
//!
//! Talks to the cluster over its REST API with a plain HTTP client and an
//! optional API key, the same surface the original service was deployed
//! against. Responses are checked for HTTP status before parsing; a
//! non-success status becomes `AppError::SearchBackend` carrying the
//! backend's own error body.

use reqwest::{Client as HttpClient, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    search::{SearchBackend, SearchResponse},
};

#[derive(Clone)]
pub struct EsClient {
    http_client: HttpClient,
    endpoint: String,
    api_key: Option<String>,
}

impl EsClient {
    pub fn new(endpoint: String, api_key: Option<String>) -> Self {
        Self {
            http_client: HttpClient::new(),
            endpoint,
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self.http_client.request(method, self.url(path));
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("ApiKey {}", key));
        }
        builder
    }
}

/// Converts a non-success response into a backend error with the
/// backend's error body attached
async fn ensure_success(op: &str, response: Response) -> AppResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(AppError::SearchBackend(format!(
        "{} returned status {}: {}",
        op, status, body
    )))
}

#[async_trait::async_trait]
impl SearchBackend for EsClient {
    async fn index_exists(&self, index: &str) -> AppResult<bool> {
        let response = self.request(Method::HEAD, index).send().await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(AppError::SearchBackend(format!(
                "index existence check returned status {}",
                status
            ))),
        }
    }

    async fn create_index(&self, index: &str, body: &Value) -> AppResult<()> {
        let response = self.request(Method::PUT, index).json(body).send().await?;

        ensure_success("index creation", response).await?;
        tracing::info!(index = %index, "Index created");
        Ok(())
    }

    async fn get_document(&self, index: &str, id: &str) -> AppResult<Value> {
        let path = format!("{}/_doc/{}", index, id);
        let response = self.request(Method::GET, &path).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!(
                "document {} in index {}",
                id, index
            )));
        }

        let response = ensure_success("document fetch", response).await?;
        let doc: Value = response.json().await?;

        doc.get("_source").cloned().ok_or_else(|| {
            AppError::SearchBackend("document response missing _source".to_string())
        })
    }

    async fn index_document<'a>(
        &self,
        index: &str,
        id: Option<&'a str>,
        body: &Value,
    ) -> AppResult<()> {
        let response = match id {
            Some(id) => {
                let path = format!("{}/_doc/{}", index, id);
                self.request(Method::PUT, &path).json(body).send().await?
            }
            None => {
                let path = format!("{}/_doc", index);
                self.request(Method::POST, &path).json(body).send().await?
            }
        };

        ensure_success("document indexing", response).await?;
        Ok(())
    }

    async fn search(&self, index: &str, body: &Value) -> AppResult<SearchResponse> {
        let path = format!("{}/_search", index);

        tracing::debug!(index = %index, "Executing search");

        let response = self.request(Method::POST, &path).json(body).send().await?;
        let response = ensure_success("search", response).await?;

        let raw = response.text().await?;
        serde_json::from_str(&raw).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse search response");
            AppError::SearchBackend(format!("unparseable search response: {}", e))
        })
    }
}
