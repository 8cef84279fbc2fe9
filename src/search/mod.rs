//! Search backend abstraction
//!
//! The recommendation service talks to a document search backend
//! (Elasticsearch in production) exclusively through the [`SearchBackend`]
//! trait: index bootstrap, document reads/writes and ranked search. Keeping
//! the seam here lets service-level tests run against a mock backend and
//! keeps the core free of transport concerns.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::AppResult;

pub mod client;
pub mod mappings;
pub mod query;

pub use client::EsClient;
pub use query::{QueryLogic, SearchQueryBuilder};

/// Operations the core needs from a document search backend
///
/// Implementations must map "index/document missing" onto
/// `AppError::NotFound` and transport or query failures onto
/// `AppError::HttpClient`/`AppError::SearchBackend` so callers can tell a
/// missing document from a broken backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SearchBackend: Send + Sync {
    /// Checks whether an index exists
    async fn index_exists(&self, index: &str) -> AppResult<bool>;

    /// Creates an index from a full creation body (aliases, settings, mappings)
    async fn create_index(&self, index: &str, body: &Value) -> AppResult<()>;

    /// Fetches a document's source by id
    async fn get_document(&self, index: &str, id: &str) -> AppResult<Value>;

    /// Indexes a document, letting the backend assign an id when `id` is `None`
    async fn index_document<'a>(
        &self,
        index: &str,
        id: Option<&'a str>,
        body: &Value,
    ) -> AppResult<()>;

    /// Runs a search request body and returns the ranked hits
    async fn search(&self, index: &str, body: &Value) -> AppResult<SearchResponse>;
}

/// Ranked hits returned by [`SearchBackend::search`]
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub hits: HitsEnvelope,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HitsEnvelope {
    pub hits: Vec<Hit>,
}

/// A single search hit: relevance score, stored document and optional
/// per-field highlight fragments
#[derive(Debug, Clone, Deserialize)]
pub struct Hit {
    #[serde(rename = "_score")]
    pub score: Option<f64>,
    #[serde(rename = "_source")]
    pub source: Value,
    #[serde(default)]
    pub highlight: Option<HashMap<String, Vec<String>>>,
}

impl SearchResponse {
    /// Empty result set, used by tests and degraded paths
    pub fn empty() -> Self {
        Self {
            hits: HitsEnvelope { hits: Vec::new() },
        }
    }

    /// Deserializes every hit's `_source` into `T`, skipping malformed documents
    pub fn sources<T: serde::de::DeserializeOwned>(&self) -> Vec<T> {
        self.hits
            .hits
            .iter()
            .filter_map(|hit| serde_json::from_value(hit.source.clone()).ok())
            .collect()
    }
}
