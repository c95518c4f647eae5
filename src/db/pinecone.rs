//! Pinecone vector database integration.
//!
//! Talks to the Pinecone REST data plane of a single index:
//!
//! - `POST /vectors/upsert`
//! - `POST /query`
//! - `POST /vectors/delete`
//! - `POST /describe_index_stats`
//!
//! The data-plane host is either configured directly (`PINECONE_HOST`) or
//! looked up once at startup through the control plane
//! (`GET {controller}/indexes/{name}`).
//!
//! # Example
//!
//! ```rust,ignore
//! use ragline::db::PineconeStore;
//!
//! let store = PineconeStore::connect(http, &config.pinecone).await?;
//! store.upsert(&records).await?;
//! let matches = store.query(&embedding, 5, true).await?;
//! ```

use crate::db::vectorstore::VectorStore;
use crate::types::{AppError, IndexStats, QueryMatch, Result, VectorRecord};
use crate::utils::config::PineconeConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Pinecone REST API version sent with every request.
pub const PINECONE_API_VERSION: &str = "2024-07";

/// Maximum vectors per upsert request.
const UPSERT_BATCH_SIZE: usize = 100;
/// Maximum ids per delete request.
const DELETE_BATCH_SIZE: usize = 1000;

/// Pinecone index accessed over its REST data plane.
pub struct PineconeStore {
    http: reqwest::Client,
    api_key: String,
    host: String,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [String],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    dimension: usize,
    #[serde(default)]
    total_vector_count: u64,
}

#[derive(Deserialize)]
struct IndexDescription {
    host: String,
    #[serde(default)]
    spec: Option<IndexSpec>,
}

#[derive(Deserialize)]
struct IndexSpec {
    #[serde(default)]
    serverless: Option<ServerlessSpec>,
    #[serde(default)]
    pod: Option<PodSpec>,
}

#[derive(Deserialize)]
struct ServerlessSpec {
    region: String,
}

#[derive(Deserialize)]
struct PodSpec {
    environment: String,
}

impl IndexDescription {
    /// Region (serverless) or environment (pod-based) the index lives in.
    fn location(&self) -> Option<&str> {
        let spec = self.spec.as_ref()?;
        spec.serverless
            .as_ref()
            .map(|s| s.region.as_str())
            .or_else(|| spec.pod.as_ref().map(|p| p.environment.as_str()))
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

/// Read the error message out of a Pinecone error body, falling back to the raw body.
fn api_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        message: Option<String>,
        error: Option<Inner>,
    }
    #[derive(Deserialize)]
    struct Inner {
        message: String,
    }

    match serde_json::from_str::<Envelope>(body) {
        Ok(Envelope {
            error: Some(inner), ..
        }) => inner.message,
        Ok(Envelope {
            message: Some(message),
            ..
        }) => message,
        _ => body.trim().to_string(),
    }
}

async fn check_status(response: reqwest::Response, operation: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::VectorStore(format!(
        "Pinecone {} failed ({}): {}",
        operation,
        status,
        api_error_message(&body)
    )))
}

impl PineconeStore {
    /// Create a store for the index served at `host`.
    ///
    /// A host without a scheme is reached over HTTPS.
    pub fn new(http: reqwest::Client, api_key: impl Into<String>, host: &str) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            host: normalize_host(host),
        }
    }

    /// Create a store from configuration, resolving the index host through
    /// the control plane when none is configured.
    pub async fn connect(http: reqwest::Client, config: &PineconeConfig) -> Result<Self> {
        let host = match &config.host {
            Some(host) => host.clone(),
            None => {
                let description = describe_index(
                    &http,
                    &config.api_key,
                    &config.controller_url,
                    &config.index_name,
                )
                .await?;

                match description.location() {
                    Some(location) if location != config.environment => {
                        tracing::warn!(
                            index = %config.index_name,
                            configured = %config.environment,
                            actual = %location,
                            "Pinecone index lives outside the configured environment"
                        );
                    }
                    _ => {}
                }
                description.host
            }
        };

        let store = Self::new(http, config.api_key.clone(), &host);
        tracing::info!(index = %config.index_name, host = %store.host, "Connected to Pinecone");
        Ok(store)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        operation: &str,
    ) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(format!("{}{}", self.host, path))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::VectorStore(format!("Pinecone {} request failed: {}", operation, e)))?;

        check_status(response, operation).await
    }
}

async fn describe_index(
    http: &reqwest::Client,
    api_key: &str,
    controller_url: &str,
    index_name: &str,
) -> Result<IndexDescription> {
    let url = format!("{}/indexes/{}", controller_url.trim_end_matches('/'), index_name);
    let response = http
        .get(url)
        .header("Api-Key", api_key)
        .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
        .send()
        .await
        .map_err(|e| AppError::VectorStore(format!("Pinecone describe_index request failed: {}", e)))?;

    check_status(response, "describe_index")
        .await?
        .json()
        .await
        .map_err(|e| AppError::VectorStore(format!("Invalid describe_index response: {}", e)))
}

#[async_trait]
impl VectorStore for PineconeStore {
    fn provider_name(&self) -> &'static str {
        "pinecone"
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        let mut written = 0;
        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            let response: UpsertResponse = self
                .post("/vectors/upsert", &UpsertRequest { vectors: batch }, "upsert")
                .await?
                .json()
                .await
                .map_err(|e| AppError::VectorStore(format!("Invalid upsert response: {}", e)))?;
            written += response.upserted_count.unwrap_or(batch.len());
        }
        Ok(written)
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<QueryMatch>> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata,
            include_values: false,
        };
        let response: QueryResponse = self
            .post("/query", &request, "query")
            .await?
            .json()
            .await
            .map_err(|e| AppError::VectorStore(format!("Invalid query response: {}", e)))?;

        Ok(response.matches)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        for batch in ids.chunks(DELETE_BATCH_SIZE) {
            self.post("/vectors/delete", &DeleteRequest { ids: batch }, "delete")
                .await?;
        }
        Ok(())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let response: StatsResponse = self
            .post("/describe_index_stats", &serde_json::json!({}), "describe_index_stats")
            .await?
            .json()
            .await
            .map_err(|e| AppError::VectorStore(format!("Invalid stats response: {}", e)))?;

        Ok(IndexStats {
            dimension: response.dimension,
            total_vector_count: response.total_vector_count,
        })
    }
}
