//! Embedding clients.
//!
//! One text in, one fixed-length vector out. A failure surfaces as
//! [`AppError::Embedding`].

use crate::types::{AppError, Result};
use async_openai::{
    config::OpenAIConfig, types::embeddings::CreateEmbeddingRequestArgs, Client,
};
use async_trait::async_trait;

#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Identifier of the embedding model.
    fn model_name(&self) -> &str;

    /// Length of the vectors returned by [`EmbeddingClient::embed`].
    fn dimensions(&self) -> usize;
}

/// Client for OpenAI-compatible `/embeddings` endpoints.
pub struct OpenAIEmbeddings {
    client: Client<OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbeddings {
    pub fn new(
        http: reqwest::Client,
        api_key: String,
        api_base: String,
        model: String,
        dimensions: usize,
    ) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base.trim_end_matches('/'));

        Self {
            client: Client::with_config(config).with_http_client(http),
            model,
            dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingClient for OpenAIEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(text)
            .build()
            .map_err(|e| AppError::Embedding(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| AppError::Embedding(format!("OpenAI API error: {}", e)))?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
