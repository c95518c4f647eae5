//! Question answering over the indexed chunks.

use crate::db::VectorStore;
use crate::llm::{LLMClient, TextStream};
use crate::rag::embeddings::EmbeddingClient;
use crate::types::{AppError, QueryMatch, Result};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that answers questions using the provided context.";

/// Source label for matches stored without one.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Default query size for [`QueryPipeline::indexed_sources`].
pub const DEFAULT_INDEXED_SOURCES_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub sources: Vec<String>,
}

/// User message sent to the completion model.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!("Context:\n{}\n\nQuestion: {}", context, question)
}

/// Matched chunk texts in ranking order, each followed by a newline.
fn context_of(matches: &[QueryMatch]) -> String {
    matches
        .iter()
        .filter_map(|m| m.metadata.as_ref())
        .fold(String::new(), |mut context, meta| {
            context.push_str(&meta.text);
            context.push('\n');
            context
        })
}

/// Distinct sources in first-seen order.
fn sources_of(matches: &[QueryMatch]) -> Vec<String> {
    let mut seen = HashSet::new();
    matches
        .iter()
        .map(|m| {
            m.metadata
                .as_ref()
                .and_then(|meta| meta.source.clone())
                .unwrap_or_else(|| UNKNOWN_SOURCE.to_string())
        })
        .filter(|source| seen.insert(source.clone()))
        .collect()
}

pub struct QueryPipeline {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LLMClient>,
    top_k: usize,
}

impl QueryPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LLMClient>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            llm,
            top_k,
        }
    }

    async fn retrieve(&self, question: &str) -> Result<Vec<QueryMatch>> {
        if question.trim().is_empty() {
            return Err(AppError::InvalidInput("No question provided".to_string()));
        }

        let vector = self.embedder.embed(question).await?;
        let matches = self.store.query(&vector, self.top_k, true).await?;
        tracing::debug!(matches = matches.len(), "Retrieved context");
        Ok(matches)
    }

    /// Answer `question` from the best-matching chunks.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let matches = self.retrieve(question).await?;
        let prompt = build_prompt(&context_of(&matches), question);

        let answer = self.llm.generate_with_system(SYSTEM_PROMPT, &prompt).await?;
        tracing::info!(
            model = self.llm.model_name(),
            matches = matches.len(),
            "Answered question"
        );

        Ok(Answer {
            question: question.to_string(),
            answer,
            sources: sources_of(&matches),
        })
    }

    /// Like [`QueryPipeline::answer`], but returns the answer as a stream of
    /// fragments. Retrieval errors are returned before the stream starts.
    pub async fn answer_stream(&self, question: &str) -> Result<TextStream> {
        let (_, stream) = self.answer_stream_with_sources(question).await?;
        Ok(stream)
    }

    /// [`QueryPipeline::answer_stream`] together with the sources of the
    /// chunks it was given, from a single retrieval.
    pub async fn answer_stream_with_sources(
        &self,
        question: &str,
    ) -> Result<(Vec<String>, TextStream)> {
        let matches = self.retrieve(question).await?;
        let prompt = build_prompt(&context_of(&matches), question);
        let stream = self.llm.stream_with_system(SYSTEM_PROMPT, &prompt).await?;
        Ok((sources_of(&matches), stream))
    }

    /// Sources of the chunks that would be used to answer `question`.
    pub async fn sources(&self, question: &str) -> Result<Vec<String>> {
        let matches = self.retrieve(question).await?;
        Ok(sources_of(&matches))
    }

    /// Distinct sources present in the index, sorted.
    ///
    /// Queries the index with an all-zero vector, so at most `limit` records
    /// are inspected.
    pub async fn indexed_sources(&self, limit: usize) -> Result<Vec<String>> {
        let zero = vec![0.0_f32; self.embedder.dimensions()];
        let matches = self.store.query(&zero, limit, true).await?;

        let sources: BTreeSet<String> = matches
            .into_iter()
            .filter_map(|m| m.metadata.and_then(|meta| meta.source))
            .collect();
        Ok(sources.into_iter().collect())
    }
}
