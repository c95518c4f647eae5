//! Mock implementations for testing.
//!
//! Deterministic stand-ins for the embedding and completion services, shared
//! across the integration test files.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use ragline::llm::{LLMClient, TextStream};
use ragline::rag::EmbeddingClient;
use ragline::types::{AppError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Dimension of [`MockEmbeddingClient`] vectors: one per ASCII letter.
pub const MOCK_DIMENSIONS: usize = 26;

#[derive(Clone, Copy, PartialEq)]
enum Failure {
    None,
    Always,
    MidStream,
}

/// Mock LLM client with a fixed answer.
///
/// Streams the answer in 5-character fragments and remembers the last
/// `(system, prompt)` pair it was called with.
///
/// ```ignore
/// let client = MockLLMClient::new("Hello, world!");
/// let client = MockLLMClient::failing();
/// let client = MockLLMClient::failing_mid_stream("partial answer");
/// ```
#[derive(Clone)]
pub struct MockLLMClient {
    response: String,
    failure: Failure,
    last_call: Arc<Mutex<Option<(String, String)>>>,
}

impl MockLLMClient {
    /// Create a new mock client that returns the given response.
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            failure: Failure::None,
            last_call: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            failure: Failure::Always,
            ..Self::new("")
        }
    }

    /// Create a mock client whose stream yields the first fragment of
    /// `response` and then fails.
    pub fn failing_mid_stream(response: &str) -> Self {
        Self {
            failure: Failure::MidStream,
            ..Self::new(response)
        }
    }

    /// The `(system, prompt)` of the most recent call.
    pub fn last_call(&self) -> Option<(String, String)> {
        self.last_call.lock().clone()
    }

    fn record(&self, system: &str, prompt: &str) -> Result<()> {
        *self.last_call.lock() = Some((system.to_string(), prompt.to_string()));
        if self.failure == Failure::Always {
            return Err(AppError::Completion("Mock LLM failure".to_string()));
        }
        Ok(())
    }

    fn fragments(&self) -> Vec<String> {
        self.response
            .chars()
            .collect::<Vec<_>>()
            .chunks(5)
            .map(|c| c.iter().collect())
            .collect()
    }

    fn fragment_stream(&self) -> TextStream {
        let mut items: Vec<Result<String>> = self.fragments().into_iter().map(Ok).collect();
        if self.failure == Failure::MidStream {
            items.truncate(1);
            items.push(Err(AppError::Completion("Mock stream interrupted".to_string())));
        }
        Box::new(stream::iter(items).boxed())
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.record("", prompt)?;
        Ok(self.response.clone())
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.record(system, prompt)?;
        Ok(self.response.clone())
    }

    async fn stream(&self, prompt: &str) -> Result<TextStream> {
        self.record("", prompt)?;
        Ok(self.fragment_stream())
    }

    async fn stream_with_system(&self, system: &str, prompt: &str) -> Result<TextStream> {
        self.record(system, prompt)?;
        Ok(self.fragment_stream())
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Mock embedding client producing letter-frequency vectors.
///
/// Texts made of the same letters land close together, so retrieval order
/// is predictable in tests.
#[derive(Clone, Default)]
pub struct MockEmbeddingClient {
    should_fail: bool,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockEmbeddingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Create a mock client that sleeps for `delay` before every embedding.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Number of `embed` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector_for(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; MOCK_DIMENSIONS];
        for c in text.chars().filter(|c| c.is_ascii_alphabetic()) {
            vector[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingClient for MockEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail {
            return Err(AppError::Embedding("Mock embedding failure".to_string()));
        }
        Ok(Self::vector_for(text))
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }

    fn dimensions(&self) -> usize {
        MOCK_DIMENSIONS
    }
}
