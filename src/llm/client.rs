//! LLM client abstraction
//!
//! The query pipeline only depends on [`LLMClient`], so the hosted chat model
//! can be swapped for a deterministic fake in tests.

use crate::types::Result;
use async_trait::async_trait;
use futures::Stream;

/// Ordered stream of text fragments produced by a streaming completion.
///
/// A failure after the stream has started is yielded once as `Err` and the
/// stream ends.
pub type TextStream = Box<dyn Stream<Item = Result<String>> + Send + Unpin>;

/// Generic LLM client trait for provider abstraction
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a single user prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Stream a completion for a single user prompt
    async fn stream(&self, prompt: &str) -> Result<TextStream>;

    /// Stream a completion with system prompt
    async fn stream_with_system(&self, system: &str, prompt: &str) -> Result<TextStream>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}
