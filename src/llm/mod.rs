//! LLM Provider Clients and Abstractions
//!
//! - [`LLMClient`] - The trait the query pipeline talks to
//! - [`OpenAIClient`] - Client for OpenAI-compatible `/chat/completions` endpoints
//!
//! # Streaming
//!
//! `stream` and `stream_with_system` return a [`TextStream`], a
//! `Box<dyn Stream<Item = Result<String>> + Send + Unpin>` of content deltas in
//! arrival order. Concatenating every fragment reconstructs the full answer.

/// Core LLM client trait and streaming response types.
pub mod client;
/// OpenAI-compatible chat completion client.
pub mod openai;

pub use client::{LLMClient, TextStream};
pub use openai::OpenAIClient;
