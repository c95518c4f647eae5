//! Vector stores and the upload log.
//!
//! - **Vector Stores**: the [`VectorStore`] trait with a Pinecone REST backend
//!   and an in-memory backend for tests
//! - **Upload Log**: filenames and chunk counts persisted as JSON in the data
//!   directory

// Vector store abstraction layer
pub mod vectorstore;

// Provider implementations
pub mod pinecone;

// Upload bookkeeping
pub mod upload_log;

// Re-exports
pub use pinecone::PineconeStore;
pub use upload_log::UploadLog;
pub use vectorstore::{InMemoryVectorStore, VectorStore};
