#![allow(dead_code)]

pub mod mocks;

use mocks::{MockEmbeddingClient, MockLLMClient, MOCK_DIMENSIONS};
use ragline::db::{InMemoryVectorStore, UploadLog};
use ragline::utils::config::RagConfig;
use ragline::AppState;
use std::sync::Arc;
use tempfile::TempDir;

/// Application state over the in-memory vector store and mocks.
///
/// The returned `TempDir` holds the upload log and the upload spool
/// directory ([`TestContext::spool_dir`]) and must outlive the state.
pub struct TestContext {
    pub state: AppState,
    pub store: Arc<InMemoryVectorStore>,
    pub embedder: MockEmbeddingClient,
    pub llm: MockLLMClient,
    pub dir: TempDir,
}

pub async fn test_context(llm: MockLLMClient, embedder: MockEmbeddingClient) -> TestContext {
    let dir = TempDir::new().expect("temp dir");
    let store = Arc::new(InMemoryVectorStore::new(MOCK_DIMENSIONS));
    let log = UploadLog::open(dir.path()).await.expect("upload log");
    let rag = RagConfig {
        chunk_size: 500,
        top_k: 5,
        data_dir: dir.path().to_path_buf(),
        spool_dir: Some(dir.path().join("spool")),
    };

    let state = AppState::new(
        Arc::new(embedder.clone()),
        store.clone(),
        Arc::new(llm.clone()),
        log,
        &rag,
    );

    TestContext {
        state,
        store,
        embedder,
        llm,
        dir,
    }
}

impl TestContext {
    pub fn spool_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("spool")
    }

    /// Entries left in the spool directory (none if it was never created).
    pub fn spooled_files(&self) -> usize {
        std::fs::read_dir(self.spool_dir())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

/// 1200 characters: 500 `a`, 500 `b`, 200 `c`.
pub fn three_chunk_text() -> String {
    format!("{}{}{}", "a".repeat(500), "b".repeat(500), "c".repeat(200))
}
