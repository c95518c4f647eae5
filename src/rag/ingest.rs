//! Document ingestion: extract, chunk, embed, upsert, record.
//!
//! Chunk ids are `sanitize(filename)-index`, so re-ingesting a file overwrites
//! its previous vectors in place. A failure part-way leaves the chunks written
//! so far in the index; uploading the same file again repairs it.
//!
//! Ingestions of the same filename are serialized, so the chunk log always
//! describes the vectors of the last ingestion to finish.

use crate::db::{UploadLog, VectorStore};
use crate::rag::chunker::TextChunker;
use crate::rag::embeddings::EmbeddingClient;
use crate::rag::extract::{extract_text, DocumentKind};
use crate::types::{AppError, ChunkMetadata, Result, VectorRecord};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub filename: String,
    pub chunks: usize,
}

/// Replace every character outside `[A-Za-z0-9_.-]` with `_`.
pub fn sanitize_id(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Vector id of chunk `index` of `filename`.
pub fn chunk_id(filename: &str, index: usize) -> String {
    format!("{}-{}", sanitize_id(filename), index)
}

pub struct IngestionPipeline {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    log: UploadLog,
    chunker: TextChunker,
    /// Where uploads are spooled for extraction; the system temp dir if unset.
    spool_dir: Option<PathBuf>,
    /// One lock per filename currently being ingested.
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl IngestionPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        log: UploadLog,
        chunker: TextChunker,
    ) -> Self {
        Self {
            embedder,
            store,
            log,
            chunker,
            spool_dir: None,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Spool uploads under `dir` instead of the system temp directory. The
    /// directory is created on first use.
    pub fn with_spool_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spool_dir = Some(dir.into());
        self
    }

    /// Ingest an uploaded document held in memory.
    ///
    /// The bytes are spooled to a temporary file that is removed when
    /// extraction finishes, whatever its outcome.
    pub async fn ingest_upload(&self, filename: &str, bytes: Vec<u8>) -> Result<IngestReport> {
        if filename.trim().is_empty() {
            return Err(AppError::InvalidInput("Empty filename".to_string()));
        }
        let kind = DocumentKind::from_file_type(filename)?;
        let file_type = filename.to_lowercase();
        let spool_dir = self.spool_dir.clone();

        let text = tokio::task::spawn_blocking(move || -> Result<String> {
            let mut builder = tempfile::Builder::new();
            builder.prefix("ragline-upload-").suffix(kind.extension());
            let spool = match &spool_dir {
                Some(dir) => std::fs::create_dir_all(dir).and_then(|_| builder.tempfile_in(dir)),
                None => builder.tempfile(),
            };
            let mut spool = spool
                .map_err(|e| AppError::Internal(format!("cannot create temp file: {}", e)))?;
            spool
                .write_all(&bytes)
                .and_then(|_| spool.flush())
                .map_err(|e| AppError::Internal(format!("cannot write temp file: {}", e)))?;

            extract_text(spool.path(), &file_type)
        })
        .await
        .map_err(|e| AppError::Internal(format!("extraction task failed: {}", e)))??;

        self.index_text(filename, &text).await
    }

    /// Ingest a document already on disk. The filename is the path's last
    /// component.
    pub async fn ingest_path(&self, path: &Path) -> Result<IngestReport> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                AppError::InvalidInput(format!("{} does not name a file", path.display()))
            })?;
        DocumentKind::from_file_type(&filename)?;

        let owned: PathBuf = path.to_path_buf();
        let file_type = filename.to_lowercase();
        let text = tokio::task::spawn_blocking(move || extract_text(&owned, &file_type))
            .await
            .map_err(|e| AppError::Internal(format!("extraction task failed: {}", e)))??;

        self.index_text(&filename, &text).await
    }

    async fn index_text(&self, filename: &str, text: &str) -> Result<IngestReport> {
        if text.trim().is_empty() {
            return Err(AppError::EmptyExtraction(filename.to_string()));
        }

        let lock = self
            .in_flight
            .lock()
            .entry(filename.to_string())
            .or_default()
            .clone();
        let result = {
            let _guard = lock.lock().await;
            self.index_locked(filename, text).await
        };

        // map + this handle: nobody else is waiting on the lock
        let mut in_flight = self.in_flight.lock();
        if Arc::strong_count(&lock) == 2 {
            in_flight.remove(filename);
        }
        result
    }

    async fn index_locked(&self, filename: &str, text: &str) -> Result<IngestReport> {
        let start = Instant::now();
        let expected = self.chunker.chunk_count(text);
        tracing::info!(filename, chunks = expected, "Ingesting document");

        let previous = self.log.chunk_count(filename).await?;

        let mut chunks = 0;
        for (index, chunk) in self.chunker.chunks(text).enumerate() {
            let values = self.embedder.embed(chunk).await?;
            let record = VectorRecord {
                id: chunk_id(filename, index),
                values,
                metadata: ChunkMetadata {
                    text: chunk.to_string(),
                    source: Some(filename.to_string()),
                },
            };
            self.store.upsert(std::slice::from_ref(&record)).await?;
            tracing::debug!(filename, index, id = %record.id, "Indexed chunk");
            chunks += 1;
        }

        if let Some(previous) = previous.filter(|p| *p > chunks) {
            let stale: Vec<String> = (chunks..previous).map(|i| chunk_id(filename, i)).collect();
            self.store.delete(&stale).await?;
            tracing::info!(filename, removed = stale.len(), "Removed stale chunks");
        }

        self.log.record(filename, chunks).await?;

        tracing::info!(
            filename,
            chunks,
            duration_ms = start.elapsed().as_millis() as u64,
            "Ingestion complete"
        );

        Ok(IngestReport {
            filename: filename.to_string(),
            chunks,
        })
    }
}
