//! Vector Store Abstraction Layer
//!
//! The ingestion and query pipelines only talk to the [`VectorStore`] trait.
//! Records are keyed by string id; upserting an existing id replaces the
//! stored vector and metadata.
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │              VectorStore Trait             │
//! ├───────────────────────────────────────────┤
//! │  upsert  │  query  │  delete  │  stats    │
//! └───────────────────────────────────────────┘
//!          ▲                      ▲
//!    ┌─────┴─────┐          ┌─────┴─────┐
//!    │ Pinecone  │          │ InMemory  │
//!    │  (cloud)  │          │  (tests)  │
//!    └───────────┘          └───────────┘
//! ```

use crate::types::{AppError, IndexStats, QueryMatch, Result, VectorRecord};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

// ============================================================================
// Vector Store Trait
// ============================================================================

/// Abstract trait for vector index operations.
///
/// # Implementors
///
/// - [`PineconeStore`](super::pinecone::PineconeStore) - Pinecone data plane
/// - [`InMemoryVectorStore`] - Testing and local runs
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Name of the backing service, reported by the health check.
    fn provider_name(&self) -> &'static str;

    /// Insert or replace records by id. Returns the number of records written.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize>;

    /// Nearest neighbours of `vector`, best match first, at most `top_k`.
    ///
    /// When `include_metadata` is false the matches carry no metadata.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<QueryMatch>>;

    /// Delete records by id. Unknown ids are ignored.
    async fn delete(&self, ids: &[String]) -> Result<()>;

    /// Index dimension and total record count.
    async fn stats(&self) -> Result<IndexStats>;
}

// ============================================================================
// In-Memory Implementation
// ============================================================================

/// Simple in-memory vector store.
///
/// Data is not persisted. Uses cosine similarity for vector comparisons.
pub struct InMemoryVectorStore {
    dimension: usize,
    records: RwLock<BTreeMap<String, VectorRecord>>,
}

impl InMemoryVectorStore {
    /// Create an empty store accepting vectors of length `dimension`.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: RwLock::new(BTreeMap::new()),
        }
    }

    /// Fetch a record by id.
    pub fn get(&self, id: &str) -> Option<VectorRecord> {
        self.records.read().get(id).cloned()
    }

    /// All stored ids in lexical order.
    pub fn ids(&self) -> Vec<String> {
        self.records.read().keys().cloned().collect()
    }

    /// Calculate cosine similarity between two vectors.
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }

    fn check_dimension(&self, len: usize) -> Result<()> {
        if len != self.dimension {
            return Err(AppError::VectorStore(format!(
                "Vector dimension {} does not match index dimension {}",
                len, self.dimension
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn provider_name(&self) -> &'static str {
        "in-memory"
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        for record in records {
            self.check_dimension(record.values.len())?;
        }

        let mut stored = self.records.write();
        for record in records {
            stored.insert(record.id.clone(), record.clone());
        }
        Ok(records.len())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<QueryMatch>> {
        self.check_dimension(vector.len())?;

        let stored = self.records.read();
        let mut matches: Vec<QueryMatch> = stored
            .values()
            .map(|record| QueryMatch {
                id: record.id.clone(),
                score: Self::cosine_similarity(vector, &record.values),
                metadata: include_metadata.then(|| record.metadata.clone()),
            })
            .collect();

        // Sort by score descending; ties keep id order
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(top_k);

        Ok(matches)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let mut stored = self.records.write();
        for id in ids {
            stored.remove(id);
        }
        Ok(())
    }

    async fn stats(&self) -> Result<IndexStats> {
        Ok(IndexStats {
            dimension: self.dimension,
            total_vector_count: self.records.read().len() as u64,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
