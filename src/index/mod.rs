//! Similarity index - (id, vector, metadata) triples with nearest-neighbor queries
//!
//! Two implementations behind one trait: an exact in-memory linear scan for
//! correctness tests and small datasets, and a usearch HNSW index for scale.
//! Metadata filters restrict the candidate set BEFORE top-k selection, so a
//! filtered query may legitimately return fewer than top_k results.

mod brute;
mod hnsw;

pub use brute::BruteForceIndex;
pub use hnsw::HnswIndex;

use anyhow::Result;

/// Non-vector fields usable as filter predicates
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IndexMetadata {
    pub language: Option<String>,
    pub framework: Option<String>,
}

/// Predicate over [`IndexMetadata`], matched case-insensitively
#[derive(Debug, Clone)]
pub enum MetadataFilter {
    Language(String),
    Framework(String),
}

impl MetadataFilter {
    pub fn matches(&self, metadata: &IndexMetadata) -> bool {
        let (want, have) = match self {
            MetadataFilter::Language(v) => (v, &metadata.language),
            MetadataFilter::Framework(v) => (v, &metadata.framework),
        };
        match have {
            Some(have) => have.eq_ignore_ascii_case(want),
            None => false,
        }
    }
}

/// Result of a vector search
#[derive(Debug, Clone)]
pub struct IndexMatch {
    pub id: u64,
    pub distance: f32,
    pub similarity: f32,
}

impl IndexMatch {
    pub fn new(id: u64, distance: f32) -> Self {
        Self {
            id,
            distance,
            similarity: 1.0 - distance, // Cosine distance to similarity
        }
    }
}

/// Nearest-neighbor index over embedding vectors
pub trait VectorIndex: Send {
    /// Insert or replace the vector for `id`. Idempotent under repeated
    /// identical calls.
    fn upsert(&mut self, id: u64, vector: &[f32], metadata: IndexMetadata) -> Result<()>;

    /// Remove `id`. A no-op, not an error, when absent.
    fn delete(&mut self, id: u64) -> Result<()>;

    /// Top-k nearest neighbors by ascending cosine distance.
    ///
    /// Ties break by insertion order. When `filter` is set, only matching
    /// entries participate in the ranking. An empty index returns an empty
    /// Vec, never an error.
    fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<IndexMatch>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, id: u64) -> bool;

    /// Embedding dimension this index was built for
    fn dimension(&self) -> usize;

    /// Persist to disk where the implementation is file-backed. In-memory
    /// implementations no-op.
    fn persist(&self) -> Result<()> {
        Ok(())
    }
}
