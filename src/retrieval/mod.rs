//! Retriever - raw error text to a ranked, filtered list of similar bugs
//!
//! Embeds the query, asks the index for nearest neighbors (optionally
//! restricted to a language), hydrates records, and blends similarity with
//! the caller-assigned confidence score into a combined ranking.

use anyhow::Result;

use crate::config::RetrievalSection;
use crate::embeddings::EmbeddingEngine;
use crate::index::MetadataFilter;
use crate::record::BugRecord;
use crate::store::BugStore;

/// A retrieved record with its ranking signals
#[derive(Debug, Clone)]
pub struct ScoredBug {
    pub record: BugRecord,
    /// Raw cosine similarity to the query (primary signal)
    pub similarity: f32,
    /// Combined score: similarity + confidence_weight * confidence/100.
    /// Similarity dominates; confidence only breaks near-ties.
    pub score: f32,
}

/// Retrieval engine over a [`BugStore`]
pub struct Retriever<'a> {
    embedder: &'a mut dyn EmbeddingEngine,
    store: &'a BugStore,
    config: RetrievalSection,
}

impl<'a> Retriever<'a> {
    pub fn new(
        embedder: &'a mut dyn EmbeddingEngine,
        store: &'a BugStore,
        config: RetrievalSection,
    ) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    /// Find the bugs most similar to `query_text`.
    ///
    /// Returns at most `top_k` results sorted by descending combined score.
    /// Empty query text returns an empty list without touching the embedding
    /// backend. Hydration failures (index/store divergence) are skipped inside
    /// the store, never propagated.
    pub fn search(
        &mut self,
        query_text: &str,
        language_filter: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<ScoredBug>> {
        if query_text.trim().is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query_text)?;

        let filter = language_filter.map(|l| MetadataFilter::Language(l.to_string()));
        let hits = self.store.search(&query_embedding, top_k, filter.as_ref())?;

        let mut scored: Vec<ScoredBug> = hits
            .into_iter()
            .map(|hit| {
                let confidence = hit.record.confidence_score as f32 / 100.0;
                let score = hit.similarity + self.config.confidence_weight * confidence;
                ScoredBug {
                    record: hit.record,
                    similarity: hit.similarity,
                    score,
                }
            })
            .collect();

        // Confidence is a secondary signal, never a hard filter - unless the
        // caller explicitly configured a floor
        if let Some(min_confidence) = self.config.min_confidence {
            scored.retain(|s| s.record.confidence_score >= min_confidence);
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(scored)
    }
}
