//! Exact brute-force index: linear scan with true cosine distance
//!
//! The reference implementation for correctness tests and small datasets.
//! Deterministic: ties in distance resolve by insertion order.

use std::collections::HashMap;

use anyhow::{bail, Result};

use super::{IndexMatch, IndexMetadata, MetadataFilter, VectorIndex};
use crate::embeddings::cosine_distance;

struct Entry {
    id: u64,
    vector: Vec<f32>,
    metadata: IndexMetadata,
}

/// In-memory linear-scan index
pub struct BruteForceIndex {
    entries: Vec<Entry>,
    positions: HashMap<u64, usize>,
    dimension: usize,
}

impl BruteForceIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
            dimension,
        }
    }
}

impl VectorIndex for BruteForceIndex {
    fn upsert(&mut self, id: u64, vector: &[f32], metadata: IndexMetadata) -> Result<()> {
        if vector.len() != self.dimension {
            bail!(
                "Vector dimension mismatch: expected {}, got {}",
                self.dimension,
                vector.len()
            );
        }

        match self.positions.get(&id) {
            // Replace in place so the entry keeps its original insertion
            // position for tie-breaking
            Some(&pos) => {
                self.entries[pos].vector = vector.to_vec();
                self.entries[pos].metadata = metadata;
            }
            None => {
                self.positions.insert(id, self.entries.len());
                self.entries.push(Entry {
                    id,
                    vector: vector.to_vec(),
                    metadata,
                });
            }
        }

        Ok(())
    }

    fn delete(&mut self, id: u64) -> Result<()> {
        if let Some(pos) = self.positions.remove(&id) {
            self.entries.remove(pos);
            for entry in &self.entries[pos..] {
                if let Some(p) = self.positions.get_mut(&entry.id) {
                    *p -= 1;
                }
            }
        }
        Ok(())
    }

    fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<IndexMatch>> {
        if top_k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        // Filter before ranking: non-matching entries never compete for slots
        let mut matches: Vec<IndexMatch> = self
            .entries
            .iter()
            .filter(|e| filter.map(|f| f.matches(&e.metadata)).unwrap_or(true))
            .map(|e| IndexMatch::new(e.id, cosine_distance(vector, &e.vector)))
            .collect();

        // Stable sort keeps insertion order for equal distances
        matches.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);

        Ok(matches)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn contains(&self, id: u64) -> bool {
        self.positions.contains_key(&id)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
