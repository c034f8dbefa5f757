//! Ingestion path - load bug records from files into the store
//!
//! Single-writer batch process: parse, validate, embed once, insert through
//! the lockstep store. One bad record is rejected and reported, never
//! aborting the rest of the batch.

use std::path::Path;

use anyhow::{Context, Result};

use crate::embeddings::EmbeddingEngine;
use crate::record::BugRecord;
use crate::store::BugStore;

/// Outcome of an ingestion run
#[derive(Debug, Default)]
pub struct IngestReport {
    pub indexed: usize,
    /// (input position, reason) for each rejected record
    pub rejected: Vec<(usize, String)>,
}

/// Load records from a JSON array file or a JSONL file.
///
/// Detection is by content: a leading `[` means a JSON array, anything else
/// is treated as one JSON object per line. Blank lines are skipped.
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<Vec<BugRecord>> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;

    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).context("Failed to parse JSON array of bug records")
    } else {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("Failed to parse record on line {}", i + 1))
            })
            .collect()
    }
}

/// Batch ingestion into a [`BugStore`]
pub struct Ingestor<'a> {
    store: &'a mut BugStore,
    embedder: &'a mut dyn EmbeddingEngine,
}

impl<'a> Ingestor<'a> {
    pub fn new(store: &'a mut BugStore, embedder: &'a mut dyn EmbeddingEngine) -> Self {
        Self { store, embedder }
    }

    /// Ingest a batch of records.
    ///
    /// Each record is embedded exactly once from its searchable text and
    /// stored under a shared id in both stores. Invalid records are rejected
    /// individually; embedding-backend failures abort the run (nothing useful
    /// can be indexed without vectors).
    pub fn ingest(&mut self, records: Vec<BugRecord>) -> Result<IngestReport> {
        let mut report = IngestReport::default();

        for (position, record) in records.into_iter().enumerate() {
            if let Err(e) = record.validate() {
                report.rejected.push((position, e.to_string()));
                continue;
            }

            let embedding = self
                .embedder
                .embed(&record.searchable_text())
                .with_context(|| format!("Failed to embed record at position {position}"))?;

            match self.store.insert(&record, &embedding) {
                Ok(_) => report.indexed += 1,
                Err(e) => report.rejected.push((position, e.to_string())),
            }
        }

        self.store.persist_index()?;
        Ok(report)
    }
}
