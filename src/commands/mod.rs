//! CLI command implementations
//!
//! Each command opens its own session: config, embedder, store. Shared
//! open/teardown lives in this module.

pub mod add;
pub mod ask;
pub mod delete;
pub mod ingest;
pub mod rebuild;
pub mod search;
pub mod status;

use anyhow::Result;

use sleuth::config::Config;
use sleuth::embeddings::{self, EmbeddingEngine};
use sleuth::index::HnswIndex;
use sleuth::store::BugStore;

/// Open the store with the persistent HNSW index for the configured model
fn open_store(config: &Config) -> Result<BugStore> {
    let model_def = embeddings::models::lookup(&config.embeddings.model)?;
    let index = HnswIndex::open(config.index_path(), model_def.dimensions)?;
    BugStore::open(config.db_path(), Box::new(index))
}

/// Create the configured embedder
fn open_embedder(config: &Config) -> Result<Box<dyn EmbeddingEngine>> {
    embeddings::create_embedder(config)
}
