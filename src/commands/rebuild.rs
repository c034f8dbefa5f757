//! `sleuth rebuild` - re-populate the vector index from stored embeddings
//!
//! Full re-index: a fresh index file is built from the embedding blobs in
//! SQLite, then persisted over the old one. Records are not re-embedded.

use anyhow::Result;
use colored::Colorize;

use sleuth::config::Config;
use sleuth::embeddings;
use sleuth::index::HnswIndex;
use sleuth::store::BugStore;

pub fn run() -> Result<()> {
    let config = Config::load()?;
    let model_def = embeddings::models::lookup(&config.embeddings.model)?;

    let index_path = config.index_path();
    if index_path.exists() {
        std::fs::remove_file(&index_path)?;
    }

    let index = HnswIndex::open(&index_path, model_def.dimensions)?;
    let mut store = BugStore::open(config.db_path(), Box::new(index))?;

    println!("Rebuilding index from stored embeddings...");
    let count = store.rebuild_index()?;
    store.persist_index()?;

    println!("{} reindexed {} records", "✓".green(), count);
    Ok(())
}
