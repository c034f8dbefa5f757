//! `sleuth ingest` - bulk-load bug records from a file

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use sleuth::config::Config;
use sleuth::ingest::{load_records, Ingestor};

pub fn run(file: &Path) -> Result<()> {
    let config = Config::load()?;
    let mut store = super::open_store(&config)?;
    let mut embedder = super::open_embedder(&config)?;

    println!("Loading records from {}...", file.display());
    let records = load_records(file)?;
    println!("Indexing {} bug entries...", records.len());

    let report = Ingestor::new(&mut store, &mut *embedder).ingest(records)?;

    println!(
        "{} {} indexed, {} rejected",
        "✓".green(),
        report.indexed,
        report.rejected.len()
    );
    for (position, reason) in &report.rejected {
        eprintln!("{} record {}: {}", "⚠️  skipped".yellow(), position, reason);
    }

    Ok(())
}
