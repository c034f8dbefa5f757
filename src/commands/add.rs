//! `sleuth add` - add a single bug record from the command line

use anyhow::Result;
use colored::Colorize;
use uuid::Uuid;

use sleuth::config::Config;
use sleuth::record::{BugRecord, Source};

#[allow(clippy::too_many_arguments)]
pub fn run(
    error: String,
    solution: String,
    context: String,
    language: Option<String>,
    framework: Option<String>,
    confidence: u8,
    tags: Option<String>,
) -> Result<()> {
    let config = Config::load()?;
    let mut store = super::open_store(&config)?;
    let mut embedder = super::open_embedder(&config)?;

    let record = BugRecord {
        id: Uuid::new_v4(),
        error_pattern: error,
        context,
        language,
        framework,
        problem_description: String::new(),
        solution,
        source: Source::Personal,
        confidence_score: confidence,
        tags: tags
            .map(|t| t.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default(),
        date_fixed: Some(chrono::Utc::now().date_naive()),
        url: None,
    };

    record.validate()?;

    let embedding = embedder.embed(&record.searchable_text())?;
    store.insert(&record, &embedding)?;
    store.persist_index()?;

    println!("{} added {}", "✓".green(), record.id);
    Ok(())
}
