//! `sleuth search` - retrieval only, no generation

use anyhow::Result;
use colored::Colorize;

use sleuth::config::Config;
use sleuth::record::extract_error_pattern;
use sleuth::retrieval::Retriever;

pub fn run(query: &str, language: Option<&str>, top_k: Option<usize>, json: bool) -> Result<()> {
    let config = Config::load()?;
    let store = super::open_store(&config)?;
    let mut embedder = super::open_embedder(&config)?;

    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let pattern = extract_error_pattern(query);

    let mut retriever = Retriever::new(&mut *embedder, &store, config.retrieval.clone());
    let results = retriever.search(&pattern, language, top_k)?;

    if json {
        let out: Vec<serde_json::Value> = results
            .iter()
            .map(|s| {
                serde_json::json!({
                    "id": s.record.id,
                    "error_pattern": s.record.error_pattern,
                    "solution": s.record.solution,
                    "language": s.record.language,
                    "source": s.record.source.to_string(),
                    "confidence_score": s.record.confidence_score,
                    "similarity": s.similarity,
                    "score": s.score,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("{}", "No similar bugs found.".yellow());
        return Ok(());
    }

    for (i, scored) in results.iter().enumerate() {
        println!(
            "{} {} {}",
            format!("{}.", i + 1).bold(),
            scored.record.error_pattern,
            format!(
                "(similarity {:.2}, confidence {})",
                scored.similarity, scored.record.confidence_score
            )
            .dimmed()
        );
        println!("   {}", scored.record.solution);
        if let Some(language) = &scored.record.language {
            println!("   {}", format!("[{} / {}]", language, scored.record.source).dimmed());
        }
    }

    Ok(())
}
