//! `sleuth ask` - retrieve similar bugs and generate a solution
//!
//! Retrieval failures degrade to "no similar bugs found" and generation
//! still runs; generation failures distinguish an unreachable service from
//! an empty context.

use std::time::Duration;

use anyhow::Result;
use colored::Colorize;

use sleuth::config::Config;
use sleuth::error::GenerateError;
use sleuth::generate::{GroqClient, SolutionGenerator};
use sleuth::record::extract_error_pattern;
use sleuth::retrieval::Retriever;

pub fn run(query: &str, language: Option<&str>, context: Option<&str>) -> Result<()> {
    let config = Config::load()?;

    let api_key =
        std::env::var("GROQ_API_KEY").map_err(|_| GenerateError::MissingApiKey)?;

    let store = super::open_store(&config)?;
    let mut embedder = super::open_embedder(&config)?;

    let pattern = extract_error_pattern(query);
    println!("Searching for similar bugs...");

    // Retrieval is best-effort: an empty or failed search still generates
    let retrieved = {
        let mut retriever = Retriever::new(&mut *embedder, &store, config.retrieval.clone());
        match retriever.search(&pattern, language, config.retrieval.top_k) {
            Ok(results) => results,
            Err(e) => {
                eprintln!("{} retrieval failed: {e}", "⚠️ ".yellow());
                Vec::new()
            }
        }
    };

    if retrieved.is_empty() {
        println!("{}", "No similar bugs found - answering from the query alone.".yellow());
    } else {
        println!("Found {} similar bug(s), generating solution...", retrieved.len());
    }

    let client = GroqClient::new(api_key, Duration::from_secs(config.generation.timeout_secs))?;
    let generator = SolutionGenerator::new(client, config.generation.clone());

    let solution = match generator.generate(query, language, context, &retrieved) {
        Ok(solution) => solution,
        Err(e) => match e.downcast_ref::<GenerateError>() {
            Some(GenerateError::Timeout { .. }) | Some(GenerateError::ServiceUnavailable(_)) => {
                anyhow::bail!("Generation service unavailable, try again later: {e}")
            }
            _ => return Err(e),
        },
    };

    println!("\n{}", "SOLUTION".bold());
    println!("{}", "=".repeat(50));
    println!("{}", solution.text);

    if solution.no_prior_art {
        println!("\n{}", "Note: no prior art was found for this error.".yellow());
    } else {
        println!("\n{}", "Similar cases used:".bold());
        for scored in retrieved
            .iter()
            .filter(|s| solution.used_record_ids.contains(&s.record.id))
        {
            println!(
                "- {} (confidence {})",
                scored.record.error_pattern, scored.record.confidence_score
            );
        }
    }

    Ok(())
}
