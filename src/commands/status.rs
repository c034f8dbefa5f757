//! `sleuth status` - database and index counts

use anyhow::Result;
use colored::Colorize;

use sleuth::config::Config;

pub fn run(json: bool) -> Result<()> {
    let config = Config::load()?;
    let store = super::open_store(&config)?;

    let records = store.count()?;
    let vectors = store.index_len();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "records": records,
                "vectors": vectors,
                "embedding_model": config.embeddings.model,
                "generation_model": config.generation.model,
            }))?
        );
        return Ok(());
    }

    println!("{}", "sleuth status".bold());
    println!("  records:          {records}");
    println!("  indexed vectors:  {vectors}");
    println!("  embedding model:  {}", config.embeddings.model);
    println!("  generation model: {}", config.generation.model);

    if records != vectors {
        println!(
            "  {}",
            format!("stores out of sync ({records} records vs {vectors} vectors) - run `sleuth rebuild`")
                .yellow()
        );
    }

    Ok(())
}
