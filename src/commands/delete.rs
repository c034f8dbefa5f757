//! `sleuth delete` - remove a record from both stores

use anyhow::{Context, Result};
use colored::Colorize;
use uuid::Uuid;

use sleuth::config::Config;

pub fn run(id: &str) -> Result<()> {
    let id = Uuid::parse_str(id).context("Record id must be a uuid")?;

    let config = Config::load()?;
    let mut store = super::open_store(&config)?;

    if store.delete(id)? {
        store.persist_index()?;
        println!("{} deleted {}", "✓".green(), id);
    } else {
        println!("{} no record with id {}", "⚠️ ".yellow(), id);
    }

    Ok(())
}
