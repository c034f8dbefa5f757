use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Retrieval-augmented bug triage", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bulk-load bug records from a JSON or JSONL file
    Ingest {
        /// Path to the records file
        file: std::path::PathBuf,
    },

    /// Add a single bug record
    Add {
        /// Error pattern or message
        #[arg(long)]
        error: String,

        /// How the bug was fixed
        #[arg(long)]
        solution: String,

        /// Situation the error occurred in
        #[arg(long, default_value = "")]
        context: String,

        /// Programming language
        #[arg(long)]
        language: Option<String>,

        /// Framework in use
        #[arg(long)]
        framework: Option<String>,

        /// Trust weight, 0-100
        #[arg(long, default_value_t = 50)]
        confidence: u8,

        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
    },

    /// Search for similar solved bugs
    Search {
        /// Error message or stack trace
        query: String,

        /// Restrict results to one language
        #[arg(short, long)]
        language: Option<String>,

        /// Maximum results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Output results as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Retrieve similar bugs and generate a solution
    Ask {
        /// Error message or stack trace
        query: String,

        /// Restrict retrieval to one language
        #[arg(short, long)]
        language: Option<String>,

        /// Additional situation context for the model
        #[arg(short, long)]
        context: Option<String>,
    },

    /// Delete a bug record by id
    Delete {
        /// Record id (uuid)
        id: String,
    },

    /// Show database and index status
    Status {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Rebuild the vector index from stored embeddings
    Rebuild,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { file } => commands::ingest::run(&file),
        Commands::Add {
            error,
            solution,
            context,
            language,
            framework,
            confidence,
            tags,
        } => commands::add::run(
            error, solution, context, language, framework, confidence, tags,
        ),
        Commands::Search {
            query,
            language,
            top_k,
            json,
        } => commands::search::run(&query, language.as_deref(), top_k, json),
        Commands::Ask {
            query,
            language,
            context,
        } => commands::ask::run(&query, language.as_deref(), context.as_deref()),
        Commands::Delete { id } => commands::delete::run(&id),
        Commands::Status { json } => commands::status::run(json),
        Commands::Rebuild => commands::rebuild::run(),
    }
}
