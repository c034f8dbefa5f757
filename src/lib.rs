pub mod config;
pub mod embeddings;
pub mod error;
pub mod generate;
pub mod index;
pub mod ingest;
pub mod record;
pub mod retrieval;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use record::{extract_error_pattern, BugRecord, Source};
pub use retrieval::{Retriever, ScoredBug};
pub use store::BugStore;
