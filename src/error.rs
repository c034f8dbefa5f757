//! Typed error kinds for the failure modes the CLI must tell apart.
//!
//! Most of the crate propagates `anyhow::Result`; these enums exist where the
//! distinction changes user-visible behavior: a missing model file is retried
//! later, an invalid record is skipped, an exhausted generation retry becomes a
//! degraded-service message.

use thiserror::Error;

/// Embedding backend failures
#[derive(Debug, Error)]
pub enum EmbedError {
    /// Backend could not be reached or loaded - fatal for this call, retry later
    #[error("embedding backend unavailable: {0}")]
    Unavailable(String),

    /// Backend reachable but inference failed
    #[error("embedding failed: {0}")]
    Failed(String),
}

/// Record store / vector index failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record missing a required field at ingestion - reject it, continue the batch
    #[error("invalid record: missing or empty `{field}`")]
    InvalidRecord { field: &'static str },

    /// Id present in the index but absent from the record store - logged, skipped
    #[error("index inconsistency: vector {rowid} has no matching record")]
    Inconsistency { rowid: i64 },

    #[error(transparent)]
    Db(#[from] rusqlite::Error),

    #[error("vector index error: {0}")]
    Index(String),
}

/// Solution generation failures
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Timed out on every attempt within the retry budget
    #[error("generation timed out after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// Backend reachable but refusing or erroring (rate limit, 5xx)
    #[error("generation service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("generation failed: {0}")]
    Failed(String),

    #[error("GROQ_API_KEY is not set - export it or add it to your environment")]
    MissingApiKey,
}
