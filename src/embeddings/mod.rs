//! Embeddings module - map free text to fixed-length semantic vectors
//!
//! Trait-based abstraction with an ONNX backend. Embeddings are deterministic
//! for a fixed model version: the same text always yields the same vector.

pub mod models;
mod onnx;
mod similarity;

pub use models::ModelDefinition;
pub use onnx::OnnxEmbedder;
pub use similarity::{cosine_distance, cosine_similarity};

use anyhow::Result;

use crate::config::Config;

/// Trait for embedding generation engines
///
/// Requires Send so an engine can move into worker threads.
pub trait EmbeddingEngine: Send {
    /// Generate an embedding for a single text.
    ///
    /// Empty input embeds the empty token sequence; over-long input is
    /// truncated to the model's token limit. Neither is an error.
    fn embed(&mut self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    ///
    /// Preserves input order and is element-wise identical to calling
    /// [`embed`](Self::embed) per text - batching is a throughput knob,
    /// never a semantic change.
    fn embed_batch(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Embedding dimension (e.g. 384 for all-MiniLM-L6-v2)
    fn dimension(&self) -> usize;

    /// Model name
    fn model_name(&self) -> &str;
}

/// Create the configured embedder.
///
/// Resolves the model from the builtin table and loads its ONNX weights from
/// the model directory under .sleuth/models/.
pub fn create_embedder(config: &Config) -> Result<Box<dyn EmbeddingEngine>> {
    let model_def = models::lookup(&config.embeddings.model)?;
    let model_dir = config.model_dir();

    let embedder = OnnxEmbedder::new_from_dir(&model_dir, model_def)?;
    Ok(Box::new(embedder))
}
