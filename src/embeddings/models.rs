//! Builtin embedding model table
//!
//! Known models with their dimensions and download locations. Adding a model
//! means adding a row here - the rest of the pipeline only sees the
//! `EmbeddingEngine` contract.

use anyhow::{bail, Result};

/// Static definition of a supported embedding model
#[derive(Debug, Clone, Copy)]
pub struct ModelDefinition {
    pub name: &'static str,
    pub dimensions: usize,
    /// HuggingFace repo carrying the ONNX export, for download instructions
    pub hf_repo: &'static str,
}

const MODELS: [ModelDefinition; 2] = [
    ModelDefinition {
        name: "all-minilm-l6-v2",
        dimensions: 384,
        hf_repo: "Xenova/all-MiniLM-L6-v2",
    },
    ModelDefinition {
        name: "bge-small-en-v1-5",
        dimensions: 384,
        hf_repo: "Xenova/bge-small-en-v1.5",
    },
];

/// Look up a model definition by name
pub fn lookup(name: &str) -> Result<&'static ModelDefinition> {
    match MODELS.iter().find(|m| m.name == name) {
        Some(def) => Ok(def),
        None => bail!(
            "Unknown embedding model '{}'. Available: {}",
            name,
            MODELS
                .iter()
                .map(|m| m.name)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// List available model names
pub fn available() -> Vec<&'static str> {
    MODELS.iter().map(|m| m.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_default_model() {
        let def = lookup("all-minilm-l6-v2").unwrap();
        assert_eq!(def.dimensions, 384);
    }

    #[test]
    fn test_lookup_unknown_model_lists_alternatives() {
        let err = lookup("word2vec").unwrap_err();
        assert!(err.to_string().contains("all-minilm-l6-v2"));
    }

    #[test]
    fn test_available_is_nonempty() {
        assert!(!available().is_empty());
    }
}
