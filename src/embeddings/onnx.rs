//! ONNX Runtime embedder for sentence-transformer models

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use ndarray::Array2;
use ort::{inputs, session::Session, value::Value};
use tokenizers::Tokenizer;

use super::models::ModelDefinition;
use super::EmbeddingEngine;
use crate::error::EmbedError;

/// ONNX-based embedding generator
///
/// Loads a sentence-transformer ONNX export plus its tokenizer and produces
/// mean-pooled, L2-normalized embeddings.
#[derive(Debug)]
pub struct OnnxEmbedder {
    session: Session,
    tokenizer: Tokenizer,
    dimension: usize,
    model_name: String,
}

impl OnnxEmbedder {
    /// Create an embedder from a model directory.
    ///
    /// Expects `model.onnx` (or `model_quantized.onnx`, preferred when present)
    /// and `tokenizer.json` inside `model_dir`. Missing files surface as
    /// [`EmbedError::Unavailable`] with download instructions.
    pub fn new_from_dir(model_dir: &Path, def: &ModelDefinition) -> Result<Self> {
        let quantized = model_dir.join("model_quantized.onnx");
        let model_path = if quantized.exists() {
            quantized
        } else {
            model_dir.join("model.onnx")
        };
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            return Err(EmbedError::Unavailable(format!(
                "ONNX model not found at: {}\n\n\
                Download it with:\n  \
                mkdir -p {} && \\\n  \
                curl -L -o {} \\\n  \
                  https://huggingface.co/{}/resolve/main/onnx/model_quantized.onnx",
                model_path.display(),
                model_dir.display(),
                model_dir.join("model_quantized.onnx").display(),
                def.hf_repo
            ))
            .into());
        }

        if !tokenizer_path.exists() {
            return Err(EmbedError::Unavailable(format!(
                "Tokenizer not found at: {}\n\n\
                Download it with:\n  \
                curl -L -o {} \\\n  \
                  https://huggingface.co/{}/resolve/main/tokenizer.json",
                tokenizer_path.display(),
                tokenizer_path.display(),
                def.hf_repo
            ))
            .into());
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .map_err(|e| EmbedError::Unavailable(format!("Failed to load ONNX model: {e}")))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;

        // Truncate to 512 tokens, the input limit for minilm/bge exports.
        // Over-long stack traces get cut rather than failing inference.
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: 512,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;

        Ok(Self {
            session,
            tokenizer,
            dimension: def.dimensions,
            model_name: def.name.to_string(),
        })
    }

    /// Tokenize text into input_ids and attention_mask
    fn tokenize(&self, text: &str) -> Result<(Vec<i64>, Vec<i64>)> {
        let encoding = self
            .tokenizer
            .encode(text, true) // Add special tokens ([CLS], [SEP])
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;

        let input_ids = encoding.get_ids().iter().map(|&x| x as i64).collect();
        let attention_mask = encoding
            .get_attention_mask()
            .iter()
            .map(|&x| x as i64)
            .collect();

        Ok((input_ids, attention_mask))
    }

    /// Mean pooling - average token embeddings weighted by attention mask
    fn mean_pooling(&self, token_embeddings: &Array2<f32>, attention_mask: &[i64]) -> Vec<f32> {
        let mask_sum: f32 = attention_mask.iter().map(|&x| x as f32).sum();

        if mask_sum == 0.0 {
            return vec![0.0; self.dimension];
        }

        let mut pooled = vec![0.0; self.dimension];
        for (i, &mask) in attention_mask.iter().enumerate() {
            if mask == 1 && i < token_embeddings.nrows() {
                for j in 0..self.dimension {
                    pooled[j] += token_embeddings[[i, j]];
                }
            }
        }

        pooled.iter().map(|&x| x / mask_sum).collect()
    }

    /// L2 normalize a vector
    fn normalize(&self, vec: &[f32]) -> Vec<f32> {
        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm == 0.0 {
            return vec.to_vec();
        }

        vec.iter().map(|x| x / norm).collect()
    }
}

impl EmbeddingEngine for OnnxEmbedder {
    fn embed(&mut self, text: &str) -> Result<Vec<f32>> {
        let (input_ids, attention_mask) = self.tokenize(text)?;

        let seq_len = input_ids.len();
        let input_ids_array = Array2::from_shape_vec((1, seq_len), input_ids)
            .context("Failed to create input_ids array")?;

        let attention_mask_array =
            Array2::from_shape_vec((1, attention_mask.len()), attention_mask.clone())
                .context("Failed to create attention_mask array")?;

        // Token type IDs - all zeros for single-sentence embeddings
        let token_type_ids_array = Array2::from_shape_vec((1, seq_len), vec![0i64; seq_len])
            .context("Failed to create token_type_ids array")?;

        // Run inference and extract data (outputs must drop before we can
        // call &self methods again)
        let token_embeddings_2d = {
            let outputs = self
                .session
                .run(inputs![
                    "input_ids" => Value::from_array(input_ids_array)?,
                    "attention_mask" => Value::from_array(attention_mask_array)?,
                    "token_type_ids" => Value::from_array(token_type_ids_array)?
                ])
                .map_err(|e| EmbedError::Failed(format!("ONNX inference failed: {e}")))?;

            let (shape, data) = outputs["last_hidden_state"]
                .try_extract_tensor::<f32>()
                .context("Failed to extract last_hidden_state tensor")?;

            // Shape is [batch_size=1, seq_len, hidden_dim]
            let shape_dims = shape.as_ref();
            if shape_dims.len() != 3 {
                bail!("Expected 3D tensor, got shape: {:?}", shape_dims);
            }

            let seq_len = shape_dims[1] as usize;
            let hidden_dim = shape_dims[2] as usize;

            let batch_offset = seq_len * hidden_dim;
            Array2::from_shape_vec((seq_len, hidden_dim), data[0..batch_offset].to_vec())
                .context("Failed to reshape token embeddings")?
        };

        let embedding = self.mean_pooling(&token_embeddings_2d, &attention_mask);

        Ok(self.normalize(&embedding))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::cosine_similarity;
    use approx::assert_relative_eq;
    use std::path::PathBuf;

    // These tests need real model files and are skipped when they are absent,
    // so CI without the download still passes the rest of the suite.
    fn try_test_embedder() -> Option<OnnxEmbedder> {
        let model_dir = PathBuf::from(".sleuth/models/all-minilm-l6-v2");
        let def = crate::embeddings::models::lookup("all-minilm-l6-v2").unwrap();

        if !model_dir.join("tokenizer.json").exists() {
            return None;
        }

        Some(OnnxEmbedder::new_from_dir(&model_dir, def).expect("Test model should load"))
    }

    #[test]
    fn test_missing_model_reports_unavailable() {
        let def = crate::embeddings::models::lookup("all-minilm-l6-v2").unwrap();
        let err = OnnxEmbedder::new_from_dir(Path::new("/nonexistent"), def).unwrap_err();
        assert!(err.to_string().contains("embedding backend unavailable"));
    }

    #[test]
    fn test_embed_is_normalized_and_deterministic() {
        let Some(mut embedder) = try_test_embedder() else {
            return;
        };

        let a = embedder.embed("This is a test").unwrap();
        let b = embedder.embed("This is a test").unwrap();

        assert_eq!(a.len(), 384);
        assert_eq!(a, b, "Same text must yield bit-identical vectors");

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert_relative_eq!(norm, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_semantic_similarity_ordering() {
        let Some(mut embedder) = try_test_embedder() else {
            return;
        };

        let e1 = embedder
            .embed("TypeError: 'NoneType' object is not subscriptable")
            .unwrap();
        let e2 = embedder.embed("object is not subscriptable").unwrap();
        let e3 = embedder.embed("The weather is nice today").unwrap();

        assert!(cosine_similarity(&e1, &e2) > cosine_similarity(&e1, &e3));
    }
}
