//! BERT sentence encoder (MiniLM-class checkpoints).
//!
//! Loads a safetensors checkpoint plus `config.json`/`tokenizer.json` from
//! one directory and produces mean-pooled, L2-normalized sentence vectors.

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::{Tokenizer, TruncationParams};

use super::error::EmbeddingError;

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const WEIGHTS_FILE: &str = "model.safetensors";

/// A loaded BERT encoder bound to one compute device.
pub struct BertEncoder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    hidden_size: usize,
}

impl BertEncoder {
    /// Loads the encoder from a model directory.
    pub fn load(dir: &Path, device: &Device, max_seq_len: usize) -> Result<Self, EmbeddingError> {
        let config_path = dir.join(CONFIG_FILE);
        if !config_path.is_file() {
            return Err(EmbeddingError::ModelNotFound { path: config_path });
        }

        let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)
            .map_err(|e| EmbeddingError::ModelLoadFailed {
                reason: format!("invalid {CONFIG_FILE}: {e}"),
            })?;

        let mut tokenizer = Tokenizer::from_file(dir.join(TOKENIZER_FILE)).map_err(|e| {
            EmbeddingError::TokenizationFailed {
                reason: format!("failed to load tokenizer: {e}"),
            }
        })?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_seq_len,
                ..Default::default()
            }))
            .map_err(|e| EmbeddingError::TokenizationFailed {
                reason: format!("failed to configure truncation: {e}"),
            })?;

        let weights_path = dir.join(WEIGHTS_FILE);
        if !weights_path.is_file() {
            return Err(EmbeddingError::ModelNotFound { path: weights_path });
        }

        // SAFETY: the checkpoint file is mapped read-only and outlives the
        // VarBuilder borrowing it.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, device)? };
        let hidden_size = config.hidden_size;
        let model = BertModel::load(vb, &config).map_err(|e| EmbeddingError::ModelLoadFailed {
            reason: format!("failed to load BERT weights: {e}"),
        })?;

        Ok(Self {
            model,
            tokenizer,
            device: device.clone(),
            hidden_size,
        })
    }

    /// Hidden size of the loaded checkpoint (the embedding dimension).
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Encodes one string into a unit-norm sentence vector.
    pub fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let encoding =
            self.tokenizer
                .encode(text, true)
                .map_err(|e| EmbeddingError::TokenizationFailed {
                    reason: e.to_string(),
                })?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // Mean-pool over the token axis. Single-sequence input carries no
        // padding, so a plain mean equals mask-weighted pooling.
        let (_batch, tokens, _hidden) = hidden.dims3()?;
        let pooled = (hidden.sum(1)? / (tokens as f64))?.squeeze(0)?;
        let vector: Vec<f32> = pooled.to_dtype(DType::F32)?.to_vec1()?;

        Ok(super::l2_normalize(vector))
    }
}

impl std::fmt::Debug for BertEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BertEncoder")
            .field("device", &self.device)
            .field("hidden_size", &self.hidden_size)
            .finish_non_exhaustive()
    }
}
