//! Query embedding adapter.
//!
//! [`TextEmbedder`] turns query text into fixed-dimension unit vectors.
//! The real backend is a MiniLM-class BERT checkpoint run through candle;
//! [`EmbedderConfig::stub`] swaps in deterministic hash-derived vectors so
//! tests and model-less deployments run without weights.
//!
//! The call is synchronous and CPU-bound. It is safe to invoke from many
//! request handlers concurrently; the orchestrator dispatches it on the
//! blocking pool.

pub mod bert;
/// Device selection (CPU / Metal / CUDA).
pub mod device;
mod error;


pub use error::EmbeddingError;

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use bert::BertEncoder;
use device::select_device;

/// Embedding dimension of the reference checkpoint (all-MiniLM-L6-v2).
pub const EMBEDDING_DIM: usize = 384;

/// Maximum token sequence length fed to the encoder.
pub const MAX_SEQ_LEN: usize = 256;

/// Embedder configuration.
#[derive(Debug, Clone)]
pub struct EmbedderConfig {
    /// Directory holding `config.json`, `tokenizer.json` and
    /// `model.safetensors`.
    pub model_dir: Option<PathBuf>,
    /// Expected embedding dimension.
    pub embedding_dim: usize,
    /// Maximum token sequence length.
    pub max_seq_len: usize,
    /// Run without weights, producing hash-derived vectors.
    pub testing_stub: bool,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            model_dir: None,
            embedding_dim: EMBEDDING_DIM,
            max_seq_len: MAX_SEQ_LEN,
            testing_stub: false,
        }
    }
}

impl EmbedderConfig {
    /// Configuration for a real checkpoint directory.
    pub fn new(model_dir: PathBuf) -> Self {
        Self {
            model_dir: Some(model_dir),
            ..Default::default()
        }
    }

    /// Stub configuration (no model files required).
    pub fn stub() -> Self {
        Self {
            testing_stub: true,
            ..Default::default()
        }
    }

    /// Validates internal consistency.
    pub fn validate(&self) -> Result<(), EmbeddingError> {
        if self.embedding_dim == 0 {
            return Err(EmbeddingError::InvalidConfig {
                reason: "embedding_dim must be > 0".to_string(),
            });
        }
        if !self.testing_stub && self.model_dir.is_none() {
            return Err(EmbeddingError::InvalidConfig {
                reason: "model_dir is required unless stub mode is enabled".to_string(),
            });
        }
        Ok(())
    }
}

enum EmbedderBackend {
    Model { encoder: Arc<Mutex<BertEncoder>> },
    Stub,
}

/// Embedding generator for semantic search (supports stub mode).
pub struct TextEmbedder {
    backend: EmbedderBackend,
    config: EmbedderConfig,
}

impl std::fmt::Debug for TextEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextEmbedder")
            .field(
                "backend",
                &match &self.backend {
                    EmbedderBackend::Model { .. } => "Model",
                    EmbedderBackend::Stub => "Stub",
                },
            )
            .field("embedding_dim", &self.config.embedding_dim)
            .finish()
    }
}

impl TextEmbedder {
    /// Loads the embedder from a config (stub mode is supported).
    pub fn load(config: EmbedderConfig) -> Result<Self, EmbeddingError> {
        config.validate()?;

        if config.testing_stub {
            warn!("embedder running in STUB mode (deterministic hash vectors)");
            return Ok(Self {
                backend: EmbedderBackend::Stub,
                config,
            });
        }

        let device = select_device()?;
        let model_dir = config
            .model_dir
            .as_ref()
            .expect("validated: model_dir present when not stub");

        let encoder = BertEncoder::load(model_dir, &device, config.max_seq_len)?;
        if encoder.hidden_size() != config.embedding_dim {
            return Err(EmbeddingError::InvalidConfig {
                reason: format!(
                    "checkpoint hidden_size ({}) does not match embedding_dim ({})",
                    encoder.hidden_size(),
                    config.embedding_dim
                ),
            });
        }

        info!(
            model_dir = %model_dir.display(),
            embedding_dim = config.embedding_dim,
            "embedding model loaded"
        );

        Ok(Self {
            backend: EmbedderBackend::Model {
                encoder: Arc::new(Mutex::new(encoder)),
            },
            config,
        })
    }

    /// Generates a unit-norm embedding for a single string.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        match &self.backend {
            EmbedderBackend::Model { encoder } => encoder.lock().encode(text),
            EmbedderBackend::Stub => Ok(stub_embedding(text, self.config.embedding_dim)),
        }
    }

    /// The output vector dimension.
    pub fn embedding_dim(&self) -> usize {
        self.config.embedding_dim
    }

    /// Whether the embedder is running in stub mode.
    pub fn is_stub(&self) -> bool {
        matches!(self.backend, EmbedderBackend::Stub)
    }
}

/// Deterministic unit vector derived from the BLAKE3 XOF of the text.
fn stub_embedding(text: &str, dim: usize) -> Vec<f32> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(text.as_bytes());
    let mut reader = hasher.finalize_xof();

    let mut bytes = vec![0u8; dim * 4];
    reader.fill(&mut bytes);

    let vector: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|chunk| {
            let bits = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            (bits as f64 / u32::MAX as f64 * 2.0 - 1.0) as f32
        })
        .collect();

    l2_normalize(vector)
}

/// Scales a vector to unit L2 norm (zero vectors are returned unchanged).
pub(crate) fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}
