//! # Recall
//!
//! Semantic response cache fronting an expensive LLM backend.
//!
//! Recall sits between a client and an LLM provider. A query is answered
//! from a previously computed response when a semantically equivalent
//! query is cached, and freshly generated otherwise:
//!
//! ```text
//! query → (classify, embed) → vector search → hit? return
//!                                           : generate → store → return
//! ```
//!
//! Freshness is tied to the query class: time-sensitive queries match
//! strictly and expire in minutes, evergreen queries match loosely and
//! live for a week. Per-dependency circuit breakers bound the failure
//! modes when the vector store or the backend degrades.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use recall::Config;
//!
//! # fn run() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! println!("Listening on {}", config.socket_addr());
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
//! | Feature | Purpose |
//! |---------|---------|
//! | `cpu` | CPU-only inference (docs.rs default) |
//! | `metal` | Apple Silicon GPU acceleration |
//! | `cuda` | NVIDIA GPU acceleration |
//! | `mock` | Mock store/backend for tests/examples |
//!
//! ## Modules
//!
//! - [`classifier`] - Freshness class + topic partition (all caching policy)
//! - [`embedding`] - Query embedding (candle BERT, stub mode)
//! - [`breaker`] - Per-dependency circuit breakers
//! - [`store`] - Vector cache store (Qdrant) + expiry sweeper
//! - [`metrics`] - Hit/miss/latency counters
//! - [`pipeline`] - The request orchestrator
//! - [`backend`] - LLM backend adapter
//! - [`gateway`] - HTTP surface (axum)

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod backend;
pub mod breaker;
pub mod classifier;
pub mod config;
pub mod embedding;
pub mod gateway;
pub mod hashing;
pub mod metrics;
pub mod pipeline;
pub mod store;

#[cfg(any(test, feature = "mock"))]
pub use backend::MockLanguageModel;
pub use backend::{BackendError, LanguageModel, LlmBackend};
pub use breaker::{BreakerConfig, BreakerStatus, CircuitBreaker, CircuitState};
pub use classifier::{
    Classification, EVERGREEN_THRESHOLD, EVERGREEN_TTL_SECS, QueryClass,
    TIME_SENSITIVE_THRESHOLD, TIME_SENSITIVE_TTL_SECS, Topic, classify,
};
pub use config::{Config, ConfigError};
pub use embedding::{EMBEDDING_DIM, EmbedderConfig, EmbeddingError, TextEmbedder};
pub use gateway::{ApiError, AppState, create_router};
pub use hashing::{hash_query, hash_to_u64, normalize_query};
pub use metrics::{CacheStats, LatencyStats, MetricsRegistry, QueryClassStats};
pub use pipeline::{PipelineError, QueryOutcome, QueryPipeline, ResponseMetadata, ResponseSource};
#[cfg(any(test, feature = "mock"))]
pub use store::MockVectorIndex;
pub use store::{
    CacheEntry, CachedMatch, DEFAULT_COLLECTION_NAME, DEFAULT_MAX_ENTRIES, QdrantIndex,
    SemanticStore, StoreConfig, StoreError, SweepReport, VectorIndex, spawn_sweeper,
};
