//! Shared handler state (the wired-up collaborators).

use std::sync::Arc;

use crate::backend::LanguageModel;
use crate::breaker::CircuitBreaker;
use crate::embedding::TextEmbedder;
use crate::metrics::MetricsRegistry;
use crate::pipeline::QueryPipeline;
use crate::store::{SemanticStore, VectorIndex};

/// Everything the handlers need, constructed once at startup.
pub struct AppState<V: VectorIndex, L: LanguageModel> {
    /// The request pipeline.
    pub pipeline: Arc<QueryPipeline<V, L>>,
    /// Metrics registry behind `/stats`.
    pub metrics: Arc<MetricsRegistry>,
    /// The cache tier (readiness reporting).
    pub store: Arc<SemanticStore<V>>,
    /// The embedder (readiness reporting).
    pub embedder: Arc<TextEmbedder>,
    /// The backend breaker (readiness reporting).
    pub backend_breaker: Arc<CircuitBreaker>,
}

impl<V: VectorIndex, L: LanguageModel> Clone for AppState<V, L> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            metrics: Arc::clone(&self.metrics),
            store: Arc::clone(&self.store),
            embedder: Arc::clone(&self.embedder),
            backend_breaker: Arc::clone(&self.backend_breaker),
        }
    }
}
