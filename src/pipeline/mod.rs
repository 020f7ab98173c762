//! Request pipeline orchestrator.
//!
//! [`QueryPipeline::process`] binds the classifier, embedder, store,
//! backend and metrics into the query flow:
//!
//! ```text
//! query → (classify, embed) → store search → hit? return
//!                                          : backend generate → store → return
//! ```
//!
//! Ordering matters: classification is cheap and determines the search
//! threshold, so it runs first; embedding precedes the search because the
//! search is keyed on the vector, and an embedding failure short-circuits
//! without consulting the store. The store write is last and best-effort;
//! its failure never fails the user response.

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::backend::{BackendError, LanguageModel};
use crate::classifier::{Topic, classify};
use crate::embedding::{EmbeddingError, TextEmbedder};
use crate::metrics::MetricsRegistry;
use crate::store::{CacheEntry, SemanticStore, VectorIndex};

/// Which terminal produced the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    /// Served from a semantically equivalent cached entry.
    Cache,
    /// Freshly generated by the LLM backend.
    Backend,
}

/// Metadata attached to every response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseMetadata {
    /// Response terminal.
    pub source: ResponseSource,
    /// `round(1 − distance, 4)` of the surfaced hit; cache hits only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Topic partition: the matched entry's tag on hits, the request
    /// classification on misses.
    pub topic: Topic,
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    /// Answer text.
    pub response: String,
    /// Response metadata.
    pub metadata: ResponseMetadata,
}

/// Failures that propagate out of the pipeline.
///
/// Store failures are absent on purpose: they are locally recovered
/// (best-effort cache) and never reach the caller.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Backend failure (or backend circuit open). Propagates: the user
    /// expects an answer.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The query could not be embedded; the request cannot proceed.
    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
}

/// The orchestrator. Constructed once at startup with its collaborators.
pub struct QueryPipeline<V: VectorIndex, L: LanguageModel> {
    embedder: Arc<TextEmbedder>,
    store: Arc<SemanticStore<V>>,
    backend: L,
    metrics: Arc<MetricsRegistry>,
}

impl<V, L> QueryPipeline<V, L>
where
    V: VectorIndex,
    L: LanguageModel,
{
    /// Creates the pipeline from its collaborators.
    pub fn new(
        embedder: Arc<TextEmbedder>,
        store: Arc<SemanticStore<V>>,
        backend: L,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            embedder,
            store,
            backend,
            metrics,
        }
    }

    /// Processes one query through the cache.
    ///
    /// `force_refresh` skips the cache read (the write still happens, so
    /// the entry is refreshed in place).
    #[instrument(skip(self, query), fields(query_len = query.len(), force_refresh))]
    pub async fn process(
        &self,
        query: &str,
        force_refresh: bool,
    ) -> Result<QueryOutcome, PipelineError> {
        let started = Instant::now();

        let classification = classify(query);
        self.metrics.record_query_class(classification.class);
        self.metrics.record_topic(classification.topic);
        debug!(
            class = %classification.class,
            topic = %classification.topic,
            threshold = classification.threshold,
            ttl = classification.ttl_seconds,
            "query classified"
        );

        let embedding = self.embed_off_thread(query).await?;

        if !force_refresh
            && let Some(hit) = self
                .store
                .search(&embedding, classification.threshold, classification.topic)
                .await
        {
            let latency_ms = elapsed_ms(started);
            self.metrics.record_cache_hit(latency_ms);

            let confidence = round4(1.0 - hit.distance);
            info!(
                distance = hit.distance,
                confidence,
                topic = %hit.topic,
                "cache hit"
            );

            return Ok(QueryOutcome {
                response: hit.response,
                metadata: ResponseMetadata {
                    source: ResponseSource::Cache,
                    confidence: Some(confidence),
                    topic: hit.topic,
                },
            });
        }

        info!(topic = %classification.topic, "cache miss, calling backend");
        let answer = match self.backend.generate(query).await {
            Ok(answer) => answer,
            Err(e) => {
                self.metrics.record_error();
                return Err(e.into());
            }
        };

        self.store
            .store(CacheEntry::new(
                query,
                answer.clone(),
                embedding,
                classification.class,
                classification.topic,
                classification.ttl_seconds,
            ))
            .await;

        self.metrics.record_cache_miss(elapsed_ms(started));

        Ok(QueryOutcome {
            response: answer,
            metadata: ResponseMetadata {
                source: ResponseSource::Backend,
                confidence: None,
                topic: classification.topic,
            },
        })
    }

    /// Runs the CPU-bound embedding on the blocking pool so it cannot
    /// starve the request executor.
    async fn embed_off_thread(&self, query: &str) -> Result<Vec<f32>, PipelineError> {
        let embedder = Arc::clone(&self.embedder);
        let text = query.to_string();

        let result = tokio::task::spawn_blocking(move || embedder.embed(&text))
            .await
            .map_err(|e| {
                PipelineError::Embedding(EmbeddingError::InferenceFailed {
                    reason: format!("embedding task failed: {e}"),
                })
            })?;

        result.map_err(|e| {
            self.metrics.record_error();
            PipelineError::Embedding(e)
        })
    }

    /// The store this pipeline reads and writes.
    pub fn store(&self) -> &SemanticStore<V> {
        &self.store
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

fn round4(value: f32) -> f32 {
    ((value as f64 * 10_000.0).round() / 10_000.0) as f32
}
