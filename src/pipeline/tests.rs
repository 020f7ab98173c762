use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::backend::MockLanguageModel;
use crate::breaker::{BreakerConfig, CircuitBreaker, CircuitState};
use crate::classifier::QueryClass;
use crate::embedding::EmbedderConfig;
use crate::metrics::MetricsRegistry;
use crate::store::{MockVectorIndex, StoreConfig};

struct Harness {
    pipeline: QueryPipeline<MockVectorIndex, Arc<MockLanguageModel>>,
    store: Arc<SemanticStore<MockVectorIndex>>,
    backend: Arc<MockLanguageModel>,
    metrics: Arc<MetricsRegistry>,
    store_breaker: Arc<CircuitBreaker>,
}

async fn harness_with_backend(backend: MockLanguageModel) -> Harness {
    let embedder = Arc::new(TextEmbedder::load(EmbedderConfig::stub()).expect("stub loads"));
    let store_breaker = Arc::new(CircuitBreaker::new(
        "qdrant",
        BreakerConfig {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(10),
            half_open_max_calls: 1,
        },
    ));
    let store = Arc::new(SemanticStore::new(
        MockVectorIndex::new(),
        Arc::clone(&store_breaker),
        StoreConfig::default(),
    ));
    store.ensure_ready().await.expect("mock collection");

    let backend = Arc::new(backend);
    let metrics = Arc::new(MetricsRegistry::new());
    let pipeline = QueryPipeline::new(
        embedder,
        Arc::clone(&store),
        Arc::clone(&backend),
        Arc::clone(&metrics),
    );

    Harness {
        pipeline,
        store,
        backend,
        metrics,
        store_breaker,
    }
}

async fn harness() -> Harness {
    harness_with_backend(MockLanguageModel::new()).await
}

const COLLECTION: &str = crate::store::DEFAULT_COLLECTION_NAME;

#[tokio::test]
async fn test_cold_cache_goes_to_backend_and_stores() {
    let h = harness().await;

    let outcome = h
        .pipeline
        .process("What is the capital of France?", false)
        .await
        .unwrap();

    assert_eq!(outcome.metadata.source, ResponseSource::Backend);
    assert_eq!(outcome.metadata.topic, Topic::Geography);
    assert!(outcome.metadata.confidence.is_none());
    assert_eq!(
        outcome.response,
        "backend answer for: What is the capital of France?"
    );
    assert_eq!(h.backend.call_count(), 1);
    assert_eq!(h.store.index().point_count(COLLECTION), Some(1));
}

#[tokio::test]
async fn test_identical_query_hits_cache_without_backend_call() {
    let h = harness().await;

    let first = h
        .pipeline
        .process("What is the capital of France?", false)
        .await
        .unwrap();
    let second = h
        .pipeline
        .process("What is the capital of France?", false)
        .await
        .unwrap();

    assert_eq!(second.metadata.source, ResponseSource::Cache);
    assert_eq!(second.metadata.topic, Topic::Geography);
    assert_eq!(second.response, first.response);

    let confidence = second.metadata.confidence.expect("hits carry confidence");
    assert!(confidence >= 0.999, "confidence was {confidence}");

    // One backend call total.
    assert_eq!(h.backend.call_count(), 1);
}

#[tokio::test]
async fn test_distinct_time_sensitive_queries_both_reach_backend() {
    let h = harness().await;

    let nyc = h
        .pipeline
        .process("What's the weather in NYC today?", false)
        .await
        .unwrap();
    let la = h
        .pipeline
        .process("What's the weather in LA today?", false)
        .await
        .unwrap();

    assert_eq!(nyc.metadata.source, ResponseSource::Backend);
    assert_eq!(la.metadata.source, ResponseSource::Backend);
    assert_eq!(h.backend.call_count(), 2);
}

#[tokio::test]
async fn test_force_refresh_bypasses_read_and_rewrites() {
    let h = harness_with_backend(MockLanguageModel::with_outcomes([
        Ok("first answer".to_string()),
        Ok("refreshed answer".to_string()),
    ]))
    .await;

    h.pipeline
        .process("What is the capital of France?", false)
        .await
        .unwrap();

    let refreshed = h
        .pipeline
        .process("What is the capital of France?", true)
        .await
        .unwrap();

    assert_eq!(refreshed.metadata.source, ResponseSource::Backend);
    assert_eq!(refreshed.response, "refreshed answer");
    assert_eq!(h.backend.call_count(), 2);

    // Still a single content-addressed entry, now holding the new answer.
    assert_eq!(h.store.index().point_count(COLLECTION), Some(1));
    let id = crate::hashing::hash_query("What is the capital of France?");
    let stored = h.store.index().get_entry(COLLECTION, id).unwrap();
    assert_eq!(stored.response, "refreshed answer");
}

#[tokio::test]
async fn test_open_store_breaker_degrades_to_backend() {
    let h = harness().await;

    h.store_breaker.record_failure();
    h.store_breaker.record_failure();
    h.store_breaker.record_failure();
    assert_eq!(h.store_breaker.state(), CircuitState::Open);

    for _ in 0..2 {
        let outcome = h
            .pipeline
            .process("What is the capital of France?", false)
            .await
            .unwrap();
        assert_eq!(outcome.metadata.source, ResponseSource::Backend);
    }

    // No store reads or writes while the circuit is open.
    assert_eq!(h.store.index().search_calls(), 0);
    assert_eq!(h.store.index().upsert_calls(), 0);
    assert_eq!(h.backend.call_count(), 2);
}

#[tokio::test]
async fn test_rate_limit_propagates_without_store_write() {
    let h = harness_with_backend(MockLanguageModel::with_outcomes([Err(
        BackendError::RateLimited {
            reason: "slow down".to_string(),
        },
    )]))
    .await;

    let err = h
        .pipeline
        .process("latest bitcoin price", false)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Backend(BackendError::RateLimited { .. })
    ));
    assert_eq!(h.store.index().point_count(COLLECTION), Some(0));

    let stats = h.metrics.snapshot();
    assert_eq!(stats.errors, 1);
    // Neither a hit nor a miss terminal was reached.
    assert_eq!(stats.total_queries, 0);
}

#[tokio::test]
async fn test_backend_unavailable_propagates() {
    let h = harness_with_backend(MockLanguageModel::with_outcomes([Err(
        BackendError::Unavailable {
            reason: "connection refused".to_string(),
        },
    )]))
    .await;

    let err = h
        .pipeline
        .process("What is the capital of France?", false)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Backend(BackendError::Unavailable { .. })
    ));
}

#[tokio::test]
async fn test_store_failure_still_returns_backend_answer() {
    let h = harness().await;
    h.store.index().set_failing(true);

    let outcome = h
        .pipeline
        .process("What is the capital of France?", false)
        .await
        .unwrap();

    assert_eq!(outcome.metadata.source, ResponseSource::Backend);
    assert_eq!(
        outcome.response,
        "backend answer for: What is the capital of France?"
    );
}

#[tokio::test]
async fn test_metrics_observed_at_every_terminal() {
    let h = harness().await;

    h.pipeline
        .process("What is the capital of France?", false)
        .await
        .unwrap();
    h.pipeline
        .process("What is the capital of France?", false)
        .await
        .unwrap();

    let stats = h.metrics.snapshot();
    assert_eq!(stats.total_queries, 2);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.cache_misses, 1);
    assert_eq!(stats.backend_calls, 1);
    assert_eq!(stats.hit_rate_percent, 50.0);
    assert_eq!(stats.query_classes.evergreen, 2);
    assert_eq!(stats.topics.get("geography"), Some(&2));
}

#[tokio::test]
async fn test_stored_entry_follows_classification() {
    let h = harness().await;

    h.pipeline
        .process("What's the weather in NYC today?", false)
        .await
        .unwrap();

    let id = crate::hashing::hash_query("What's the weather in NYC today?");
    let stored = h.store.index().get_entry(COLLECTION, id).unwrap();

    assert_eq!(stored.class, QueryClass::TimeSensitive);
    assert_eq!(stored.topic, Topic::Weather);
    assert_eq!(stored.expires_at - stored.created_at, 300);
}

#[tokio::test]
async fn test_empty_backend_answer_is_cached_as_empty_string() {
    let h = harness_with_backend(MockLanguageModel::with_outcomes([Ok(String::new())])).await;

    let outcome = h.pipeline.process("What is DNS?", false).await.unwrap();
    assert_eq!(outcome.response, "");

    let id = crate::hashing::hash_query("What is DNS?");
    let stored = h.store.index().get_entry(COLLECTION, id).unwrap();
    assert_eq!(stored.response, "");
}
