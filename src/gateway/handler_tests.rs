use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::backend::{BackendError, MockLanguageModel};
use crate::breaker::{BreakerConfig, CircuitBreaker};
use crate::embedding::{EmbedderConfig, TextEmbedder};
use crate::metrics::MetricsRegistry;
use crate::pipeline::QueryPipeline;
use crate::store::{MockVectorIndex, SemanticStore, StoreConfig};

use super::create_router;
use super::state::AppState;

struct TestContext {
    router: Router,
    backend: Arc<MockLanguageModel>,
    store: Arc<SemanticStore<MockVectorIndex>>,
    backend_breaker: Arc<CircuitBreaker>,
}

async fn context_with_backend(backend: MockLanguageModel) -> TestContext {
    let breaker_config = BreakerConfig {
        failure_threshold: 3,
        recovery_timeout: Duration::from_secs(10),
        half_open_max_calls: 1,
    };

    let embedder = Arc::new(TextEmbedder::load(EmbedderConfig::stub()).expect("stub loads"));
    let store_breaker = Arc::new(CircuitBreaker::new("qdrant", breaker_config));
    let backend_breaker = Arc::new(CircuitBreaker::new("llm", breaker_config));

    let store = Arc::new(SemanticStore::new(
        MockVectorIndex::new(),
        store_breaker,
        StoreConfig::default(),
    ));
    store.ensure_ready().await.expect("mock collection");

    let backend = Arc::new(backend);
    let metrics = Arc::new(MetricsRegistry::new());
    let pipeline = Arc::new(QueryPipeline::new(
        Arc::clone(&embedder),
        Arc::clone(&store),
        Arc::clone(&backend),
        Arc::clone(&metrics),
    ));

    let state = AppState {
        pipeline,
        metrics,
        store: Arc::clone(&store),
        embedder,
        backend_breaker: Arc::clone(&backend_breaker),
    };

    TestContext {
        router: create_router(state),
        backend,
        store,
        backend_breaker,
    }
}

async fn context() -> TestContext {
    context_with_backend(MockLanguageModel::new()).await
}

fn post_query(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/query")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is JSON")
}

#[tokio::test]
async fn test_health_endpoint() {
    let ctx = context().await;

    let response = ctx.router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_cache_miss_answers_from_backend() {
    let ctx = context().await;

    let response = ctx
        .router
        .oneshot(post_query(json!({"query": "What is the capital of France?"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["metadata"]["source"], "backend");
    assert_eq!(body["metadata"]["topic"], "geography");
    assert!(body["metadata"].get("confidence").is_none());
    assert_eq!(ctx.backend.call_count(), 1);
}

#[tokio::test]
async fn test_second_identical_request_is_served_from_cache() {
    let ctx = context().await;

    let first = ctx
        .router
        .clone()
        .oneshot(post_query(json!({"query": "What is the capital of France?"})))
        .await
        .unwrap();
    let first_body = body_json(first).await;

    let second = ctx
        .router
        .clone()
        .oneshot(post_query(json!({"query": "What is the capital of France?"})))
        .await
        .unwrap();

    assert_eq!(second.status(), StatusCode::OK);
    let body = body_json(second).await;
    assert_eq!(body["metadata"]["source"], "cache");
    assert_eq!(body["response"], first_body["response"]);
    assert!(body["metadata"]["confidence"].as_f64().unwrap() >= 0.999);
    assert_eq!(ctx.backend.call_count(), 1);
}

#[tokio::test]
async fn test_force_refresh_bypasses_cache() {
    let ctx = context().await;

    ctx.router
        .clone()
        .oneshot(post_query(json!({"query": "What is the capital of France?"})))
        .await
        .unwrap();

    let refreshed = ctx
        .router
        .clone()
        .oneshot(post_query(json!({
            "query": "What is the capital of France?",
            "forceRefresh": true
        })))
        .await
        .unwrap();

    let body = body_json(refreshed).await;
    assert_eq!(body["metadata"]["source"], "backend");
    assert_eq!(ctx.backend.call_count(), 2);
}

#[tokio::test]
async fn test_whitespace_query_is_rejected_before_any_downstream_call() {
    let ctx = context().await;

    let response = ctx
        .router
        .oneshot(post_query(json!({"query": "   "})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["code"], 422);

    assert_eq!(ctx.backend.call_count(), 0);
    assert_eq!(ctx.store.index().search_calls(), 0);
    assert_eq!(ctx.store.index().upsert_calls(), 0);
}

#[tokio::test]
async fn test_missing_query_field_is_rejected() {
    let ctx = context().await;

    let response = ctx.router.oneshot(post_query(json!({}))).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_single_character_query_is_accepted() {
    let ctx = context().await;

    let response = ctx
        .router
        .oneshot(post_query(json!({"query": "a"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limited_backend_maps_to_429() {
    let ctx = context_with_backend(MockLanguageModel::with_outcomes([Err(
        BackendError::RateLimited {
            reason: "slow down".to_string(),
        },
    )]))
    .await;

    let response = ctx
        .router
        .oneshot(post_query(json!({"query": "latest bitcoin price"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(response).await;
    assert_eq!(body["code"], 429);
    assert!(body["error"].as_str().unwrap().contains("rate limit"));
}

#[tokio::test]
async fn test_unavailable_backend_maps_to_502() {
    let ctx = context_with_backend(MockLanguageModel::with_outcomes([Err(
        BackendError::Unavailable {
            reason: "connection refused".to_string(),
        },
    )]))
    .await;

    let response = ctx
        .router
        .oneshot(post_query(json!({"query": "What is DNS?"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["code"], 502);
}

#[tokio::test]
async fn test_stats_endpoint_reflects_traffic() {
    let ctx = context().await;

    ctx.router
        .clone()
        .oneshot(post_query(json!({"query": "What is the capital of France?"})))
        .await
        .unwrap();
    ctx.router
        .clone()
        .oneshot(post_query(json!({"query": "What is the capital of France?"})))
        .await
        .unwrap();

    let response = ctx.router.oneshot(get("/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["total_queries"], 2);
    assert_eq!(body["cache_hits"], 1);
    assert_eq!(body["cache_misses"], 1);
    assert_eq!(body["backend_calls"], 1);
    assert_eq!(body["hit_rate_percent"], 50.0);
    assert_eq!(body["topics"]["geography"], 2);
}

#[tokio::test]
async fn test_ready_reports_components() {
    let ctx = context().await;

    let response = ctx.router.oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["components"]["embedder_mode"], "stub");
    assert_eq!(body["components"]["store"], "closed");
    assert_eq!(body["components"]["backend"], "closed");
}

#[tokio::test]
async fn test_ready_degrades_when_backend_circuit_opens() {
    let ctx = context().await;

    ctx.backend_breaker.record_failure();
    ctx.backend_breaker.record_failure();
    ctx.backend_breaker.record_failure();

    let response = ctx.router.oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = body_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["components"]["backend"], "open");
}
