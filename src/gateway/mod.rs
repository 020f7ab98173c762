//! HTTP gateway (axum).
//!
//! Routes: `POST /query`, `GET /health`, `GET /ready`, `GET /stats`.
//! Status mapping: 422 validation, 429 backend rate limit, 502 backend
//! unavailable, 500 otherwise. Store failures never shape a status code;
//! they degrade the request to a cache miss.

pub mod error;
pub mod handler;
pub mod payload;
pub mod state;

#[cfg(test)]
mod handler_tests;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use handler::query_handler;
pub use payload::{ErrorResponse, HealthResponse, QueryMetadata, QueryRequest, QueryResponse};
pub use state::AppState;

use crate::backend::LanguageModel;
use crate::breaker::CircuitState;
use crate::metrics::CacheStats;
use crate::store::VectorIndex;

/// Builds the service router over the wired-up state.
pub fn create_router<V, L>(state: AppState<V, L>) -> Router
where
    V: VectorIndex + 'static,
    L: LanguageModel + 'static,
{
    Router::new()
        .route("/query", post(query_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/stats", get(stats_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GET /health`: process liveness.
#[tracing::instrument]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// `GET /stats`: metrics snapshot.
pub async fn stats_handler<V, L>(State(state): State<AppState<V, L>>) -> Json<CacheStats>
where
    V: VectorIndex + 'static,
    L: LanguageModel + 'static,
{
    Json(state.metrics.snapshot())
}

/// Component detail reported by `/ready`.
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    /// Store breaker state.
    pub store: CircuitState,
    /// Backend breaker state.
    pub backend: CircuitState,
    /// `"stub"` or `"real"`.
    pub embedder_mode: &'static str,
}

/// Body of `GET /ready`.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// `"ok"` or `"degraded"`.
    pub status: &'static str,
    /// Per-component detail.
    pub components: ComponentStatus,
}

/// `GET /ready`: component readiness.
///
/// An open store breaker leaves the service degraded but serving (every
/// query falls through to the backend); an open backend breaker means
/// queries on a cold cache cannot be answered, so readiness fails.
#[tracing::instrument(skip(state))]
pub async fn ready_handler<V, L>(State(state): State<AppState<V, L>>) -> Response
where
    V: VectorIndex + 'static,
    L: LanguageModel + 'static,
{
    let components = ComponentStatus {
        store: state.store.breaker().state(),
        backend: state.backend_breaker.state(),
        embedder_mode: if state.embedder.is_stub() {
            "stub"
        } else {
            "real"
        },
    };

    let ready = components.backend != CircuitState::Open;
    let (status_code, status) = if ready {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (status_code, Json(ReadyResponse { status, components })).into_response()
}
