//! Request handlers.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::backend::LanguageModel;
use crate::store::VectorIndex;

use super::error::ApiError;
use super::payload::{QueryRequest, QueryResponse};
use super::state::AppState;

/// `POST /query`: answer from the cache or the backend.
///
/// Validation happens here, before any classifier, embedding, store or
/// backend work: a whitespace-only query costs nothing downstream.
#[instrument(skip(state, request), fields(query_len = request.query.len(), force_refresh = request.force_refresh))]
pub async fn query_handler<V, L>(
    State(state): State<AppState<V, L>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError>
where
    V: VectorIndex + 'static,
    L: LanguageModel + 'static,
{
    if request.query.trim().is_empty() {
        return Err(ApiError::Validation(
            "query must not be empty or whitespace-only".to_string(),
        ));
    }

    let outcome = state
        .pipeline
        .process(&request.query, request.force_refresh)
        .await?;

    Ok(Json(outcome.into()))
}
