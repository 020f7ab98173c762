//! Request/response bodies for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::classifier::Topic;
use crate::pipeline::{QueryOutcome, ResponseSource};

/// Body of `POST /query`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    /// The user's query text.
    pub query: String,
    /// Bypass the cache read and force a backend call.
    #[serde(default, rename = "forceRefresh")]
    pub force_refresh: bool,
}

/// Metadata echoed with every answer.
#[derive(Debug, Clone, Serialize)]
pub struct QueryMetadata {
    /// `"cache"` or `"backend"`.
    pub source: ResponseSource,
    /// `round(1 − distance, 4)`; present only on cache hits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Topic partition tag.
    pub topic: Topic,
}

/// Body of a successful `POST /query`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    /// The answer to the query.
    pub response: String,
    /// Response metadata.
    pub metadata: QueryMetadata,
}

impl From<QueryOutcome> for QueryResponse {
    fn from(outcome: QueryOutcome) -> Self {
        QueryResponse {
            response: outcome.response,
            metadata: QueryMetadata {
                source: outcome.metadata.source,
                confidence: outcome.metadata.confidence,
                topic: outcome.metadata.topic,
            },
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the process is serving.
    pub status: &'static str,
}

/// Error body shared by every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
    /// HTTP status code, repeated in the body.
    pub code: u16,
}
