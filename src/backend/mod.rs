//! LLM backend adapter.
//!
//! Wraps a single `generate(query) → text` call against a model-agnostic
//! provider client. The adapter owns the backend breaker check, translates
//! the provider failure taxonomy into [`BackendError`], and records
//! success/failure against the breaker. Unlike store errors, backend
//! errors propagate: the user expects an answer.

#[cfg(any(test, feature = "mock"))]
pub mod mock;


#[cfg(any(test, feature = "mock"))]
pub use mock::MockLanguageModel;

use std::sync::Arc;

use genai::Client;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest};
use thiserror::Error;
use tracing::{debug, error, instrument};

use crate::breaker::CircuitBreaker;

/// Backend failure taxonomy surfaced to the orchestrator.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The provider signalled a rate limit. Maps to HTTP 429.
    #[error("backend rate limit exceeded: {reason}")]
    RateLimited {
        /// Provider message.
        reason: String,
    },

    /// Any other provider failure, or the backend circuit being open.
    /// Maps to HTTP 502.
    #[error("backend unavailable: {reason}")]
    Unavailable {
        /// Provider message.
        reason: String,
    },
}

/// An opaque async text generator.
pub trait LanguageModel: Send + Sync {
    /// Generates an answer for the query.
    fn generate(
        &self,
        query: &str,
    ) -> impl std::future::Future<Output = Result<String, BackendError>> + Send;
}

impl<L: LanguageModel> LanguageModel for Arc<L> {
    fn generate(
        &self,
        query: &str,
    ) -> impl std::future::Future<Output = Result<String, BackendError>> + Send {
        self.as_ref().generate(query)
    }
}

/// Production backend over the `genai` multi-provider client.
pub struct LlmBackend {
    client: Client,
    model: String,
    options: ChatOptions,
    breaker: Arc<CircuitBreaker>,
}

impl LlmBackend {
    /// Creates a backend for `model`, guarded by `breaker`.
    ///
    /// Provider credentials are resolved by the client from the
    /// environment; answers are generated at temperature 0 so semantically
    /// equal queries cache deterministically.
    pub fn new(model: impl Into<String>, breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            client: Client::default(),
            model: model.into(),
            options: ChatOptions::default().with_temperature(0.0),
            breaker,
        }
    }

    /// The configured model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl LanguageModel for LlmBackend {
    #[instrument(skip(self, query), fields(model = %self.model, query_len = query.len()))]
    async fn generate(&self, query: &str) -> Result<String, BackendError> {
        if !self.breaker.is_available() {
            // Fail fast without consuming a provider call; a rejected
            // admission is not a provider failure.
            return Err(BackendError::Unavailable {
                reason: format!("circuit '{}' is open", self.breaker.name()),
            });
        }

        let request = ChatRequest::new(vec![ChatMessage::user(query)]);

        match self
            .client
            .exec_chat(&self.model, request, Some(&self.options))
            .await
        {
            Ok(response) => {
                self.breaker.record_success();
                // A null/empty generation is an empty answer, not an error.
                let answer = response.first_text().unwrap_or_default().to_string();
                debug!(answer_len = answer.len(), "backend generation complete");
                Ok(answer)
            }
            Err(e) => {
                self.breaker.record_failure();
                error!(error = %e, "backend generation failed");
                Err(translate_provider_error(&e.to_string()))
            }
        }
    }
}

/// Maps a provider error message onto the two-kind taxonomy.
fn translate_provider_error(reason: &str) -> BackendError {
    if is_rate_limit(reason) {
        BackendError::RateLimited {
            reason: reason.to_string(),
        }
    } else {
        BackendError::Unavailable {
            reason: reason.to_string(),
        }
    }
}

fn is_rate_limit(reason: &str) -> bool {
    let lowered = reason.to_lowercase();
    lowered.contains("rate limit")
        || lowered.contains("rate_limit")
        || lowered.contains("too many requests")
        || lowered.contains("429")
}
