//! Scriptable [`LanguageModel`] for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{BackendError, LanguageModel};

/// A mock backend that echoes queries, with optional scripted outcomes.
#[derive(Default)]
pub struct MockLanguageModel {
    scripted: Mutex<VecDeque<Result<String, BackendError>>>,
    calls: AtomicUsize,
}

impl MockLanguageModel {
    /// A mock answering every query with `"backend answer for: <query>"`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues outcomes returned before falling back to the echo answer.
    pub fn with_outcomes(
        outcomes: impl IntoIterator<Item = Result<String, BackendError>>,
    ) -> Self {
        Self {
            scripted: Mutex::new(outcomes.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queues one more outcome.
    pub fn push_outcome(&self, outcome: Result<String, BackendError>) {
        self.scripted.lock().push_back(outcome);
    }

    /// How many generate calls reached this backend.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LanguageModel for MockLanguageModel {
    async fn generate(&self, query: &str) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(outcome) = self.scripted.lock().pop_front() {
            return outcome;
        }

        Ok(format!("backend answer for: {query}"))
    }
}
