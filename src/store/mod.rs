//! Vector cache store.
//!
//! [`SemanticStore`] layers caching policy over a narrow [`VectorIndex`]
//! seam: breaker-gated admission, the two-phase (partitioned, then global)
//! KNN-1 search, distance thresholding, and best-effort writes. Store
//! failures never fail a user request; they are logged and counted against
//! the store breaker, and the request degrades to a miss or a skipped
//! write.

pub mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;
pub mod sweeper;


pub use client::{QdrantIndex, VectorIndex};
pub use error::StoreError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockVectorIndex;
pub use model::{CacheEntry, CachedMatch, ScoredEntry};
pub use sweeper::{SweepReport, spawn_sweeper};

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, instrument, warn};

use crate::breaker::CircuitBreaker;
use crate::classifier::Topic;
use crate::embedding::EMBEDDING_DIM;

/// Default collection name.
pub const DEFAULT_COLLECTION_NAME: &str = "semantic_cache";

/// Default live-entry ceiling before the sweeper starts evicting.
pub const DEFAULT_MAX_ENTRIES: u64 = 100_000;

/// Store tuning.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Collection the cache lives in.
    pub collection_name: String,
    /// Vector dimension of the collection.
    pub vector_size: u64,
    /// Live-entry ceiling enforced by the sweeper.
    pub max_entries: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
            vector_size: EMBEDDING_DIM as u64,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// The cache tier: a vector index plus admission and freshness policy.
pub struct SemanticStore<V: VectorIndex> {
    index: V,
    breaker: Arc<CircuitBreaker>,
    config: StoreConfig,
}

impl<V: VectorIndex> SemanticStore<V> {
    /// Creates a store over `index`, guarded by `breaker`.
    pub fn new(index: V, breaker: Arc<CircuitBreaker>, config: StoreConfig) -> Self {
        Self {
            index,
            breaker,
            config,
        }
    }

    /// Store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The breaker guarding this store.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// The underlying index (used by the sweeper and tests).
    pub fn index(&self) -> &V {
        &self.index
    }

    /// Ensures the collection exists. Startup-only; errors propagate.
    pub async fn ensure_ready(&self) -> Result<(), StoreError> {
        self.index
            .ensure_collection(&self.config.collection_name, self.config.vector_size)
            .await
    }

    /// Two-phase nearest-neighbor lookup.
    ///
    /// Topic-specific queries get a tight sub-search in their partition
    /// first; the global space is the fallback, so the two phases never
    /// produce a false negative relative to one global search with the
    /// same threshold. Returns `None` when the breaker rejects, the index
    /// errors, nothing is stored, or every candidate exceeds `threshold`.
    #[instrument(skip(self, embedding), fields(topic = %topic, threshold))]
    pub async fn search(
        &self,
        embedding: &[f32],
        threshold: f32,
        topic: Topic,
    ) -> Option<CachedMatch> {
        if !self.breaker.is_available() {
            warn!(circuit = self.breaker.name(), "store breaker open, skipping cache search");
            return None;
        }

        let now = Utc::now().timestamp();

        if topic.is_specific() {
            match self
                .index
                .search(&self.config.collection_name, embedding, Some(topic), now)
                .await
            {
                Ok(result) => {
                    self.breaker.record_success();
                    if let Some(entry) = result
                        && entry.distance <= threshold
                    {
                        debug!(distance = entry.distance, "partitioned cache hit");
                        return Some(entry.into());
                    }
                }
                Err(e) => {
                    self.breaker.record_failure();
                    error!(error = %e, "partitioned cache search failed");
                    return None;
                }
            }
        }

        match self
            .index
            .search(&self.config.collection_name, embedding, None, now)
            .await
        {
            Ok(result) => {
                self.breaker.record_success();
                result.filter(|entry| entry.distance <= threshold).map(|entry| {
                    debug!(distance = entry.distance, "global cache hit");
                    entry.into()
                })
            }
            Err(e) => {
                self.breaker.record_failure();
                error!(error = %e, "cache search failed");
                None
            }
        }
    }

    /// Best-effort write. Overwrites in place at the entry's
    /// content-addressed id, extending the expiration; failures are logged
    /// and counted but never surfaced.
    #[instrument(skip(self, entry), fields(topic = %entry.topic, ttl = entry.expires_at - entry.created_at))]
    pub async fn store(&self, entry: CacheEntry) {
        if !self.breaker.is_available() {
            warn!(circuit = self.breaker.name(), "store breaker open, skipping cache store");
            return;
        }

        let ttl = entry.expires_at - entry.created_at;
        match self.index.upsert(&self.config.collection_name, entry).await {
            Ok(()) => {
                self.breaker.record_success();
                debug!(ttl, "cached entry stored");
            }
            Err(e) => {
                self.breaker.record_failure();
                error!(error = %e, "cache store failed");
            }
        }
    }

    /// One sweep pass: purge expired entries, then trim any excess above
    /// `max_entries` in ascending expiry order (shortest-TTL-first).
    pub async fn sweep_once(&self) -> Result<SweepReport, StoreError> {
        let now = Utc::now().timestamp();
        let collection = &self.config.collection_name;

        let expired = self.index.purge_expired(collection, now).await?;

        let live = self.index.entry_count(collection).await?;
        let evicted = if live > self.config.max_entries {
            self.index
                .evict_expiring_soonest(collection, live - self.config.max_entries)
                .await?
        } else {
            0
        };

        Ok(SweepReport { expired, evicted })
    }
}
