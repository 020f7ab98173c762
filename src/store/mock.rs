//! In-memory [`VectorIndex`] for tests and examples.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::classifier::Topic;

use super::client::VectorIndex;
use super::error::StoreError;
use super::model::{CacheEntry, ScoredEntry};

#[derive(Default)]
pub struct MockVectorIndex {
    collections: RwLock<HashMap<String, MockCollection>>,
    failing: AtomicBool,
    search_calls: AtomicUsize,
    upsert_calls: AtomicUsize,
}

#[derive(Default)]
struct MockCollection {
    vector_size: u64,
    points: HashMap<u64, CacheEntry>,
}

impl MockVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail, for breaker-path tests.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn point_count(&self, collection: &str) -> Option<usize> {
        self.collections
            .read()
            .ok()?
            .get(collection)
            .map(|c| c.points.len())
    }

    /// Number of search round-trips issued against the mock.
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Number of upsert round-trips issued against the mock.
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn get_entry(&self, collection: &str, id: u64) -> Option<CacheEntry> {
        self.collections
            .read()
            .ok()?
            .get(collection)?
            .points
            .get(&id)
            .cloned()
    }

    fn fail_check(&self, collection: &str) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::ConnectionFailed {
                url: format!("mock://{collection}"),
                message: "mock index failing".to_string(),
            });
        }
        Ok(())
    }
}

impl VectorIndex for MockVectorIndex {
    async fn ensure_collection(&self, name: &str, vector_size: u64) -> Result<(), StoreError> {
        self.fail_check(name)?;

        let mut collections = self
            .collections
            .write()
            .expect("mock collections lock poisoned");
        collections
            .entry(name.to_string())
            .or_insert(MockCollection {
                vector_size,
                points: HashMap::new(),
            });

        Ok(())
    }

    async fn upsert(&self, collection: &str, entry: CacheEntry) -> Result<(), StoreError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.fail_check(collection)?;

        let mut collections = self
            .collections
            .write()
            .expect("mock collections lock poisoned");
        let coll = collections.entry(collection.to_string()).or_default();

        if coll.vector_size != 0 && entry.embedding.len() as u64 != coll.vector_size {
            return Err(StoreError::InvalidDimension {
                expected: coll.vector_size as usize,
                actual: entry.embedding.len(),
            });
        }

        coll.points.insert(entry.id(), entry);
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        topic: Option<Topic>,
        now: i64,
    ) -> Result<Option<ScoredEntry>, StoreError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.fail_check(collection)?;

        let collections = self
            .collections
            .read()
            .expect("mock collections lock poisoned");
        let Some(coll) = collections.get(collection) else {
            return Ok(None);
        };

        let best = coll
            .points
            .iter()
            .filter(|(_, entry)| entry.expires_at > now)
            .filter(|(_, entry)| topic.is_none_or(|t| entry.topic == t))
            .map(|(&id, entry)| {
                let distance = 1.0 - cosine_similarity(vector, &entry.embedding);
                (id, entry, distance)
            })
            .min_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));

        Ok(best.map(|(id, entry, distance)| ScoredEntry {
            id,
            distance,
            query: entry.query.clone(),
            response: entry.response.clone(),
            class: entry.class,
            topic: entry.topic,
            created_at: entry.created_at,
            expires_at: entry.expires_at,
        }))
    }

    async fn purge_expired(&self, collection: &str, now: i64) -> Result<u64, StoreError> {
        self.fail_check(collection)?;

        let mut collections = self
            .collections
            .write()
            .expect("mock collections lock poisoned");
        let Some(coll) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let before = coll.points.len();
        coll.points.retain(|_, entry| entry.expires_at > now);
        Ok((before - coll.points.len()) as u64)
    }

    async fn entry_count(&self, collection: &str) -> Result<u64, StoreError> {
        self.fail_check(collection)?;

        let collections = self
            .collections
            .read()
            .expect("mock collections lock poisoned");
        Ok(collections
            .get(collection)
            .map(|c| c.points.len() as u64)
            .unwrap_or(0))
    }

    async fn evict_expiring_soonest(
        &self,
        collection: &str,
        excess: u64,
    ) -> Result<u64, StoreError> {
        self.fail_check(collection)?;

        let mut collections = self
            .collections
            .write()
            .expect("mock collections lock poisoned");
        let Some(coll) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let mut expiries: Vec<(u64, i64)> = coll
            .points
            .iter()
            .map(|(&id, entry)| (id, entry.expires_at))
            .collect();
        expiries.sort_by_key(|&(_, expires_at)| expires_at);

        let mut evicted = 0;
        for (id, _) in expiries.into_iter().take(excess as usize) {
            coll.points.remove(&id);
            evicted += 1;
        }

        Ok(evicted)
    }
}

/// Cosine similarity between two vectors (0 for mismatched or empty input).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}
