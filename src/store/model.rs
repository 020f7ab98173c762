//! Persisted entry shapes.

use chrono::Utc;

use crate::classifier::{QueryClass, Topic};
use crate::hashing::hash_query;

/// One cache record, as persisted in the vector index.
///
/// The record is content-addressed: its point id is `hash_query(query)`,
/// so storing the same canonical query twice overwrites in place and
/// extends the expiration.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Original UTF-8 query text.
    pub query: String,
    /// Backend-generated answer text.
    pub response: String,
    /// Freshness class used when stored.
    pub class: QueryClass,
    /// Topic partition tag.
    pub topic: Topic,
    /// Wall-clock epoch seconds at store time.
    pub created_at: i64,
    /// Epoch second past which the entry is invisible.
    pub expires_at: i64,
    /// Unit-norm embedding of the query.
    pub embedding: Vec<f32>,
}

impl CacheEntry {
    /// Builds an entry expiring `ttl_seconds` from now.
    pub fn new(
        query: impl Into<String>,
        response: impl Into<String>,
        embedding: Vec<f32>,
        class: QueryClass,
        topic: Topic,
        ttl_seconds: u64,
    ) -> Self {
        let created_at = Utc::now().timestamp();
        Self {
            query: query.into(),
            response: response.into(),
            class,
            topic,
            created_at,
            expires_at: created_at + ttl_seconds as i64,
            embedding,
        }
    }

    /// Content-addressed point id.
    pub fn id(&self) -> u64 {
        hash_query(&self.query)
    }
}

/// A raw nearest-neighbor result from the index, before thresholding.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    /// Point id.
    pub id: u64,
    /// Cosine distance to the query vector (`1 − similarity`).
    pub distance: f32,
    /// Stored query text.
    pub query: String,
    /// Stored answer text.
    pub response: String,
    /// Stored freshness class.
    pub class: QueryClass,
    /// Stored topic partition.
    pub topic: Topic,
    /// Store timestamp.
    pub created_at: i64,
    /// Expiry timestamp.
    pub expires_at: i64,
}

/// A search result that qualified as a cache hit.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedMatch {
    /// Stored query text of the matching entry.
    pub query: String,
    /// Stored answer text.
    pub response: String,
    /// Topic partition of the matching entry.
    pub topic: Topic,
    /// Cosine distance of the match.
    pub distance: f32,
}

impl From<ScoredEntry> for CachedMatch {
    fn from(entry: ScoredEntry) -> Self {
        CachedMatch {
            query: entry.query,
            response: entry.response,
            topic: entry.topic,
            distance: entry.distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_expiry_matches_ttl() {
        let entry = CacheEntry::new(
            "What is DNS?",
            "The phone book of the internet.",
            vec![1.0, 0.0],
            QueryClass::Evergreen,
            Topic::Technology,
            604_800,
        );

        assert_eq!(entry.expires_at - entry.created_at, 604_800);
    }

    #[test]
    fn test_entry_id_is_content_addressed() {
        let a = CacheEntry::new(
            "What is DNS?",
            "first answer",
            vec![1.0],
            QueryClass::Evergreen,
            Topic::Technology,
            300,
        );
        let b = CacheEntry::new(
            " What is DNS? ",
            "second answer",
            vec![0.0],
            QueryClass::TimeSensitive,
            Topic::General,
            300,
        );

        assert_eq!(a.id(), b.id());
    }
}
