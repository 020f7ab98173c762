//! Vector index trait and the Qdrant-backed implementation.

use std::collections::HashMap;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder,
    DeletePointsBuilder, Distance, FieldType, Filter, PointId, PointStruct, PointsIdsList, Range,
    ScoredPoint, ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};

use crate::classifier::{QueryClass, Topic};

use super::error::StoreError;
use super::model::{CacheEntry, ScoredEntry};

/// Minimal async index interface used by [`super::SemanticStore`] and the
/// sweeper. `now` is threaded explicitly so expiry visibility is testable.
pub trait VectorIndex: Send + Sync {
    /// Ensures the collection (and its payload indexes) exists.
    fn ensure_collection(
        &self,
        name: &str,
        vector_size: u64,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Writes or overwrites the entry at its content-addressed id.
    fn upsert(
        &self,
        collection: &str,
        entry: CacheEntry,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// KNN-1 over unexpired entries, optionally partitioned to a topic.
    fn search(
        &self,
        collection: &str,
        vector: &[f32],
        topic: Option<Topic>,
        now: i64,
    ) -> impl std::future::Future<Output = Result<Option<ScoredEntry>, StoreError>> + Send;

    /// Deletes entries whose expiry has elapsed; returns how many.
    fn purge_expired(
        &self,
        collection: &str,
        now: i64,
    ) -> impl std::future::Future<Output = Result<u64, StoreError>> + Send;

    /// Number of live points in the collection.
    fn entry_count(
        &self,
        collection: &str,
    ) -> impl std::future::Future<Output = Result<u64, StoreError>> + Send;

    /// Deletes up to `excess` entries in ascending `expires_at` order, so
    /// the shortest-lived entries are the preferred eviction victims.
    fn evict_expiring_soonest(
        &self,
        collection: &str,
        excess: u64,
    ) -> impl std::future::Future<Output = Result<u64, StoreError>> + Send;
}

const SCROLL_PAGE: u32 = 256;

/// Qdrant client wrapper implementing [`VectorIndex`].
#[derive(Clone)]
pub struct QdrantIndex {
    client: Qdrant,
    url: String,
}

impl QdrantIndex {
    /// Connects to a Qdrant endpoint.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| StoreError::ConnectionFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Configured endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Performs a basic health check request.
    pub async fn health_check(&self) -> Result<(), StoreError> {
        self.client
            .health_check()
            .await
            .map_err(|e| StoreError::ConnectionFailed {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    fn entry_payload(entry: &CacheEntry) -> HashMap<String, qdrant_client::qdrant::Value> {
        let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
        payload.insert("query".to_string(), entry.query.clone().into());
        payload.insert("response".to_string(), entry.response.clone().into());
        payload.insert("class".to_string(), entry.class.as_str().into());
        payload.insert("topic".to_string(), entry.topic.as_str().into());
        payload.insert("created_at".to_string(), entry.created_at.into());
        payload.insert("expires_at".to_string(), entry.expires_at.into());
        payload
    }

    fn unexpired_filter(topic: Option<Topic>, now: i64) -> Filter {
        let mut conditions = vec![Condition::range(
            "expires_at",
            Range {
                gt: Some(now as f64),
                ..Default::default()
            },
        )];
        if let Some(topic) = topic {
            conditions.push(Condition::matches("topic", topic.as_str().to_string()));
        }
        Filter::must(conditions)
    }

    fn expired_filter(now: i64) -> Filter {
        Filter::must([Condition::range(
            "expires_at",
            Range {
                lte: Some(now as f64),
                ..Default::default()
            },
        )])
    }

    async fn count_with_filter(
        &self,
        collection: &str,
        filter: Option<Filter>,
    ) -> Result<u64, StoreError> {
        let mut builder = CountPointsBuilder::new(collection).exact(true);
        if let Some(filter) = filter {
            builder = builder.filter(filter);
        }

        let response =
            self.client
                .count(builder)
                .await
                .map_err(|e| StoreError::CountFailed {
                    collection: collection.to_string(),
                    message: e.to_string(),
                })?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    async fn delete_ids(&self, collection: &str, ids: Vec<u64>) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }

        let selector = PointsIdsList {
            ids: ids.into_iter().map(|id| id.into()).collect(),
        };

        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(selector)
                    .wait(true),
            )
            .await
            .map_err(|e| StoreError::DeleteFailed {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    /// Scrolls the whole collection collecting `(id, expires_at)` pairs.
    async fn scan_expiries(&self, collection: &str) -> Result<Vec<(u64, i64)>, StoreError> {
        let mut expiries = Vec::new();
        let mut offset: Option<PointId> = None;

        loop {
            let mut builder = ScrollPointsBuilder::new(collection)
                .limit(SCROLL_PAGE)
                .with_payload(true);
            if let Some(offset) = offset.take() {
                builder = builder.offset(offset);
            }

            let response =
                self.client
                    .scroll(builder)
                    .await
                    .map_err(|e| StoreError::SearchFailed {
                        collection: collection.to_string(),
                        message: e.to_string(),
                    })?;

            for point in response.result {
                let id = match point.id.and_then(|pid| pid.point_id_options) {
                    Some(PointIdOptions::Num(n)) => n,
                    _ => continue,
                };
                let expires_at = point
                    .payload
                    .get("expires_at")
                    .and_then(|v| v.as_integer())
                    .unwrap_or(0);
                expiries.push((id, expires_at));
            }

            match response.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(expiries)
    }
}

impl ScoredEntry {
    /// Parses a Qdrant scored point into an entry; `None` when the point is
    /// missing its id or text payload.
    pub fn from_scored_point(point: ScoredPoint) -> Option<Self> {
        let id = match point.id.and_then(|pid| pid.point_id_options) {
            Some(PointIdOptions::Num(n)) => n,
            _ => return None,
        };

        let payload = point.payload;

        let query = payload.get("query").and_then(|v| v.as_str())?.to_string();
        let response = payload.get("response").and_then(|v| v.as_str())?.to_string();

        let class = payload
            .get("class")
            .and_then(|v| v.as_str())
            .map(|tag| QueryClass::from_tag(tag.as_str()))
            .unwrap_or(QueryClass::Evergreen);

        let topic = payload
            .get("topic")
            .and_then(|v| v.as_str())
            .map(|tag| Topic::from_tag(tag.as_str()))
            .unwrap_or(Topic::General);

        let created_at = payload
            .get("created_at")
            .and_then(|v| v.as_integer())
            .unwrap_or(0);

        let expires_at = payload
            .get("expires_at")
            .and_then(|v| v.as_integer())
            .unwrap_or(0);

        Some(ScoredEntry {
            id,
            // Qdrant reports cosine similarity; policy operates on distance.
            distance: 1.0 - point.score,
            query,
            response,
            class,
            topic,
            created_at,
            expires_at,
        })
    }
}

impl VectorIndex for QdrantIndex {
    async fn ensure_collection(&self, name: &str, vector_size: u64) -> Result<(), StoreError> {
        let exists = self.client.collection_exists(name).await.map_err(|e| {
            StoreError::EnsureCollectionFailed {
                collection: name.to_string(),
                message: e.to_string(),
            }
        })?;

        if exists {
            return Ok(());
        }

        let vectors_config = VectorParamsBuilder::new(vector_size, Distance::Cosine);
        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(vectors_config)
                    .on_disk_payload(true),
            )
            .await
            .map_err(|e| StoreError::EnsureCollectionFailed {
                collection: name.to_string(),
                message: e.to_string(),
            })?;

        // Only `topic` is part of the search contract; `expires_at` is
        // indexed for the visibility filter and the sweeper.
        for (field, field_type) in [
            ("topic", FieldType::Keyword),
            ("expires_at", FieldType::Integer),
        ] {
            self.client
                .create_field_index(CreateFieldIndexCollectionBuilder::new(
                    name, field, field_type,
                ))
                .await
                .map_err(|e| StoreError::EnsureCollectionFailed {
                    collection: name.to_string(),
                    message: e.to_string(),
                })?;
        }

        Ok(())
    }

    async fn upsert(&self, collection: &str, entry: CacheEntry) -> Result<(), StoreError> {
        let payload = Self::entry_payload(&entry);
        let point = PointStruct::new(entry.id(), entry.embedding, payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, vec![point]).wait(true))
            .await
            .map_err(|e| StoreError::UpsertFailed {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        topic: Option<Topic>,
        now: i64,
    ) -> Result<Option<ScoredEntry>, StoreError> {
        let search = SearchPointsBuilder::new(collection, vector.to_vec(), 1)
            .with_payload(true)
            .filter(Self::unexpired_filter(topic, now));

        let response =
            self.client
                .search_points(search)
                .await
                .map_err(|e| StoreError::SearchFailed {
                    collection: collection.to_string(),
                    message: e.to_string(),
                })?;

        Ok(response
            .result
            .into_iter()
            .next()
            .and_then(ScoredEntry::from_scored_point))
    }

    async fn purge_expired(&self, collection: &str, now: i64) -> Result<u64, StoreError> {
        let filter = Self::expired_filter(now);
        let expired = self
            .count_with_filter(collection, Some(filter.clone()))
            .await?;
        if expired == 0 {
            return Ok(0);
        }

        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(filter)
                    .wait(true),
            )
            .await
            .map_err(|e| StoreError::DeleteFailed {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;

        Ok(expired)
    }

    async fn entry_count(&self, collection: &str) -> Result<u64, StoreError> {
        self.count_with_filter(collection, None).await
    }

    async fn evict_expiring_soonest(
        &self,
        collection: &str,
        excess: u64,
    ) -> Result<u64, StoreError> {
        if excess == 0 {
            return Ok(0);
        }

        let mut expiries = self.scan_expiries(collection).await?;
        expiries.sort_by_key(|&(_, expires_at)| expires_at);

        let victims: Vec<u64> = expiries
            .into_iter()
            .take(excess as usize)
            .map(|(id, _)| id)
            .collect();
        let evicted = victims.len() as u64;

        self.delete_ids(collection, victims).await?;
        Ok(evicted)
    }
}
