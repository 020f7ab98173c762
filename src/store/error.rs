use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by vector index operations.
///
/// These never reach an end user: the request path swallows them (a store
/// failure degrades to a cache miss or a skipped write), the startup path
/// propagates them, and the sweeper logs them.
pub enum StoreError {
    /// Could not connect to the vector store endpoint.
    #[error("failed to connect to vector store at '{url}': {message}")]
    ConnectionFailed {
        /// Endpoint URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// Collection creation or lookup failed.
    #[error("failed to ensure collection '{collection}': {message}")]
    EnsureCollectionFailed {
        /// Collection name.
        collection: String,
        /// Error message.
        message: String,
    },

    /// Upsert failed.
    #[error("failed to upsert into '{collection}': {message}")]
    UpsertFailed {
        /// Collection name.
        collection: String,
        /// Error message.
        message: String,
    },

    /// Search failed.
    #[error("failed to search in '{collection}': {message}")]
    SearchFailed {
        /// Collection name.
        collection: String,
        /// Error message.
        message: String,
    },

    /// Count failed.
    #[error("failed to count entries in '{collection}': {message}")]
    CountFailed {
        /// Collection name.
        collection: String,
        /// Error message.
        message: String,
    },

    /// Delete failed.
    #[error("failed to delete from '{collection}': {message}")]
    DeleteFailed {
        /// Collection name.
        collection: String,
        /// Error message.
        message: String,
    },

    /// Vector dimension mismatch.
    #[error("invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },
}
