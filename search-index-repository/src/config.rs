//! Configuration types for the SearchIndexClient.

use std::time::Duration;

use crate::errors::SearchIndexError;

/// Default number of documents per bulk upsert request.
pub const DEFAULT_UPSERT_BATCH_SIZE: usize = 1000;

/// Default number of documents per bulk delete request.
pub const DEFAULT_DELETE_BATCH_SIZE: usize = 100;

/// Default number of engine-side retries on a version conflict.
pub const DEFAULT_CONFLICT_RETRIES: u32 = 3;

/// Configuration for the SearchIndexClient.
///
/// Only bulk batches (`batch_timeout`) and the rebuild copy (`copy_timeout`)
/// carry their own deadline. Provisioning, alias swaps, retiring the old
/// index and single-document calls run until the engine answers; bound them
/// by wrapping the call in `tokio::time::timeout` or dropping its future.
/// Dropping a rebuild mid-way never leaves the alias half-swapped, since the
/// swap is a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchIndexConfig {
    /// Maximum number of documents in one bulk upsert request.
    pub upsert_batch_size: usize,
    /// Maximum number of documents in one bulk delete request.
    pub delete_batch_size: usize,
    /// Primary shards for newly provisioned indices.
    pub shards: u32,
    /// Replicas for newly provisioned indices.
    pub replicas: u32,
    /// Retries on version conflict for single-document updates.
    pub conflict_retries: u32,
    /// Deadline for each bulk batch. None waits indefinitely.
    pub batch_timeout: Option<Duration>,
    /// Deadline for the server-side copy of a rebuild. None waits indefinitely.
    pub copy_timeout: Option<Duration>,
}

impl Default for SearchIndexConfig {
    fn default() -> Self {
        Self {
            upsert_batch_size: DEFAULT_UPSERT_BATCH_SIZE,
            delete_batch_size: DEFAULT_DELETE_BATCH_SIZE,
            shards: 1,
            replicas: 1,
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
            batch_timeout: None,
            copy_timeout: None,
        }
    }
}

impl SearchIndexConfig {
    /// Create a config with custom bulk batch sizes.
    pub fn with_batch_sizes(upsert_batch_size: usize, delete_batch_size: usize) -> Self {
        Self {
            upsert_batch_size,
            delete_batch_size,
            ..Self::default()
        }
    }

    /// Set the shard and replica counts used for new indices.
    pub fn with_topology(mut self, shards: u32, replicas: u32) -> Self {
        self.shards = shards;
        self.replicas = replicas;
        self
    }

    /// Set the per-batch deadline.
    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = Some(timeout);
        self
    }

    /// Set the rebuild copy deadline.
    pub fn with_copy_timeout(mut self, timeout: Duration) -> Self {
        self.copy_timeout = Some(timeout);
        self
    }

    /// Reject configurations no operation could run with.
    pub fn validate(&self) -> Result<(), SearchIndexError> {
        if self.upsert_batch_size == 0 {
            return Err(SearchIndexError::validation("upsert_batch_size must be at least 1"));
        }
        if self.delete_batch_size == 0 {
            return Err(SearchIndexError::validation("delete_batch_size must be at least 1"));
        }
        if self.shards == 0 {
            return Err(SearchIndexError::validation("shards must be at least 1"));
        }
        Ok(())
    }
}
