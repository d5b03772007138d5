//! Search engine client trait definition.
//!
//! This module defines the abstract interface for the engine operations the
//! index lifecycle needs, allowing for different backend implementations
//! (OpenSearch, in-memory fakes for tests, etc.).

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::EngineError;
use crate::types::{BulkOperation, BulkResponse, CreateIndexRequest};

/// Abstract interface for search engine operations.
///
/// Implementations are constructed once from configuration and shared as
/// `Arc<dyn SearchEngineClient>` by every component.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// All methods return `Result<T, EngineError>`. Callers decide what an
/// engine error means for their operation.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Check if the search engine is healthy and reachable.
    async fn health_check(&self) -> Result<bool, EngineError>;

    /// Whether any index answers to `alias`.
    async fn alias_exists(&self, alias: &str) -> Result<bool, EngineError>;

    /// Whether a concrete index (or alias) named `index` exists.
    async fn index_exists(&self, index: &str) -> Result<bool, EngineError>;

    /// Create a physical index.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the engine acknowledged the creation
    /// * `Err(EngineError::Rejected)` - If the engine refused it (e.g. the name exists)
    async fn create_index(&self, request: &CreateIndexRequest) -> Result<(), EngineError>;

    /// Add `alias` to `index`. Existing bindings of the alias are left in place.
    async fn put_alias(&self, index: &str, alias: &str) -> Result<(), EngineError>;

    /// Move `alias` from `from` to `to` in a single atomic alias update.
    async fn swap_alias(&self, alias: &str, from: &str, to: &str) -> Result<(), EngineError>;

    /// Physical indices bound to `alias`. Empty when the alias does not exist.
    async fn get_alias(&self, alias: &str) -> Result<Vec<String>, EngineError>;

    /// Delete a physical index.
    ///
    /// # Returns
    ///
    /// * `Err(EngineError::NotFound)` - If the index does not exist
    async fn delete_index(&self, index: &str) -> Result<(), EngineError>;

    /// Send one bulk request. Element-level failures are reported in the
    /// response, not as an `Err`.
    async fn bulk(
        &self,
        index: &str,
        operations: &[BulkOperation],
    ) -> Result<BulkResponse, EngineError>;

    /// Index (insert or replace) a single document.
    async fn index_document(&self, index: &str, id: &str, document: &Value)
        -> Result<(), EngineError>;

    /// Partially update an existing document, letting the engine retry
    /// `retry_on_conflict` times on version conflicts.
    ///
    /// # Returns
    ///
    /// * `Err(EngineError::Conflict)` - If conflicts persisted past the retries
    /// * `Err(EngineError::NotFound)` - If the document does not exist
    async fn update_document(
        &self,
        index: &str,
        id: &str,
        document: &Value,
        retry_on_conflict: u32,
    ) -> Result<(), EngineError>;

    /// Delete a single document. A missing document is not an error.
    async fn delete_document(&self, index: &str, id: &str) -> Result<(), EngineError>;

    /// Whether a document with `id` exists in `index`.
    async fn document_exists(&self, index: &str, id: &str) -> Result<bool, EngineError>;

    /// Copy every document of `source` into `dest` on the server, waiting
    /// for completion.
    ///
    /// # Returns
    ///
    /// * `Ok(copied)` - Number of documents written to `dest`
    /// * `Err(EngineError)` - If the engine reported failures
    async fn reindex(&self, source: &str, dest: &str) -> Result<u64, EngineError>;

    /// Run a search request body and return the raw response.
    async fn search(&self, index: &str, body: &Value) -> Result<Value, EngineError>;

    /// Count documents matching a `{"query": ...}` body.
    async fn count(&self, index: &str, body: &Value) -> Result<u64, EngineError>;
}
