//! Document synchronization.
//!
//! Pushes document changes into a logical index. Bulk calls are split into
//! fixed-size batches; when there is more than one batch, each is sent from
//! its own task and every batch outcome is collected before returning.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use crate::config::SearchIndexConfig;
use crate::errors::{AggregateError, BulkFailure, EngineError, SearchIndexError};
use crate::interfaces::SearchEngineClient;
use crate::types::{BulkOperation, BulkOperationKind, BulkSummary};
use search_index_shared::Document;

/// Batches and dispatches document upserts and deletes.
#[derive(Clone)]
pub struct BulkSynchronizer {
    client: Arc<dyn SearchEngineClient>,
    batch_timeout: Option<Duration>,
    conflict_retries: u32,
}

impl BulkSynchronizer {
    /// Create a synchronizer with default configuration.
    pub fn new(client: Arc<dyn SearchEngineClient>) -> Self {
        Self::with_config(client, &SearchIndexConfig::default())
    }

    /// Create a synchronizer using the timeout and retry settings of `config`.
    pub fn with_config(client: Arc<dyn SearchEngineClient>, config: &SearchIndexConfig) -> Self {
        Self {
            client,
            batch_timeout: config.batch_timeout,
            conflict_retries: config.conflict_retries,
        }
    }

    /// Upsert `documents` into `index` in batches of at most `batch_size`.
    ///
    /// Each document is updated if it exists and inserted otherwise.
    ///
    /// # Returns
    ///
    /// * `Ok(BulkSummary)` - If every batch was accepted
    /// * `Err(SearchIndexError::BulkOperation)` - If the only batch was rejected
    /// * `Err(SearchIndexError::Aggregate)` - If any of several batches was rejected
    #[instrument(skip(self, documents), fields(count = documents.len()))]
    pub async fn bulk_upsert<T: Document>(
        &self,
        index: &str,
        documents: &[T],
        batch_size: usize,
    ) -> Result<BulkSummary, SearchIndexError> {
        let operations = documents
            .iter()
            .map(|document| {
                Ok(BulkOperation::Upsert {
                    id: document.document_id(),
                    document: serde_json::to_value(document)?,
                })
            })
            .collect::<Result<Vec<_>, SearchIndexError>>()?;

        self.dispatch(index, BulkOperationKind::Upsert, operations, batch_size)
            .await
    }

    /// Delete `documents` from `index` in batches of at most `batch_size`.
    ///
    /// Documents that do not exist are not failures.
    #[instrument(skip(self, documents), fields(count = documents.len()))]
    pub async fn bulk_delete<T: Document>(
        &self,
        index: &str,
        documents: &[T],
        batch_size: usize,
    ) -> Result<BulkSummary, SearchIndexError> {
        let operations = documents
            .iter()
            .map(|document| BulkOperation::Delete {
                id: document.document_id(),
            })
            .collect();

        self.dispatch(index, BulkOperationKind::Delete, operations, batch_size)
            .await
    }

    /// Insert `document`, or update it in place if it already exists.
    ///
    /// Updates are retried by the engine on version conflicts up to the
    /// configured number of times.
    ///
    /// # Returns
    ///
    /// * `Err(SearchIndexError::ConflictRetryExhausted)` - If every attempt conflicted
    #[instrument(skip(self, document), fields(doc_id = %document.document_id()))]
    pub async fn upsert<T: Document>(&self, index: &str, document: &T) -> Result<(), SearchIndexError> {
        let id = document.document_id();
        let body = serde_json::to_value(document)?;

        if self.client.document_exists(index, &id).await? {
            match self
                .client
                .update_document(index, &id, &body, self.conflict_retries)
                .await
            {
                Ok(()) => return Ok(()),
                Err(EngineError::Conflict(reason)) => {
                    warn!(index = %index, doc_id = %id, reason = %reason, "Update conflict retries exhausted");
                    return Err(SearchIndexError::ConflictRetryExhausted {
                        index: index.to_string(),
                        id,
                        attempts: self.conflict_retries + 1,
                    });
                }
                // Deleted between the existence check and the update.
                Err(EngineError::NotFound(_)) => {
                    debug!(index = %index, doc_id = %id, "Document vanished before update, inserting");
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.client.index_document(index, &id, &body).await?;
        Ok(())
    }

    /// Delete a single document. A missing document is not an error.
    pub async fn delete<T: Document>(&self, index: &str, document: &T) -> Result<(), SearchIndexError> {
        self.delete_by_id(index, &document.document_id()).await
    }

    /// Delete a single document by ID.
    pub async fn delete_by_id(&self, index: &str, id: &str) -> Result<(), SearchIndexError> {
        self.client.delete_document(index, id).await?;
        Ok(())
    }

    async fn dispatch(
        &self,
        index: &str,
        kind: BulkOperationKind,
        operations: Vec<BulkOperation>,
        batch_size: usize,
    ) -> Result<BulkSummary, SearchIndexError> {
        if batch_size == 0 {
            return Err(SearchIndexError::validation("batch size must be at least 1"));
        }

        let documents = operations.len();
        if documents == 0 {
            return Ok(BulkSummary::default());
        }

        let batches = partition(operations, batch_size);
        let total_batches = batches.len();

        if total_batches == 1 {
            let batch = batches.into_iter().next().unwrap_or_default();
            run_batch(self.client.clone(), index, kind, 0, batch, self.batch_timeout)
                .await
                .map_err(SearchIndexError::BulkOperation)?;
            return Ok(BulkSummary {
                documents,
                batches: 1,
            });
        }

        info!(index = %index, kind = %kind, documents, batches = total_batches, "Dispatching bulk batches");

        let mut tasks = JoinSet::new();
        let mut batch_ids: Vec<Vec<String>> = Vec::with_capacity(total_batches);
        for (position, batch) in batches.into_iter().enumerate() {
            batch_ids.push(batch.iter().map(|op| op.id().to_string()).collect());
            let client = self.client.clone();
            let index = index.to_string();
            let timeout = self.batch_timeout;
            tasks.spawn(async move {
                (position, run_batch(client, &index, kind, position, batch, timeout).await)
            });
        }

        let mut failures = Vec::new();
        let mut finished = vec![false; total_batches];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, result)) => {
                    finished[position] = true;
                    if let Err(failure) = result {
                        failures.push(failure);
                    }
                }
                Err(e) => {
                    error!(index = %index, error = %e, "Bulk batch task failed to complete");
                }
            }
        }

        // A task that panicked never reported back; its whole batch is failed.
        for (position, done) in finished.iter().enumerate() {
            if !done {
                let ids = std::mem::take(&mut batch_ids[position]);
                failures.push(BulkFailure {
                    index: index.to_string(),
                    kind,
                    batch: position,
                    batch_len: ids.len(),
                    reason: "batch task aborted before completion".to_string(),
                    failed_ids: ids,
                });
            }
        }

        if failures.is_empty() {
            info!(index = %index, kind = %kind, documents, batches = total_batches, "Bulk synchronization complete");
            return Ok(BulkSummary {
                documents,
                batches: total_batches,
            });
        }

        failures.sort_by_key(|failure| failure.batch);
        let error = AggregateError {
            index: index.to_string(),
            kind,
            total_batches,
            failures,
        };
        error!(
            index = %index,
            kind = %kind,
            failed_batches = error.failures.len(),
            total_batches,
            "Bulk synchronization finished with failures"
        );
        Err(SearchIndexError::Aggregate(error))
    }
}

/// Split `operations` into consecutive batches of at most `batch_size`,
/// keeping input order.
fn partition(operations: Vec<BulkOperation>, batch_size: usize) -> Vec<Vec<BulkOperation>> {
    let mut batches = Vec::with_capacity(operations.len().div_ceil(batch_size));
    let mut operations = operations.into_iter().peekable();
    while operations.peek().is_some() {
        batches.push(operations.by_ref().take(batch_size).collect());
    }
    batches
}

/// Send one batch and turn any rejection into a `BulkFailure`.
async fn run_batch(
    client: Arc<dyn SearchEngineClient>,
    index: &str,
    kind: BulkOperationKind,
    position: usize,
    batch: Vec<BulkOperation>,
    timeout: Option<Duration>,
) -> Result<(), BulkFailure> {
    let failure = |reason: String, failed_ids: Vec<String>| BulkFailure {
        index: index.to_string(),
        kind,
        batch: position,
        batch_len: batch.len(),
        reason,
        failed_ids,
    };
    let all_ids = || batch.iter().map(|op| op.id().to_string()).collect::<Vec<_>>();

    let request = client.bulk(index, &batch);
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, request).await {
            Ok(result) => result,
            Err(_) => {
                warn!(index = %index, batch = position, "Bulk batch timed out");
                return Err(failure(format!("timed out after {:?}", limit), all_ids()));
            }
        },
        None => request.await,
    };

    match result {
        Ok(response) if !response.has_errors() => {
            debug!(index = %index, batch = position, count = batch.len(), "Bulk batch accepted");
            Ok(())
        }
        Ok(response) => {
            let reason = response
                .first_error()
                .unwrap_or("bulk request reported errors")
                .to_string();
            // Without item-level detail every document in the batch is suspect.
            let mut failed_ids = response.failed_ids();
            if failed_ids.is_empty() {
                failed_ids = all_ids();
            }
            warn!(
                index = %index,
                batch = position,
                failed = failed_ids.len(),
                reason = %reason,
                "Bulk batch had rejected documents"
            );
            Err(failure(reason, failed_ids))
        }
        Err(e) => {
            warn!(index = %index, batch = position, error = %e, "Bulk batch request failed");
            Err(failure(e.to_string(), all_ids()))
        }
    }
}
