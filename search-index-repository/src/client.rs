//! Search index client implementation.
//!
//! This module provides the main client for managing search indices.
//! Application code uses this to provision and rebuild logical indices,
//! push document changes into them, and run searches against them.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, instrument};

use crate::alias::AliasResolver;
use crate::config::SearchIndexConfig;
use crate::errors::{EngineError, SearchIndexError};
use crate::interfaces::SearchEngineClient;
use crate::naming::Clock;
use crate::opensearch::{build_count_body, build_search_body};
use crate::provisioner::{IndexProvisioner, ProvisionOutcome};
use crate::reindex::ReindexOrchestrator;
use crate::synchronizer::BulkSynchronizer;
use crate::types::{BulkSummary, RebuildReport};
use search_index_shared::{Document, MappedDocument, SearchRequest, SearchResponse};

/// The main client for managing logical search indices.
#[derive(Clone)]
pub struct SearchIndexClient {
    client: Arc<dyn SearchEngineClient>,
    config: SearchIndexConfig,
    aliases: AliasResolver,
    provisioner: IndexProvisioner,
    synchronizer: BulkSynchronizer,
    orchestrator: ReindexOrchestrator,
}

impl SearchIndexClient {
    /// Create a new SearchIndexClient with default configuration.
    pub fn new(client: Arc<dyn SearchEngineClient>) -> Self {
        Self::build(client, SearchIndexConfig::default(), None)
    }

    /// Create a new SearchIndexClient with custom configuration.
    ///
    /// # Returns
    ///
    /// * `Err(SearchIndexError::ValidationError)` - If a batch size is zero
    pub fn with_config(
        client: Arc<dyn SearchEngineClient>,
        config: SearchIndexConfig,
    ) -> Result<Self, SearchIndexError> {
        config.validate()?;
        Ok(Self::build(client, config, None))
    }

    /// Use `clock` when naming new physical indices.
    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
        Self::build(self.client, self.config, Some(clock))
    }

    fn build(
        client: Arc<dyn SearchEngineClient>,
        config: SearchIndexConfig,
        clock: Option<Arc<dyn Clock>>,
    ) -> Self {
        let provisioner = match clock {
            Some(clock) => IndexProvisioner::with_clock(client.clone(), clock),
            None => IndexProvisioner::new(client.clone()),
        };
        Self {
            aliases: AliasResolver::new(client.clone()),
            synchronizer: BulkSynchronizer::with_config(client.clone(), &config),
            orchestrator: ReindexOrchestrator::new(client.clone(), provisioner.clone(), &config),
            provisioner,
            client,
            config,
        }
    }

    pub fn config(&self) -> &SearchIndexConfig {
        &self.config
    }

    /// Check whether the engine is reachable and healthy.
    pub async fn health_check(&self) -> Result<bool, SearchIndexError> {
        Ok(self.client.health_check().await?)
    }

    /// Provision `name` with the mapping declared by `T`.
    pub async fn ensure_index<T: MappedDocument>(
        &self,
        name: &str,
    ) -> Result<ProvisionOutcome, SearchIndexError> {
        self.ensure_index_with(name, Some(T::mapping())).await
    }

    /// Provision `name` without a mapping; field types are inferred.
    pub async fn ensure_index_no_mapping(
        &self,
        name: &str,
    ) -> Result<ProvisionOutcome, SearchIndexError> {
        self.ensure_index_with(name, None).await
    }

    /// Provision `name` with the configured topology and an optional mapping.
    pub async fn ensure_index_with(
        &self,
        name: &str,
        mapping: Option<Value>,
    ) -> Result<ProvisionOutcome, SearchIndexError> {
        self.provisioner
            .ensure_index(name, self.config.shards, self.config.replicas, mapping)
            .await
    }

    /// Upsert `documents` in batches of the configured upsert size.
    pub async fn bulk_upsert<T: Document>(
        &self,
        name: &str,
        documents: &[T],
    ) -> Result<BulkSummary, SearchIndexError> {
        self.synchronizer
            .bulk_upsert(name, documents, self.config.upsert_batch_size)
            .await
    }

    pub async fn bulk_upsert_with_batch_size<T: Document>(
        &self,
        name: &str,
        documents: &[T],
        batch_size: usize,
    ) -> Result<BulkSummary, SearchIndexError> {
        self.synchronizer.bulk_upsert(name, documents, batch_size).await
    }

    /// Delete `documents` in batches of the configured delete size.
    pub async fn bulk_delete<T: Document>(
        &self,
        name: &str,
        documents: &[T],
    ) -> Result<BulkSummary, SearchIndexError> {
        self.synchronizer
            .bulk_delete(name, documents, self.config.delete_batch_size)
            .await
    }

    pub async fn bulk_delete_with_batch_size<T: Document>(
        &self,
        name: &str,
        documents: &[T],
        batch_size: usize,
    ) -> Result<BulkSummary, SearchIndexError> {
        self.synchronizer.bulk_delete(name, documents, batch_size).await
    }

    /// Update `document` if it exists, insert it otherwise.
    pub async fn upsert<T: Document>(&self, name: &str, document: &T) -> Result<(), SearchIndexError> {
        self.synchronizer.upsert(name, document).await
    }

    /// Delete a single document. Deleting a missing document succeeds.
    pub async fn delete_document<T: Document>(
        &self,
        name: &str,
        document: &T,
    ) -> Result<(), SearchIndexError> {
        self.synchronizer.delete(name, document).await
    }

    pub async fn delete_document_by_id(&self, name: &str, id: &str) -> Result<(), SearchIndexError> {
        self.synchronizer.delete_by_id(name, id).await
    }

    /// Delete every physical index behind `name`.
    ///
    /// If `name` is not an alias it is deleted as a concrete index.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<String>)` - The physical indices that were deleted
    /// * `Err(SearchIndexError::NotFound)` - If nothing answers to `name`
    #[instrument(skip(self))]
    pub async fn delete_index(&self, name: &str) -> Result<Vec<String>, SearchIndexError> {
        let mut targets = self.client.get_alias(name).await?;
        if targets.is_empty() {
            targets.push(name.to_string());
        }

        for index in &targets {
            self.client
                .delete_index(index)
                .await
                .map_err(|e| missing_index(name, e))?;
            info!(alias = %name, index = %index, "Index deleted");
        }
        Ok(targets)
    }

    /// Zero-downtime rebuild of `name` using the mapping declared by `T`.
    pub async fn rebuild<T: MappedDocument>(&self, name: &str) -> Result<RebuildReport, SearchIndexError> {
        self.orchestrator.rebuild(name, Some(T::mapping())).await
    }

    /// Zero-downtime rebuild of `name` with an optional mapping.
    pub async fn rebuild_with_mapping(
        &self,
        name: &str,
        mapping: Option<Value>,
    ) -> Result<RebuildReport, SearchIndexError> {
        self.orchestrator.rebuild(name, mapping).await
    }

    /// Drop `name` and provision it again empty.
    ///
    /// Unlike `rebuild` the logical name is unresolvable between the two
    /// steps and all documents are lost.
    pub async fn reindex<T: MappedDocument>(
        &self,
        name: &str,
    ) -> Result<ProvisionOutcome, SearchIndexError> {
        self.reindex_with_mapping(name, Some(T::mapping())).await
    }

    pub async fn reindex_with_mapping(
        &self,
        name: &str,
        mapping: Option<Value>,
    ) -> Result<ProvisionOutcome, SearchIndexError> {
        if self.aliases.alias_exists(name).await? {
            self.delete_index(name).await?;
        }
        self.ensure_index_with(name, mapping).await
    }

    /// Run a paginated, optionally highlighted search against `name`.
    #[instrument(skip(self, request), fields(size = request.size, skip = request.skip))]
    pub async fn search<T: DeserializeOwned>(
        &self,
        name: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse<T>, SearchIndexError> {
        let body = build_search_body(request);
        let response = self
            .client
            .search(name, &body)
            .await
            .map_err(|e| missing_index(name, e))?;
        Ok(SearchResponse::from_json(&response)?)
    }

    /// Count documents in `name` matching `query`. A null query counts all.
    pub async fn count(&self, name: &str, query: &Value) -> Result<u64, SearchIndexError> {
        self.client
            .count(name, &build_count_body(query))
            .await
            .map_err(|e| missing_index(name, e))
    }
}

fn missing_index(name: &str, error: EngineError) -> SearchIndexError {
    match error {
        EngineError::NotFound(_) => SearchIndexError::not_found(format!("index {} does not exist", name)),
        other => SearchIndexError::Remote(other),
    }
}
