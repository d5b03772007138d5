//! Zero-downtime rebuild.
//!
//! Rebuilding a logical index walks through
//! `Resolving -> Provisioning -> Copying -> Swapping -> Retiring -> Done`.
//! The alias is only touched in `Swapping`, after the copy has finished, and
//! the old index is only deleted after the alias has moved. A failure before
//! `Swapping` completes leaves the old index serving traffic.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::alias::AliasResolver;
use crate::config::SearchIndexConfig;
use crate::errors::{EngineError, SearchIndexError};
use crate::interfaces::SearchEngineClient;
use crate::provisioner::IndexProvisioner;
use crate::types::{RebuildReport, RebuildStage};

/// Rebuilds a logical index into a new physical index.
#[derive(Clone)]
pub struct ReindexOrchestrator {
    client: Arc<dyn SearchEngineClient>,
    aliases: AliasResolver,
    provisioner: IndexProvisioner,
    shards: u32,
    replicas: u32,
    copy_timeout: Option<Duration>,
}

impl ReindexOrchestrator {
    pub fn new(
        client: Arc<dyn SearchEngineClient>,
        provisioner: IndexProvisioner,
        config: &SearchIndexConfig,
    ) -> Self {
        Self {
            aliases: AliasResolver::new(client.clone()),
            client,
            provisioner,
            shards: config.shards,
            replicas: config.replicas,
            copy_timeout: config.copy_timeout,
        }
    }

    /// Rebuild `logical` into a new physical index created with `mapping`.
    ///
    /// # Returns
    ///
    /// * `Ok(RebuildReport)` - The alias now points at the new index. If the
    ///   old index could not be deleted it is named in `stale_index`.
    /// * `Err(SearchIndexError::NotFound)` - If `logical` has no index yet
    /// * `Err(SearchIndexError::IndexProvision)` - If the new index could not be created
    /// * `Err(SearchIndexError::Rebuild)` - If copying or swapping failed. The
    ///   new index is named in `orphaned_index`; the alias still points at the
    ///   old index unless `interrupted` is set on a swap failure
    #[instrument(skip(self, mapping), fields(mapped = mapping.is_some()))]
    pub async fn rebuild(
        &self,
        logical: &str,
        mapping: Option<Value>,
    ) -> Result<RebuildReport, SearchIndexError> {
        stage(logical, RebuildStage::Resolving);
        let old_index = self
            .aliases
            .resolve_physical(logical)
            .await
            .inspect_err(|e| failed(logical, RebuildStage::Resolving, e))?;

        stage(logical, RebuildStage::Provisioning);
        let new_index = self
            .provisioner
            .create_physical(logical, self.shards, self.replicas, mapping)
            .await
            .inspect_err(|e| failed(logical, RebuildStage::Provisioning, e))?;

        stage(logical, RebuildStage::Copying);
        let copied = self
            .copy(&old_index, &new_index)
            .await
            .map_err(|e| stage_error(RebuildStage::Copying, e, &new_index))
            .inspect_err(|e| failed(logical, RebuildStage::Copying, e))?;
        info!(alias = %logical, from = %old_index, to = %new_index, copied, "Documents copied");

        stage(logical, RebuildStage::Swapping);
        self.aliases
            .swap(logical, &old_index, &new_index)
            .await
            .map_err(|e| match e {
                SearchIndexError::Remote(engine) => {
                    stage_error(RebuildStage::Swapping, StageFailure::Engine(engine), &new_index)
                }
                other => other,
            })
            .inspect_err(|e| failed(logical, RebuildStage::Swapping, e))?;

        stage(logical, RebuildStage::Retiring);
        let stale_index = match self.client.delete_index(&old_index).await {
            Ok(()) => None,
            Err(e) => {
                // The alias already serves the new index; moving it back would
                // be a regression, so the old index is only reported.
                warn!(
                    alias = %logical,
                    index = %old_index,
                    error = %e,
                    "Old index could not be deleted and must be removed manually"
                );
                Some(old_index.clone())
            }
        };

        stage(logical, RebuildStage::Done);
        Ok(RebuildReport {
            alias: logical.to_string(),
            old_index,
            new_index,
            stale_index,
        })
    }

    /// Server-side copy, bounded by the configured deadline.
    async fn copy(&self, source: &str, dest: &str) -> Result<u64, StageFailure> {
        let request = self.client.reindex(source, dest);
        match self.copy_timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| StageFailure::TimedOut(limit))?
                .map_err(StageFailure::Engine),
            None => request.await.map_err(StageFailure::Engine),
        }
    }
}

enum StageFailure {
    Engine(EngineError),
    TimedOut(Duration),
}

/// Every failure after `Provisioning` names the stage and the index left behind.
fn stage_error(stage: RebuildStage, error: StageFailure, orphaned: &str) -> SearchIndexError {
    warn!(index = %orphaned, stage = %stage, "Rebuild interrupted; new index is orphaned");
    match error {
        StageFailure::Engine(e) => SearchIndexError::from_rebuild_stage(stage, orphaned, e),
        StageFailure::TimedOut(limit) => SearchIndexError::rebuild(
            stage,
            format!("timed out after {:?}", limit),
            Some(orphaned.to_string()),
        ),
    }
}

fn stage(alias: &str, stage: RebuildStage) {
    info!(alias = %alias, stage = %stage, "Rebuild stage");
}

fn failed(alias: &str, during: RebuildStage, error: &SearchIndexError) {
    error!(
        alias = %alias,
        stage = %RebuildStage::Failed,
        during = %during,
        error = %error,
        "Rebuild failed"
    );
}
