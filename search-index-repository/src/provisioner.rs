//! Index provisioning.
//!
//! Creates versioned physical indices and binds them to their logical name.
//! Provisioning is idempotent: a logical name whose alias already exists is
//! left alone.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::alias::AliasResolver;
use crate::errors::SearchIndexError;
use crate::interfaces::SearchEngineClient;
use crate::naming::{versioned_index_name, Clock, SystemClock};
use crate::types::CreateIndexRequest;

/// What `ensure_index` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The alias already existed; nothing was created.
    Existing,
    /// A new physical index was created and bound to the alias.
    Created(String),
}

/// Creates physical indices under generated versioned names.
#[derive(Clone)]
pub struct IndexProvisioner {
    client: Arc<dyn SearchEngineClient>,
    aliases: AliasResolver,
    clock: Arc<dyn Clock>,
}

impl IndexProvisioner {
    /// Create a provisioner that names indices after the wall clock.
    pub fn new(client: Arc<dyn SearchEngineClient>) -> Self {
        Self::with_clock(client, Arc::new(SystemClock))
    }

    /// Create a provisioner with a custom clock.
    pub fn with_clock(client: Arc<dyn SearchEngineClient>, clock: Arc<dyn Clock>) -> Self {
        Self {
            aliases: AliasResolver::new(client.clone()),
            client,
            clock,
        }
    }

    /// A fresh versioned name for `logical`.
    pub fn next_index_name(&self, logical: &str) -> String {
        versioned_index_name(logical, self.clock.now())
    }

    /// Make sure `logical` resolves to a physical index.
    ///
    /// If the alias exists this is a no-op. Otherwise a physical index is
    /// created with `mapping` (or inferred field types when `None`) and the
    /// alias is bound to it once the engine acknowledged the creation.
    ///
    /// The alias check and the binding are separate requests. Calls for the
    /// same `logical` name must not run concurrently: two callers that both
    /// see no alias each create and bind an index, and the name then
    /// resolves to both.
    ///
    /// # Returns
    ///
    /// * `Ok(ProvisionOutcome)` - Whether an index was created
    /// * `Err(SearchIndexError::IndexProvision)` - If creation was rejected; nothing was created
    /// * `Err(SearchIndexError::AliasBind)` - If binding failed. The created index is
    ///   named in the error and left in place unaliased.
    #[instrument(skip(self, mapping), fields(mapped = mapping.is_some()))]
    pub async fn ensure_index(
        &self,
        logical: &str,
        shards: u32,
        replicas: u32,
        mapping: Option<Value>,
    ) -> Result<ProvisionOutcome, SearchIndexError> {
        if self.aliases.alias_exists(logical).await? {
            info!(alias = %logical, "Index already provisioned");
            return Ok(ProvisionOutcome::Existing);
        }

        let physical = self.create_physical(logical, shards, replicas, mapping).await?;

        if let Err(e) = self.client.put_alias(&physical, logical).await {
            warn!(
                alias = %logical,
                index = %physical,
                error = %e,
                "Index created but alias binding failed; index is orphaned"
            );
            return Err(SearchIndexError::alias_bind(logical, &physical, e));
        }

        info!(alias = %logical, index = %physical, "Index provisioned");
        Ok(ProvisionOutcome::Created(physical))
    }

    /// Create a new physical index for `logical` without binding any alias.
    ///
    /// # Returns
    ///
    /// * `Ok(name)` - The generated physical index name
    /// * `Err(SearchIndexError::IndexProvision)` - If the engine rejected the creation
    pub async fn create_physical(
        &self,
        logical: &str,
        shards: u32,
        replicas: u32,
        mapping: Option<Value>,
    ) -> Result<String, SearchIndexError> {
        let request = CreateIndexRequest {
            name: self.next_index_name(logical),
            shards,
            replicas,
            mapping,
        };

        self.client
            .create_index(&request)
            .await
            .map_err(|e| SearchIndexError::from_provision(&request.name, e))?;

        info!(
            alias = %logical,
            index = %request.name,
            shards,
            replicas,
            "Physical index created"
        );
        Ok(request.name)
    }
}
