//! Alias resolution.
//!
//! Callers only ever see logical names. Each logical name is an alias bound
//! to exactly one versioned physical index; this module reads and moves
//! that binding and keeps no state of its own.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::errors::SearchIndexError;
use crate::interfaces::SearchEngineClient;

/// Reads and updates logical-name-to-physical-index bindings.
#[derive(Clone)]
pub struct AliasResolver {
    client: Arc<dyn SearchEngineClient>,
}

impl AliasResolver {
    pub fn new(client: Arc<dyn SearchEngineClient>) -> Self {
        Self { client }
    }

    /// Whether any physical index currently answers to `logical`.
    pub async fn alias_exists(&self, logical: &str) -> Result<bool, SearchIndexError> {
        Ok(self.client.alias_exists(logical).await?)
    }

    /// The physical index bound to `logical`.
    ///
    /// # Returns
    ///
    /// * `Err(SearchIndexError::NotFound)` - If no index is bound
    /// * `Err(SearchIndexError::AmbiguousAlias)` - If several indices are bound
    pub async fn resolve_physical(&self, logical: &str) -> Result<String, SearchIndexError> {
        let mut indices = self.client.get_alias(logical).await?;
        match indices.len() {
            0 => Err(SearchIndexError::not_found(format!(
                "alias {} is not bound to any index",
                logical
            ))),
            1 => Ok(indices.remove(0)),
            _ => Err(SearchIndexError::AmbiguousAlias {
                alias: logical.to_string(),
                indices,
            }),
        }
    }

    /// Bind `logical` to `physical`. A previous binding is not removed.
    #[instrument(skip(self))]
    pub async fn repoint(&self, physical: &str, logical: &str) -> Result<(), SearchIndexError> {
        self.client.put_alias(physical, logical).await?;
        info!(alias = %logical, index = %physical, "Alias bound");
        Ok(())
    }

    /// Move `logical` from `from` to `to` in one atomic alias update, so the
    /// name never resolves to neither or both.
    #[instrument(skip(self))]
    pub async fn swap(&self, logical: &str, from: &str, to: &str) -> Result<(), SearchIndexError> {
        self.client.swap_alias(logical, from, to).await?;
        info!(alias = %logical, from = %from, to = %to, "Alias swapped");
        Ok(())
    }
}
