//! Dependency initialization and wiring for the search index manager.

use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::ManagerError;
use search_index_repository::{ConnectionConfig, OpenSearchClient, SearchIndexClient};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The client every command runs through.
    pub client: SearchIndexClient,
}

impl Dependencies {
    /// Connect to OpenSearch and build the index client.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(ManagerError)` - If the client cannot be built or the cluster is unhealthy
    pub async fn new(settings: &Settings) -> Result<Self, ManagerError> {
        info!(
            opensearch_url = %settings.opensearch_url,
            authenticated = settings.username.is_some(),
            upsert_batch_size = settings.search.upsert_batch_size,
            delete_batch_size = settings.search.delete_batch_size,
            "Initializing dependencies"
        );

        let mut connection = ConnectionConfig::new(&settings.opensearch_url);
        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            connection = connection.with_basic_auth(username, password);
        }

        let search_client = OpenSearchClient::new(connection)
            .map_err(|e| ManagerError::config(format!("Failed to create OpenSearch client: {}", e)))?;

        let client = SearchIndexClient::with_config(Arc::new(search_client), settings.search.clone())?;

        // Verify OpenSearch is reachable
        let healthy = client
            .health_check()
            .await
            .map_err(|e| ManagerError::config(format!("OpenSearch health check failed: {}", e)))?;

        if !healthy {
            return Err(ManagerError::config("OpenSearch cluster is unhealthy"));
        }

        info!("OpenSearch connection verified");

        Ok(Self { client })
    }
}
