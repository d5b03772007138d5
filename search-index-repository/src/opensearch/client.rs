//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchEngineClient`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    auth::Credentials,
    cluster::ClusterHealthParts,
    http::request::JsonBody,
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{
        IndicesCreateParts, IndicesDeleteParts, IndicesExistsAliasParts, IndicesExistsParts,
        IndicesGetAliasParts, IndicesPutAliasParts,
    },
    BulkParts, CountParts, DeleteParts, ExistsParts, IndexParts, OpenSearch, SearchParts,
    UpdateParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::errors::EngineError;
use crate::interfaces::SearchEngineClient;
use crate::opensearch::index_config::index_settings_body;
use crate::types::{BulkItemResult, BulkOperation, BulkResponse, CreateIndexRequest};

/// Connection settings for `OpenSearchClient`.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// The OpenSearch server URL (e.g., "http://localhost:9200").
    pub url: String,
    /// Basic auth username.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
}

impl ConnectionConfig {
    /// Unauthenticated connection to `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    /// Authenticate with basic auth.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

/// OpenSearch client implementation.
///
/// One instance is built at startup and shared by every component through
/// `Arc<dyn SearchEngineClient>`.
///
/// # Example
///
/// ```ignore
/// let client = OpenSearchClient::new(ConnectionConfig::new("http://localhost:9200"))?;
/// let client: Arc<dyn SearchEngineClient> = Arc::new(client);
/// let index = SearchIndexClient::new(client);
/// index.ensure_index_no_mapping("orders").await?;
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client connected to the configured URL.
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(EngineError::Transport)` - If the URL or transport setup is invalid
    pub fn new(config: ConnectionConfig) -> Result<Self, EngineError> {
        let parsed_url = Url::parse(&config.url).map_err(|e| EngineError::transport(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let mut builder = TransportBuilder::new(conn_pool).disable_proxy();
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.auth(Credentials::Basic(username.clone(), password.clone()));
        }
        let transport = builder
            .build()
            .map_err(|e| EngineError::transport(e.to_string()))?;

        info!(
            url = %config.url,
            authenticated = config.username.is_some(),
            "Created OpenSearch client"
        );

        Ok(Self {
            client: OpenSearch::new(transport),
        })
    }

    /// Turn a response into its JSON body, mapping failure statuses.
    async fn read_json(response: Response) -> Result<Value, EngineError> {
        let status = response.status_code();
        if status.is_success() {
            return response
                .json::<Value>()
                .await
                .map_err(|e| EngineError::parse(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|value| error_reason(&value))
            .unwrap_or(body);

        error!(status = %status, reason = %reason, "OpenSearch request failed");

        Err(match status.as_u16() {
            404 => EngineError::NotFound(reason),
            409 => EngineError::Conflict(reason),
            code => EngineError::rejected(code, reason),
        })
    }

    /// Interpret a HEAD response: 200 exists, 404 missing.
    fn read_exists(response: &Response) -> Result<bool, EngineError> {
        let status = response.status_code();
        match status.as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            code => Err(EngineError::rejected(
                code,
                format!("existence check returned status {}", status),
            )),
        }
    }

    /// Fail on responses that carry `"acknowledged": false`.
    fn require_acknowledged(body: &Value, action: &str) -> Result<(), EngineError> {
        if body["acknowledged"].as_bool() == Some(false) {
            return Err(EngineError::rejected(
                200,
                format!("{} was not acknowledged", action),
            ));
        }
        Ok(())
    }
}

/// Extract `error.reason` from an error body, falling back to `error.type`
/// or a string `error`.
fn error_reason(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    if let Some(reason) = error.as_str() {
        return Some(reason.to_string());
    }
    error
        .get("reason")
        .or_else(|| error.get("type"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Serialize bulk operations into NDJSON lines.
///
/// Upserts are sent as partial updates with `doc_as_upsert`, so a document
/// that does not exist yet is inserted.
fn bulk_body(operations: &[BulkOperation]) -> Vec<JsonBody<Value>> {
    let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(operations.len() * 2);
    for operation in operations {
        match operation {
            BulkOperation::Upsert { id, document } => {
                body.push(json!({ "update": { "_id": id } }).into());
                body.push(json!({ "doc": document, "doc_as_upsert": true }).into());
            }
            BulkOperation::Delete { id } => {
                body.push(json!({ "delete": { "_id": id } }).into());
            }
        }
    }
    body
}

/// Parse a bulk response body, one item per operation.
///
/// A body without an `items` array, or with a different number of items
/// than `expected`, is a parse error.
fn parse_bulk_response(body: &Value, expected: usize) -> Result<BulkResponse, EngineError> {
    let raw_items = body["items"]
        .as_array()
        .ok_or_else(|| EngineError::parse("bulk response has no items array"))?;

    let items: Vec<BulkItemResult> = raw_items
        .iter()
        .filter_map(|item| item.as_object()?.values().next())
        .map(|result| BulkItemResult {
            id: result["_id"].as_str().unwrap_or_default().to_string(),
            status: result["status"].as_u64().unwrap_or(0) as u16,
            error: result.get("error").map(|error| {
                error_reason(&json!({ "error": error })).unwrap_or_else(|| error.to_string())
            }),
        })
        .collect();

    if items.len() != expected {
        return Err(EngineError::parse(format!(
            "bulk response has {} items for {} operations",
            items.len(),
            expected
        )));
    }

    Ok(BulkResponse {
        errors: body["errors"].as_bool().unwrap_or(false),
        items,
    })
}

/// Number of documents written by a reindex, or the first reported failure.
fn parse_reindex_response(body: &Value) -> Result<u64, EngineError> {
    if let Some(failure) = body["failures"].as_array().and_then(|f| f.first()) {
        let status = failure["status"].as_u64().unwrap_or(500) as u16;
        let reason = failure["cause"]["reason"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| failure.to_string());
        return Err(EngineError::rejected(status, reason));
    }
    if body["timed_out"].as_bool() == Some(true) {
        return Err(EngineError::rejected(504, "reindex timed out on the server"));
    }

    let created = body["created"].as_u64().unwrap_or(0);
    let updated = body["updated"].as_u64().unwrap_or(0);
    Ok(created + updated)
}

#[async_trait]
impl SearchEngineClient for OpenSearchClient {
    async fn health_check(&self) -> Result<bool, EngineError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| EngineError::transport(e.to_string()))?;

        let health = Self::read_json(response).await?;
        let status = health["status"].as_str().unwrap_or("unknown");
        debug!(status = %status, "OpenSearch cluster health");

        Ok(status == "green" || status == "yellow")
    }

    async fn alias_exists(&self, alias: &str) -> Result<bool, EngineError> {
        let response = self
            .client
            .indices()
            .exists_alias(IndicesExistsAliasParts::Name(&[alias]))
            .send()
            .await
            .map_err(|e| EngineError::transport(e.to_string()))?;

        Self::read_exists(&response)
    }

    async fn index_exists(&self, index: &str) -> Result<bool, EngineError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| EngineError::transport(e.to_string()))?;

        Self::read_exists(&response)
    }

    #[instrument(skip(self, request), fields(index = %request.name))]
    async fn create_index(&self, request: &CreateIndexRequest) -> Result<(), EngineError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&request.name))
            .body(index_settings_body(request))
            .send()
            .await
            .map_err(|e| EngineError::transport(e.to_string()))?;

        let body = Self::read_json(response).await?;
        Self::require_acknowledged(&body, "index creation")
    }

    async fn put_alias(&self, index: &str, alias: &str) -> Result<(), EngineError> {
        let response = self
            .client
            .indices()
            .put_alias(IndicesPutAliasParts::IndexName(&[index], alias))
            .send()
            .await
            .map_err(|e| EngineError::transport(e.to_string()))?;

        let body = Self::read_json(response).await?;
        Self::require_acknowledged(&body, "alias binding")
    }

    async fn swap_alias(&self, alias: &str, from: &str, to: &str) -> Result<(), EngineError> {
        let response = self
            .client
            .indices()
            .update_aliases()
            .body(json!({
                "actions": [
                    { "remove": { "index": from, "alias": alias } },
                    { "add": { "index": to, "alias": alias } }
                ]
            }))
            .send()
            .await
            .map_err(|e| EngineError::transport(e.to_string()))?;

        let body = Self::read_json(response).await?;
        Self::require_acknowledged(&body, "alias swap")
    }

    async fn get_alias(&self, alias: &str) -> Result<Vec<String>, EngineError> {
        let response = self
            .client
            .indices()
            .get_alias(IndicesGetAliasParts::Name(&[alias]))
            .send()
            .await
            .map_err(|e| EngineError::transport(e.to_string()))?;

        // The response is keyed by physical index name.
        match Self::read_json(response).await {
            Ok(body) => Ok(body
                .as_object()
                .map(|indices| {
                    let mut names: Vec<String> = indices.keys().cloned().collect();
                    names.sort();
                    names
                })
                .unwrap_or_default()),
            Err(EngineError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn delete_index(&self, index: &str) -> Result<(), EngineError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| EngineError::transport(e.to_string()))?;

        let body = Self::read_json(response).await?;
        Self::require_acknowledged(&body, "index deletion")
    }

    #[instrument(skip(self, operations), fields(count = operations.len()))]
    async fn bulk(
        &self,
        index: &str,
        operations: &[BulkOperation],
    ) -> Result<BulkResponse, EngineError> {
        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(bulk_body(operations))
            .send()
            .await
            .map_err(|e| EngineError::transport(e.to_string()))?;

        let body = Self::read_json(response).await?;
        parse_bulk_response(&body, operations.len())
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        document: &Value,
    ) -> Result<(), EngineError> {
        let response = self
            .client
            .index(IndexParts::IndexId(index, id))
            .body(document)
            .send()
            .await
            .map_err(|e| EngineError::transport(e.to_string()))?;

        Self::read_json(response).await?;
        debug!(index = %index, doc_id = %id, "Document indexed");
        Ok(())
    }

    async fn update_document(
        &self,
        index: &str,
        id: &str,
        document: &Value,
        retry_on_conflict: u32,
    ) -> Result<(), EngineError> {
        let response = self
            .client
            .update(UpdateParts::IndexId(index, id))
            .retry_on_conflict(i64::from(retry_on_conflict))
            .body(json!({ "doc": document }))
            .send()
            .await
            .map_err(|e| EngineError::transport(e.to_string()))?;

        Self::read_json(response).await?;
        debug!(index = %index, doc_id = %id, "Document updated");
        Ok(())
    }

    async fn delete_document(&self, index: &str, id: &str) -> Result<(), EngineError> {
        let response = self
            .client
            .delete(DeleteParts::IndexId(index, id))
            .send()
            .await
            .map_err(|e| EngineError::transport(e.to_string()))?;

        // 404 is acceptable - document may not exist
        match Self::read_json(response).await {
            Ok(_) | Err(EngineError::NotFound(_)) => {
                debug!(index = %index, doc_id = %id, "Document deleted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn document_exists(&self, index: &str, id: &str) -> Result<bool, EngineError> {
        let response = self
            .client
            .exists(ExistsParts::IndexId(index, id))
            .send()
            .await
            .map_err(|e| EngineError::transport(e.to_string()))?;

        Self::read_exists(&response)
    }

    #[instrument(skip(self))]
    async fn reindex(&self, source: &str, dest: &str) -> Result<u64, EngineError> {
        let response = self
            .client
            .reindex()
            .wait_for_completion(true)
            .refresh(true)
            .body(json!({
                "source": { "index": source },
                "dest": { "index": dest }
            }))
            .send()
            .await
            .map_err(|e| EngineError::transport(e.to_string()))?;

        let body = Self::read_json(response).await?;
        parse_reindex_response(&body)
    }

    async fn search(&self, index: &str, body: &Value) -> Result<Value, EngineError> {
        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .body(body)
            .send()
            .await
            .map_err(|e| EngineError::transport(e.to_string()))?;

        Self::read_json(response).await
    }

    async fn count(&self, index: &str, body: &Value) -> Result<u64, EngineError> {
        let response = self
            .client
            .count(CountParts::Index(&[index]))
            .body(body)
            .send()
            .await
            .map_err(|e| EngineError::transport(e.to_string()))?;

        let body = Self::read_json(response).await?;
        body["count"]
            .as_u64()
            .ok_or_else(|| EngineError::parse("count response has no count field"))
    }
}
