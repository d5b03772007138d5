//! In-memory engine used by the unit tests.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::errors::EngineError;
use crate::interfaces::SearchEngineClient;
use crate::naming::Clock;
use crate::types::{BulkItemResult, BulkOperation, BulkOperationKind, BulkResponse, CreateIndexRequest};
use search_index_shared::{Document, MappedDocument};

/// Operations whose connection can be made to drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Operation {
    PutAlias,
    SwapAlias,
    Reindex,
}

/// Every request the engine received, in order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EngineCall {
    AliasExists(String),
    IndexExists(String),
    CreateIndex(CreateIndexRequest),
    PutAlias { index: String, alias: String },
    SwapAlias { alias: String, from: String, to: String },
    GetAlias(String),
    DeleteIndex(String),
    Bulk { index: String, kind: BulkOperationKind, ids: Vec<String> },
    IndexDocument { index: String, id: String },
    UpdateDocument { index: String, id: String, retry_on_conflict: u32 },
    DeleteDocument { index: String, id: String },
    DocumentExists { index: String, id: String },
    Reindex { source: String, dest: String },
    Search { index: String, body: Value },
    Count { index: String },
}

#[derive(Default)]
struct EngineState {
    indices: BTreeMap<String, BTreeMap<String, Value>>,
    aliases: BTreeMap<String, BTreeSet<String>>,
    calls: Vec<EngineCall>,
    /// Resolution of the watched alias after every call.
    snapshots: Vec<Vec<String>>,
    watched_alias: Option<String>,

    transport_down: bool,
    reject_create: bool,
    reject_put_alias: bool,
    reject_swap_alias: bool,
    reject_delete_index: bool,
    reject_reindex: Option<String>,
    reindex_delay: Option<Duration>,
    rejected_documents: HashSet<String>,
    pending_conflicts: HashMap<String, u32>,
    dropped_operations: HashSet<Operation>,
    flag_bulk_errors: bool,
}

impl EngineState {
    fn check_connection(&self, operation: Operation) -> Result<(), EngineError> {
        if self.dropped_operations.contains(&operation) {
            return Err(EngineError::transport("connection reset by peer"));
        }
        Ok(())
    }

    fn record(&mut self, call: EngineCall) {
        self.calls.push(call);
    }

    fn snapshot(&mut self) {
        if let Some(alias) = self.watched_alias.clone() {
            let bound = self
                .aliases
                .get(&alias)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default();
            self.snapshots.push(bound);
        }
    }

    /// Resolve a name the way the engine does for single-index writes.
    fn write_target(&self, name: &str) -> Result<String, EngineError> {
        if let Some(bound) = self.aliases.get(name) {
            return match bound.len() {
                1 => Ok(bound.iter().next().cloned().unwrap_or_default()),
                _ => Err(EngineError::rejected(
                    400,
                    format!("no write index is defined for alias [{}]", name),
                )),
            };
        }
        if self.indices.contains_key(name) {
            return Ok(name.to_string());
        }
        Err(EngineError::NotFound(format!("no such index [{}]", name)))
    }

    fn read_targets(&self, name: &str) -> Result<Vec<String>, EngineError> {
        if let Some(bound) = self.aliases.get(name) {
            return Ok(bound.iter().cloned().collect());
        }
        if self.indices.contains_key(name) {
            return Ok(vec![name.to_string()]);
        }
        Err(EngineError::NotFound(format!("no such index [{}]", name)))
    }
}

/// A single-node engine kept entirely in memory, with failure injection.
#[derive(Default)]
pub(crate) struct InMemoryEngine {
    state: Mutex<EngineState>,
}

impl InMemoryEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Seed a physical index bound to `alias`.
    pub(crate) async fn seed_aliased_index(&self, index: &str, alias: &str) {
        let mut state = self.state.lock().await;
        state.indices.entry(index.to_string()).or_default();
        state
            .aliases
            .entry(alias.to_string())
            .or_default()
            .insert(index.to_string());
    }

    /// Store a document directly, bypassing the call log.
    pub(crate) async fn seed_document(&self, index: &str, id: &str, document: Value) {
        let mut state = self.state.lock().await;
        state
            .indices
            .entry(index.to_string())
            .or_default()
            .insert(id.to_string(), document);
    }

    pub(crate) async fn watch_alias(&self, alias: &str) {
        self.state.lock().await.watched_alias = Some(alias.to_string());
    }

    pub(crate) async fn set_transport_down(&self, down: bool) {
        self.state.lock().await.transport_down = down;
    }

    pub(crate) async fn reject_create(&self) {
        self.state.lock().await.reject_create = true;
    }

    pub(crate) async fn reject_put_alias(&self) {
        self.state.lock().await.reject_put_alias = true;
    }

    pub(crate) async fn reject_swap_alias(&self) {
        self.state.lock().await.reject_swap_alias = true;
    }

    pub(crate) async fn reject_delete_index(&self) {
        self.state.lock().await.reject_delete_index = true;
    }

    pub(crate) async fn reject_reindex(&self, reason: &str) {
        self.state.lock().await.reject_reindex = Some(reason.to_string());
    }

    pub(crate) async fn delay_reindex(&self, delay: Duration) {
        self.state.lock().await.reindex_delay = Some(delay);
    }

    /// Fail `operation` with a transport error after the request was logged.
    pub(crate) async fn drop_connection_on(&self, operation: Operation) {
        self.state.lock().await.dropped_operations.insert(operation);
    }

    /// Set the top-level `errors` flag on bulk responses even when every
    /// item succeeded.
    pub(crate) async fn flag_bulk_errors(&self) {
        self.state.lock().await.flag_bulk_errors = true;
    }

    /// Make bulk items for these document IDs fail.
    pub(crate) async fn reject_documents<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.lock().await;
        state.rejected_documents.extend(ids.into_iter().map(Into::into));
    }

    /// Make the next `count` update attempts of `id` hit a version conflict.
    pub(crate) async fn add_conflicts(&self, id: &str, count: u32) {
        self.state
            .lock()
            .await
            .pending_conflicts
            .insert(id.to_string(), count);
    }

    pub(crate) async fn calls(&self) -> Vec<EngineCall> {
        self.state.lock().await.calls.clone()
    }

    pub(crate) async fn snapshots(&self) -> Vec<Vec<String>> {
        self.state.lock().await.snapshots.clone()
    }

    pub(crate) async fn index_names(&self) -> Vec<String> {
        self.state.lock().await.indices.keys().cloned().collect()
    }

    pub(crate) async fn aliased(&self, alias: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .aliases
            .get(alias)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) async fn documents(&self, index: &str) -> BTreeMap<String, Value> {
        self.state
            .lock()
            .await
            .indices
            .get(index)
            .cloned()
            .unwrap_or_default()
    }

    async fn begin(&self, call: EngineCall) -> Result<tokio::sync::MutexGuard<'_, EngineState>, EngineError> {
        let mut state = self.state.lock().await;
        state.record(call);
        if state.transport_down {
            return Err(EngineError::transport("connection refused"));
        }
        Ok(state)
    }
}

#[async_trait]
impl SearchEngineClient for InMemoryEngine {
    async fn health_check(&self) -> Result<bool, EngineError> {
        let state = self.state.lock().await;
        if state.transport_down {
            return Err(EngineError::transport("connection refused"));
        }
        Ok(true)
    }

    async fn alias_exists(&self, alias: &str) -> Result<bool, EngineError> {
        let mut state = self.begin(EngineCall::AliasExists(alias.to_string())).await?;
        let exists = state.aliases.get(alias).is_some_and(|set| !set.is_empty());
        state.snapshot();
        Ok(exists)
    }

    async fn index_exists(&self, index: &str) -> Result<bool, EngineError> {
        let mut state = self.begin(EngineCall::IndexExists(index.to_string())).await?;
        let exists = state.indices.contains_key(index) || state.aliases.contains_key(index);
        state.snapshot();
        Ok(exists)
    }

    async fn create_index(&self, request: &CreateIndexRequest) -> Result<(), EngineError> {
        let mut state = self.begin(EngineCall::CreateIndex(request.clone())).await?;
        if state.reject_create {
            return Err(EngineError::rejected(400, "illegal_argument_exception"));
        }
        if state.indices.contains_key(&request.name) || state.aliases.contains_key(&request.name) {
            return Err(EngineError::rejected(
                400,
                format!("index [{}] already exists", request.name),
            ));
        }
        state.indices.insert(request.name.clone(), BTreeMap::new());
        state.snapshot();
        Ok(())
    }

    async fn put_alias(&self, index: &str, alias: &str) -> Result<(), EngineError> {
        let mut state = self
            .begin(EngineCall::PutAlias {
                index: index.to_string(),
                alias: alias.to_string(),
            })
            .await?;
        state.check_connection(Operation::PutAlias)?;
        if state.reject_put_alias {
            return Err(EngineError::rejected(400, "invalid_alias_name_exception"));
        }
        if !state.indices.contains_key(index) {
            return Err(EngineError::NotFound(format!("no such index [{}]", index)));
        }
        state
            .aliases
            .entry(alias.to_string())
            .or_default()
            .insert(index.to_string());
        state.snapshot();
        Ok(())
    }

    async fn swap_alias(&self, alias: &str, from: &str, to: &str) -> Result<(), EngineError> {
        let mut state = self
            .begin(EngineCall::SwapAlias {
                alias: alias.to_string(),
                from: from.to_string(),
                to: to.to_string(),
            })
            .await?;
        state.check_connection(Operation::SwapAlias)?;
        if state.reject_swap_alias {
            return Err(EngineError::rejected(400, "aliases_not_found_exception"));
        }
        if !state.indices.contains_key(to) {
            return Err(EngineError::NotFound(format!("no such index [{}]", to)));
        }
        let bound = state.aliases.entry(alias.to_string()).or_default();
        bound.remove(from);
        bound.insert(to.to_string());
        state.snapshot();
        Ok(())
    }

    async fn get_alias(&self, alias: &str) -> Result<Vec<String>, EngineError> {
        let mut state = self.begin(EngineCall::GetAlias(alias.to_string())).await?;
        let bound = state
            .aliases
            .get(alias)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        state.snapshot();
        Ok(bound)
    }

    async fn delete_index(&self, index: &str) -> Result<(), EngineError> {
        let mut state = self.begin(EngineCall::DeleteIndex(index.to_string())).await?;
        if state.reject_delete_index {
            return Err(EngineError::rejected(403, "cluster_block_exception"));
        }
        if state.indices.remove(index).is_none() {
            return Err(EngineError::NotFound(format!("no such index [{}]", index)));
        }
        for bound in state.aliases.values_mut() {
            bound.remove(index);
        }
        state.aliases.retain(|_, bound| !bound.is_empty());
        state.snapshot();
        Ok(())
    }

    async fn bulk(
        &self,
        index: &str,
        operations: &[BulkOperation],
    ) -> Result<BulkResponse, EngineError> {
        let kind = operations
            .first()
            .map(BulkOperation::kind)
            .unwrap_or(BulkOperationKind::Upsert);
        let mut state = self
            .begin(EngineCall::Bulk {
                index: index.to_string(),
                kind,
                ids: operations.iter().map(|op| op.id().to_string()).collect(),
            })
            .await?;
        let target = state.write_target(index)?;

        let mut items = Vec::with_capacity(operations.len());
        for operation in operations {
            let id = operation.id().to_string();
            if state.rejected_documents.contains(&id) {
                items.push(BulkItemResult {
                    id,
                    status: 400,
                    error: Some(format!("document {} rejected", operation.id())),
                });
                continue;
            }
            let docs = state.indices.entry(target.clone()).or_default();
            let status = match operation {
                BulkOperation::Upsert { document, .. } => {
                    match (docs.get_mut(&id), document) {
                        (Some(Value::Object(existing)), Value::Object(partial)) => {
                            for (key, value) in partial {
                                existing.insert(key.clone(), value.clone());
                            }
                            200
                        }
                        _ => {
                            docs.insert(id.clone(), document.clone());
                            201
                        }
                    }
                }
                BulkOperation::Delete { .. } => {
                    if docs.remove(&id).is_some() {
                        200
                    } else {
                        404
                    }
                }
            };
            items.push(BulkItemResult {
                id,
                status,
                error: None,
            });
        }
        state.snapshot();
        let mut response = BulkResponse::from_items(items);
        response.errors |= state.flag_bulk_errors;
        Ok(response)
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        document: &Value,
    ) -> Result<(), EngineError> {
        let mut state = self
            .begin(EngineCall::IndexDocument {
                index: index.to_string(),
                id: id.to_string(),
            })
            .await?;
        let target = state.write_target(index)?;
        state
            .indices
            .entry(target)
            .or_default()
            .insert(id.to_string(), document.clone());
        state.snapshot();
        Ok(())
    }

    async fn update_document(
        &self,
        index: &str,
        id: &str,
        document: &Value,
        retry_on_conflict: u32,
    ) -> Result<(), EngineError> {
        let mut state = self
            .begin(EngineCall::UpdateDocument {
                index: index.to_string(),
                id: id.to_string(),
                retry_on_conflict,
            })
            .await?;
        let target = state.write_target(index)?;

        let attempts = retry_on_conflict + 1;
        let pending = state.pending_conflicts.get(id).copied().unwrap_or(0);
        if pending >= attempts {
            state
                .pending_conflicts
                .insert(id.to_string(), pending - attempts);
            return Err(EngineError::Conflict(format!(
                "[{}]: version conflict, current version is newer",
                id
            )));
        }
        state.pending_conflicts.remove(id);

        let docs = state.indices.entry(target).or_default();
        match (docs.get_mut(id), document) {
            (Some(Value::Object(existing)), Value::Object(partial)) => {
                for (key, value) in partial {
                    existing.insert(key.clone(), value.clone());
                }
            }
            (Some(existing), _) => *existing = document.clone(),
            (None, _) => {
                return Err(EngineError::NotFound(format!("[{}]: document missing", id)));
            }
        }
        state.snapshot();
        Ok(())
    }

    async fn delete_document(&self, index: &str, id: &str) -> Result<(), EngineError> {
        let mut state = self
            .begin(EngineCall::DeleteDocument {
                index: index.to_string(),
                id: id.to_string(),
            })
            .await?;
        let target = state.write_target(index)?;
        if let Some(docs) = state.indices.get_mut(&target) {
            docs.remove(id);
        }
        state.snapshot();
        Ok(())
    }

    async fn document_exists(&self, index: &str, id: &str) -> Result<bool, EngineError> {
        let mut state = self
            .begin(EngineCall::DocumentExists {
                index: index.to_string(),
                id: id.to_string(),
            })
            .await?;
        let targets = state.read_targets(index)?;
        let exists = targets
            .iter()
            .any(|target| state.indices.get(target).is_some_and(|docs| docs.contains_key(id)));
        state.snapshot();
        Ok(exists)
    }

    async fn reindex(&self, source: &str, dest: &str) -> Result<u64, EngineError> {
        let delay = {
            let mut state = self
                .begin(EngineCall::Reindex {
                    source: source.to_string(),
                    dest: dest.to_string(),
                })
                .await?;
            state.check_connection(Operation::Reindex)?;
            state.snapshot();
            state.reindex_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().await;
        if let Some(reason) = state.reject_reindex.clone() {
            return Err(EngineError::rejected(500, reason));
        }
        let mut copied = BTreeMap::new();
        for target in state.read_targets(source)? {
            if let Some(docs) = state.indices.get(&target) {
                copied.extend(docs.clone());
            }
        }
        let count = copied.len() as u64;
        state.indices.entry(dest.to_string()).or_default().extend(copied);
        state.snapshot();
        Ok(count)
    }

    async fn search(&self, index: &str, body: &Value) -> Result<Value, EngineError> {
        let mut state = self
            .begin(EngineCall::Search {
                index: index.to_string(),
                body: body.clone(),
            })
            .await?;
        let mut hits = Vec::new();
        for target in state.read_targets(index)? {
            if let Some(docs) = state.indices.get(&target) {
                for (id, source) in docs {
                    hits.push(json!({ "_id": id, "_score": 1.0, "_source": source }));
                }
            }
        }
        state.snapshot();
        let total = hits.len();
        Ok(json!({ "hits": { "total": { "value": total }, "hits": hits } }))
    }

    async fn count(&self, index: &str, _body: &Value) -> Result<u64, EngineError> {
        let mut state = self
            .begin(EngineCall::Count {
                index: index.to_string(),
            })
            .await?;
        let mut count = 0;
        for target in state.read_targets(index)? {
            count += state.indices.get(&target).map_or(0, |docs| docs.len() as u64);
        }
        state.snapshot();
        Ok(count)
    }
}

/// Clock that advances one second on every read.
pub(crate) struct SteppingClock {
    next: AtomicI64,
}

impl SteppingClock {
    pub(crate) fn starting_at(at: DateTime<Utc>) -> Self {
        Self {
            next: AtomicI64::new(at.timestamp()),
        }
    }
}

impl Default for SteppingClock {
    fn default() -> Self {
        Self::starting_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let seconds = self.next.fetch_add(1, Ordering::SeqCst);
        Utc.timestamp_opt(seconds, 0).unwrap()
    }
}

/// Document used throughout the tests.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Order {
    pub id: String,
    pub customer: String,
    pub total: f64,
}

impl Order {
    pub(crate) fn new(id: impl Into<String>, total: f64) -> Self {
        Self {
            id: id.into(),
            customer: "acme".to_string(),
            total,
        }
    }

    /// `count` orders with IDs `order-0`, `order-1`, ...
    pub(crate) fn many(count: usize) -> Vec<Order> {
        (0..count)
            .map(|i| Order::new(format!("order-{}", i), i as f64))
            .collect()
    }
}

impl Document for Order {
    fn document_id(&self) -> String {
        self.id.clone()
    }
}

impl MappedDocument for Order {
    fn mapping() -> Value {
        json!({
            "properties": {
                "id": { "type": "keyword" },
                "customer": { "type": "keyword" },
                "total": { "type": "double" }
            }
        })
    }
}
