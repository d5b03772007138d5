//! Request and response types for search index operations.

use std::fmt;

use serde_json::Value;

/// The kind of operation a bulk batch carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BulkOperationKind {
    /// Update the document, inserting it if it does not exist yet.
    Upsert,
    Delete,
}

impl fmt::Display for BulkOperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upsert => write!(f, "upsert"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// One entry of a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperation {
    Upsert { id: String, document: Value },
    Delete { id: String },
}

impl BulkOperation {
    /// The target document ID.
    pub fn id(&self) -> &str {
        match self {
            Self::Upsert { id, .. } | Self::Delete { id } => id,
        }
    }

    pub fn kind(&self) -> BulkOperationKind {
        match self {
            Self::Upsert { .. } => BulkOperationKind::Upsert,
            Self::Delete { .. } => BulkOperationKind::Delete,
        }
    }
}

/// Outcome of one entry of a bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemResult {
    pub id: String,
    pub status: u16,
    /// Engine-reported reason when the item was rejected.
    pub error: Option<String>,
}

impl BulkItemResult {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Parsed response of a bulk request, one item per operation in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkResponse {
    /// The engine's top-level `errors` flag.
    pub errors: bool,
    pub items: Vec<BulkItemResult>,
}

impl BulkResponse {
    /// Build a response whose `errors` flag follows its items.
    pub fn from_items(items: Vec<BulkItemResult>) -> Self {
        Self {
            errors: items.iter().any(BulkItemResult::is_error),
            items,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors || self.items.iter().any(BulkItemResult::is_error)
    }

    /// IDs of the rejected items.
    pub fn failed_ids(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|item| item.is_error())
            .map(|item| item.id.clone())
            .collect()
    }

    /// The first rejection reason, if any.
    pub fn first_error(&self) -> Option<&str> {
        self.items.iter().find_map(|item| item.error.as_deref())
    }
}

/// Result of a fully successful bulk synchronization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkSummary {
    /// Number of documents sent.
    pub documents: usize,
    /// Number of bulk requests dispatched.
    pub batches: usize,
}

/// Parameters for creating a physical index.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndexRequest {
    /// Physical (versioned) index name.
    pub name: String,
    pub shards: u32,
    pub replicas: u32,
    /// Explicit `mappings` object; `None` lets the engine infer field types.
    pub mapping: Option<Value>,
}

/// Stages of a zero-downtime rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildStage {
    Resolving,
    Provisioning,
    Copying,
    Swapping,
    Retiring,
    Done,
    Failed,
}

impl fmt::Display for RebuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolving => "resolving",
            Self::Provisioning => "provisioning",
            Self::Copying => "copying",
            Self::Swapping => "swapping",
            Self::Retiring => "retiring",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of a successful rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildReport {
    /// The logical name that was rebuilt.
    pub alias: String,
    /// The physical index that served the alias before the rebuild.
    pub old_index: String,
    /// The physical index the alias points at now.
    pub new_index: String,
    /// Set when the old index could not be deleted. The rebuild still
    /// succeeded; the named index has to be removed by hand.
    pub stale_index: Option<String>,
}
