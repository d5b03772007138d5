//! Search index error types.
//!
//! This module defines the errors surfaced by the index lifecycle and
//! synchronization operations.

use thiserror::Error;

use crate::errors::{AggregateError, BulkFailure, EngineError};
use crate::types::RebuildStage;

/// Errors that can occur during search index operations.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Index creation was rejected by the engine. Nothing was created.
    #[error("Failed to provision index {index}: {reason}")]
    IndexProvision { index: String, reason: String },

    /// The physical index was created but binding the alias to it failed.
    /// `index` is left in place, unaliased, for the caller to clean up.
    /// `interrupted` means the engine never answered, so the binding may
    /// have been applied anyway.
    #[error("Index {index} was created but binding alias {alias} failed: {reason}")]
    AliasBind {
        alias: String,
        index: String,
        reason: String,
        interrupted: bool,
    },

    /// A single bulk batch was rejected.
    #[error("Bulk operation error: {0}")]
    BulkOperation(BulkFailure),

    /// One or more batches of a multi-batch bulk call were rejected.
    #[error("Bulk operation errors: {0}")]
    Aggregate(AggregateError),

    /// A required alias, index or document does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A single-document update kept hitting version conflicts.
    #[error("Update of document {id} in {index} gave up after {attempts} conflicting attempts")]
    ConflictRetryExhausted {
        index: String,
        id: String,
        attempts: u32,
    },

    /// An alias that must name one index resolved to several.
    #[error("Alias {alias} resolves to more than one index: {indices:?}")]
    AmbiguousAlias { alias: String, indices: Vec<String> },

    /// A rebuild failed after its new index was created; `orphaned_index`
    /// is left for the caller. Unless `interrupted` is set the alias still
    /// points at the original index. An interrupted swap may or may not
    /// have moved it.
    #[error("Rebuild failed while {stage}: {reason}")]
    Rebuild {
        stage: RebuildStage,
        reason: String,
        orphaned_index: Option<String>,
        interrupted: bool,
    },

    /// Validation error (e.g., invalid batch size).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A document or response could not be (de)serialized.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Transport or engine error passed through unchanged.
    #[error("Remote error: {0}")]
    Remote(#[from] EngineError),
}

impl SearchIndexError {
    /// Create an index provisioning error.
    pub fn provision(index: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IndexProvision {
            index: index.into(),
            reason: reason.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Create a rebuild error for the given stage.
    pub fn rebuild(
        stage: RebuildStage,
        reason: impl Into<String>,
        orphaned_index: Option<String>,
    ) -> Self {
        Self::Rebuild {
            stage,
            reason: reason.into(),
            orphaned_index,
            interrupted: false,
        }
    }

    /// Map an engine error from a rebuild stage that ran after `orphaned`
    /// was created. Transport failures keep the orphan and are marked
    /// interrupted.
    pub fn from_rebuild_stage(stage: RebuildStage, orphaned: &str, error: EngineError) -> Self {
        Self::Rebuild {
            stage,
            interrupted: error.is_transport(),
            reason: error.reason().to_string(),
            orphaned_index: Some(orphaned.to_string()),
        }
    }

    /// Map an engine error from binding `alias` to the freshly created `index`.
    pub fn alias_bind(alias: &str, index: &str, error: EngineError) -> Self {
        Self::AliasBind {
            alias: alias.to_string(),
            index: index.to_string(),
            interrupted: error.is_transport(),
            reason: error.reason().to_string(),
        }
    }

    /// Map an engine error from creating `index`.
    ///
    /// Transport failures pass through as `Remote`; anything the engine
    /// actually answered becomes `IndexProvision`.
    pub fn from_provision(index: &str, error: EngineError) -> Self {
        if error.is_transport() {
            Self::Remote(error)
        } else {
            Self::provision(index, error.reason())
        }
    }
}

impl From<serde_json::Error> for SearchIndexError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
