//! Document identity traits.

use serde::Serialize;
use serde_json::Value;

/// A record that can be written to a search index.
///
/// The value returned by `document_id` becomes the engine's `_id`, so two
/// documents with the same identity overwrite each other.
pub trait Document: Serialize + Send + Sync {
    /// The engine document ID for this record.
    fn document_id(&self) -> String;
}

/// A document type that knows its own index mapping.
///
/// Used when an index is provisioned or rebuilt for a specific document
/// shape instead of relying on inferred field types.
pub trait MappedDocument: Document {
    /// The `mappings` object to apply when the index is created,
    /// e.g. `{"properties": {"name": {"type": "text"}}}`.
    fn mapping() -> Value;
}
