//! Error types for the search index repository.

mod bulk_error;
mod engine_error;
mod search_index_error;

pub use bulk_error::{AggregateError, BulkFailure};
pub use engine_error::EngineError;
pub use search_index_error::SearchIndexError;
