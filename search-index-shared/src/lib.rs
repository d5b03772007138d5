//! # Search Index Shared
//!
//! Types shared by the search index crates: the identity traits documents
//! implement to be synchronized, and the request/response shapes used by
//! the search passthrough.

mod document;
mod search;

pub use document::{Document, MappedDocument};
pub use search::{
    HighlightOptions, SearchHit, SearchRequest, SearchResponse, DEFAULT_POST_TAG, DEFAULT_PRE_TAG,
};
