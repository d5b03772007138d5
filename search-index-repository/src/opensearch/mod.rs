//! OpenSearch implementation of the search engine client.
//!
//! This module provides a concrete implementation of `SearchEngineClient`
//! using OpenSearch as the backend.

mod client;
mod index_config;
mod queries;

pub use client::{ConnectionConfig, OpenSearchClient};
pub use index_config::{index_settings_body, MAX_RESULT_WINDOW};
pub use queries::{build_count_body, build_search_body};
