//! # Search Index Manager
//!
//! Process wiring for the search index lifecycle: environment
//! configuration, logging setup, and construction of the shared
//! `SearchIndexClient` used by the admin binary.

pub mod config;
pub mod logging;

pub use config::{Dependencies, LogFormat, Settings};

use thiserror::Error;

/// Errors that can occur while starting or running the manager.
#[derive(Error, Debug)]
pub enum ManagerError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Search index error.
    #[error("Search error: {0}")]
    SearchError(#[from] search_index_repository::SearchIndexError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Mapping file could not be parsed.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ManagerError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
