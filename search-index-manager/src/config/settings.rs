//! Settings read from the process environment.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use search_index_repository::config::{DEFAULT_DELETE_BATCH_SIZE, DEFAULT_UPSERT_BATCH_SIZE};
use search_index_repository::SearchIndexConfig;

use crate::ManagerError;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Everything the manager needs to connect and operate.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub opensearch_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub search: SearchIndexConfig,
    pub log_format: LogFormat,
}

impl Settings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `OPENSEARCH_USERNAME` / `OPENSEARCH_PASSWORD`: Basic auth credentials (optional)
    /// - `SEARCH_INDEX_UPSERT_BATCH_SIZE`: Documents per bulk upsert (default: 1000)
    /// - `SEARCH_INDEX_DELETE_BATCH_SIZE`: Documents per bulk delete (default: 100)
    /// - `SEARCH_INDEX_SHARDS` / `SEARCH_INDEX_REPLICAS`: Topology of new indices (default: 1 / 1)
    /// - `SEARCH_INDEX_BATCH_TIMEOUT_SECS`: Deadline per bulk batch (optional)
    /// - `SEARCH_INDEX_COPY_TIMEOUT_SECS`: Deadline for the rebuild copy (optional)
    /// - `LOG_FORMAT`: `text` or `json` (default: text)
    ///
    /// # Returns
    ///
    /// * `Err(ManagerError::ConfigError)` - If a value is set but cannot be parsed
    pub fn from_env() -> Result<Self, ManagerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ManagerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SearchIndexConfig::default();

        let mut search = SearchIndexConfig::with_batch_sizes(
            parse_or(&lookup, "SEARCH_INDEX_UPSERT_BATCH_SIZE", DEFAULT_UPSERT_BATCH_SIZE)?,
            parse_or(&lookup, "SEARCH_INDEX_DELETE_BATCH_SIZE", DEFAULT_DELETE_BATCH_SIZE)?,
        )
        .with_topology(
            parse_or(&lookup, "SEARCH_INDEX_SHARDS", defaults.shards)?,
            parse_or(&lookup, "SEARCH_INDEX_REPLICAS", defaults.replicas)?,
        );
        if let Some(secs) = parse::<u64, _>(&lookup, "SEARCH_INDEX_BATCH_TIMEOUT_SECS")? {
            search = search.with_batch_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = parse::<u64, _>(&lookup, "SEARCH_INDEX_COPY_TIMEOUT_SECS")? {
            search = search.with_copy_timeout(Duration::from_secs(secs));
        }
        search
            .validate()
            .map_err(|e| ManagerError::config(e.to_string()))?;

        Ok(Self {
            opensearch_url: lookup("OPENSEARCH_URL")
                .unwrap_or_else(|| DEFAULT_OPENSEARCH_URL.to_string()),
            username: lookup("OPENSEARCH_USERNAME").filter(|v| !v.is_empty()),
            password: lookup("OPENSEARCH_PASSWORD").filter(|v| !v.is_empty()),
            search,
            log_format: parse_or(&lookup, "LOG_FORMAT", LogFormat::default())?,
        })
    }
}

fn parse<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ManagerError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ManagerError::config(format!("{} has invalid value '{}': {}", key, raw, e))),
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ManagerError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    Ok(parse(lookup, key)?.unwrap_or(default))
}
