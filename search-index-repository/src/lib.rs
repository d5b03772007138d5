//! # Search Index Repository
//!
//! This crate manages versioned search indices behind stable logical names
//! and keeps application documents synchronized into them. It includes the
//! engine capability trait, an OpenSearch implementation, alias-based
//! provisioning, batched bulk synchronization, and zero-downtime rebuilds.

pub mod alias;
pub mod client;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod naming;
pub mod opensearch;
pub mod provisioner;
pub mod reindex;
pub mod synchronizer;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use alias::AliasResolver;
pub use client::SearchIndexClient;
pub use config::SearchIndexConfig;
pub use errors::{AggregateError, BulkFailure, EngineError, SearchIndexError};
pub use interfaces::SearchEngineClient;
pub use naming::{versioned_index_name, Clock, SystemClock};
pub use opensearch::{ConnectionConfig, OpenSearchClient};
pub use provisioner::{IndexProvisioner, ProvisionOutcome};
pub use reindex::ReindexOrchestrator;
pub use synchronizer::BulkSynchronizer;
pub use types::{BulkOperationKind, BulkSummary, RebuildReport, RebuildStage};
