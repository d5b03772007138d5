//! Per-batch failure reporting for bulk synchronization.

use std::fmt;

use crate::types::BulkOperationKind;

/// A bulk batch that was rejected in whole or in part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    /// Logical index the batch targeted.
    pub index: String,
    pub kind: BulkOperationKind,
    /// Zero-based position of the batch in the partitioned input.
    pub batch: usize,
    /// Number of documents in the batch.
    pub batch_len: usize,
    /// First engine-reported reason for the batch.
    pub reason: String,
    /// IDs of the documents the engine rejected. For a batch that failed as
    /// a whole (transport error, timeout) this is every ID in the batch.
    pub failed_ids: Vec<String>,
}

impl fmt::Display for BulkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bulk {} batch {} on index {} failed ({} of {} documents): {}",
            self.kind,
            self.batch,
            self.index,
            self.failed_ids.len(),
            self.batch_len,
            self.reason
        )
    }
}

/// Every failed batch of a multi-batch bulk call.
///
/// Sibling failures are never dropped: `failures` holds one entry per
/// failing batch, ordered by batch position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateError {
    pub index: String,
    pub kind: BulkOperationKind,
    /// Number of batches dispatched.
    pub total_batches: usize,
    pub failures: Vec<BulkFailure>,
}

impl AggregateError {
    /// Number of batches that completed without errors.
    pub fn succeeded_batches(&self) -> usize {
        self.total_batches - self.failures.len()
    }

    /// Whether some batches went through.
    pub fn is_partial(&self) -> bool {
        self.succeeded_batches() > 0
    }

    /// Positions of the failed batches.
    pub fn failed_batches(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.batch).collect()
    }

    /// IDs of every document that should be retried.
    pub fn failed_ids(&self) -> Vec<String> {
        self.failures
            .iter()
            .flat_map(|f| f.failed_ids.iter().cloned())
            .collect()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} bulk {} batches failed on index {}",
            self.failures.len(),
            self.total_batches,
            self.kind,
            self.index
        )?;
        for failure in &self.failures {
            write!(f, "; batch {}: {}", failure.batch, failure.reason)?;
        }
        Ok(())
    }
}
