//! Engine error types.
//!
//! These are the raw outcomes of talking to the search engine, before the
//! lifecycle layer decides what they mean for the calling operation.

use thiserror::Error;

/// Errors reported by a `SearchEngineClient` implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The request never got an answer (network, TLS, auth handshake, client setup).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The engine answered with a non-success status.
    #[error("Request rejected with status {status}: {reason}")]
    Rejected { status: u16, reason: String },

    /// Optimistic concurrency rejection (HTTP 409).
    #[error("Version conflict: {0}")]
    Conflict(String),

    /// The addressed index, alias or document does not exist (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The engine answered but the body could not be read.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl EngineError {
    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a rejection error.
    pub fn rejected(status: u16, reason: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            reason: reason.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// The engine-reported reason, without the variant prefix.
    pub fn reason(&self) -> &str {
        match self {
            Self::Transport(reason)
            | Self::Conflict(reason)
            | Self::NotFound(reason)
            | Self::Parse(reason) => reason,
            Self::Rejected { reason, .. } => reason,
        }
    }

    /// Whether the failure happened below the engine's API (no answer received).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
