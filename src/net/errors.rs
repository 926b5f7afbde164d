//! Transport-level error types
//!
//! These cover network connectivity only. A transport error carries no
//! ledger-level meaning; classification of status codes happens in the
//! execution layer.

use thiserror::Error;

/// Network-level failures observed while talking to one node
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Per-call deadline fired before a response arrived
    #[error("timeout after {timeout_ms}ms (node: {node})")]
    Timeout { node: String, timeout_ms: u64 },

    /// Connection could not be established or broke mid-call
    #[error("connection error: {message} (node: {node})")]
    Connection { node: String, message: String },

    /// The node answered with bytes this client could not decode
    #[error("malformed response: {message} (node: {node})")]
    Malformed { node: String, message: String },

    /// No node in the pool is currently eligible
    #[error("no healthy nodes available (total: {total})")]
    NoHealthyNodes { total: usize },
}

impl TransportError {
    /// Transport failures are always retryable, up to the attempt ceiling
    pub fn is_retryable(&self) -> bool {
        true
    }

    /// The node this error was observed against, if any
    pub fn node(&self) -> Option<&str> {
        match self {
            TransportError::Timeout { node, .. }
            | TransportError::Connection { node, .. }
            | TransportError::Malformed { node, .. } => Some(node),
            TransportError::NoHealthyNodes { .. } => None,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            TransportError::Timeout { .. } => "timeout",
            TransportError::Connection { .. } => "connection",
            TransportError::Malformed { .. } => "decode",
            TransportError::NoHealthyNodes { .. } => "pool",
        }
    }
}
