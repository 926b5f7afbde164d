//! Error types for transaction building
//!
//! Build errors are local precondition violations: they are never retried and
//! always surface immediately as programming or configuration errors, before
//! any network call is made.

use thiserror::Error;

/// Errors raised while assembling, chunking, or signing a transaction
#[derive(Error, Debug)]
pub enum BuildError {
    /// Payload would require more chunks than the configured ceiling.
    ///
    /// Checked at plan time, strictly before any dispatch attempt.
    #[error(
        "message of {size} bytes needs {required} chunks (chunk size {chunk_size}), \
         exceeding the ceiling of {max_chunks}"
    )]
    MessageTooLong {
        size: usize,
        chunk_size: usize,
        required: usize,
        max_chunks: usize,
    },

    /// Operation attempted in the wrong builder/frozen lifecycle state.
    ///
    /// Post-freeze mutation is already a compile error (freezing consumes the
    /// builder); this covers the runtime misuses moves cannot catch, such as
    /// assembling an envelope before any signature was added.
    #[error("frozen-state violation: {0}")]
    FrozenState(String),

    /// A required field was never set on the builder
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Invalid builder inputs (empty node list, zero chunk size, ...)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Body serialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Chunk or node index outside the frozen transaction's dimensions
    #[error("index out of range: {0}")]
    IndexOutOfRange(String),
}

impl BuildError {
    /// Build errors are local precondition violations; none are retryable
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::MessageTooLong { .. } => "chunking",
            Self::FrozenState(_) => "lifecycle",
            Self::MissingField(_) => "validation",
            Self::Configuration(_) => "config",
            Self::Serialization(_) => "serialization",
            Self::IndexOutOfRange(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_too_long_display() {
        let err = BuildError::MessageTooLong {
            size: 10_000,
            chunk_size: 4096,
            required: 3,
            max_chunks: 2,
        };
        let text = err.to_string();
        assert!(text.contains("10000 bytes"));
        assert!(text.contains("ceiling of 2"));
    }

    #[test]
    fn test_nothing_is_retryable() {
        assert!(!BuildError::FrozenState("late signature".into()).is_retryable());
        assert!(!BuildError::MissingField("operation").is_retryable());
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            BuildError::MessageTooLong {
                size: 1,
                chunk_size: 1,
                required: 1,
                max_chunks: 1
            }
            .category(),
            "chunking"
        );
        assert_eq!(BuildError::Configuration("x".into()).category(), "config");
    }
}
