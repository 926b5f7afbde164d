//! Execution-layer error taxonomy
//!
//! Every failure carries the transaction identifier and, where available,
//! the partial receipt or record, so callers can inspect partial results
//! even on failure.

use crate::exec::status::Phase;
use crate::net::errors::TransportError;
use crate::tx::errors::BuildError;
use crate::types::{AccountId, Receipt, Record, StatusCode, TransactionId};
use thiserror::Error;

/// Terminal errors surfaced by submission and polling
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// Node rejected the submission before broadcasting to consensus
    #[error("precheck failed with {status} for {transaction_id} (node: {node})")]
    Precheck {
        status: StatusCode,
        transaction_id: TransactionId,
        node: AccountId,
    },

    /// The polled receipt carries a definite non-success outcome
    #[error("receipt status {status} for {transaction_id}")]
    Receipt {
        status: StatusCode,
        transaction_id: TransactionId,
        receipt: Option<Receipt>,
    },

    /// The polled record carries a definite non-success outcome
    #[error("record status {status} for {transaction_id}")]
    Record {
        status: StatusCode,
        transaction_id: TransactionId,
        record: Option<Record>,
    },

    /// Attempt or poll ceiling reached without a terminal outcome
    #[error("retries exhausted after {attempts} attempts (last status: {last_status:?})")]
    RetryExhausted {
        attempts: u32,
        last_status: Option<StatusCode>,
    },

    /// Caller misuse detected before any resubmission, e.g. requesting an
    /// identifier rebuild for a third-party payer
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Context threaded into [`classify`]
#[derive(Debug, Default, Clone)]
pub struct FailureContext {
    pub transaction_id: TransactionId,
    pub node: Option<AccountId>,
    pub receipt: Option<Receipt>,
    pub record: Option<Record>,
}

/// Maps a raw status code observed in `phase` to its typed error
pub fn classify(status: StatusCode, phase: Phase, ctx: FailureContext) -> ExecuteError {
    match phase {
        Phase::Precheck => ExecuteError::Precheck {
            status,
            transaction_id: ctx.transaction_id,
            node: ctx.node.unwrap_or_default(),
        },
        Phase::Receipt => ExecuteError::Receipt {
            status,
            transaction_id: ctx.transaction_id,
            receipt: ctx.receipt,
        },
        Phase::Record => ExecuteError::Record {
            status,
            transaction_id: ctx.transaction_id,
            record: ctx.record,
        },
    }
}

impl ExecuteError {
    /// Whether the retry controller may re-attempt after backoff.
    ///
    /// Consensus throttles are excluded: they need an identifier rebuild,
    /// reported separately by [`requires_rebuild`](Self::requires_rebuild).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_retryable(),
            Self::Precheck { status, .. } => matches!(status, StatusCode::Busy),
            Self::Receipt { status, .. } | Self::Record { status, .. } => status.is_transient(),
            Self::RetryExhausted { .. } | Self::Configuration(_) | Self::Build(_) => false,
        }
    }

    /// Whether this failure demands a fresh transaction identifier before
    /// resubmission (throttled at consensus: the old identifier is already
    /// recorded against the failed transaction)
    pub fn requires_rebuild(&self) -> bool {
        match self {
            Self::Receipt { status, .. } | Self::Record { status, .. } => {
                status.is_consensus_throttle()
            }
            _ => false,
        }
    }

    /// The raw status observed, when one exists
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Precheck { status, .. }
            | Self::Receipt { status, .. }
            | Self::Record { status, .. } => Some(*status),
            Self::RetryExhausted { last_status, .. } => *last_status,
            Self::Configuration(_) | Self::Transport(_) | Self::Build(_) => None,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::Precheck { .. } => "precheck",
            Self::Receipt { .. } => "receipt",
            Self::Record { .. } => "record",
            Self::RetryExhausted { .. } => "retry",
            Self::Configuration(_) => "config",
            Self::Transport(_) => "transport",
            Self::Build(_) => "build",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;

    fn txid() -> TransactionId {
        TransactionId::new(AccountId(1001), Timestamp::new(100, 1))
    }

    #[test]
    fn test_classify_by_phase() {
        let ctx = FailureContext {
            transaction_id: txid(),
            node: Some(AccountId(3)),
            ..Default::default()
        };
        let err = classify(StatusCode::InvalidSignature, Phase::Precheck, ctx.clone());
        assert!(matches!(
            err,
            ExecuteError::Precheck {
                status: StatusCode::InvalidSignature,
                node: AccountId(3),
                ..
            }
        ));

        let err = classify(StatusCode::ContractRevertExecuted, Phase::Receipt, ctx.clone());
        assert!(matches!(err, ExecuteError::Receipt { .. }));

        let err = classify(StatusCode::ContractRevertExecuted, Phase::Record, ctx);
        assert!(matches!(err, ExecuteError::Record { .. }));
    }

    #[test]
    fn test_retryability() {
        let busy_precheck = ExecuteError::Precheck {
            status: StatusCode::Busy,
            transaction_id: txid(),
            node: AccountId(3),
        };
        assert!(busy_precheck.is_retryable());

        let invalid_precheck = ExecuteError::Precheck {
            status: StatusCode::InvalidSignature,
            transaction_id: txid(),
            node: AccountId(3),
        };
        assert!(!invalid_precheck.is_retryable());

        let transport = ExecuteError::Transport(TransportError::Timeout {
            node: "n".into(),
            timeout_ms: 100,
        });
        assert!(transport.is_retryable());
    }

    #[test]
    fn test_throttle_requires_rebuild_not_plain_retry() {
        let throttled = ExecuteError::Receipt {
            status: StatusCode::ThrottledAtConsensus,
            transaction_id: txid(),
            receipt: Some(Receipt::with_status(StatusCode::ThrottledAtConsensus)),
        };
        assert!(throttled.requires_rebuild());
        assert!(!throttled.is_retryable());
        assert_eq!(throttled.status(), Some(StatusCode::ThrottledAtConsensus));
    }

    #[test]
    fn test_receipt_error_preserves_partial_receipt() {
        let mut receipt = Receipt::with_status(StatusCode::ContractRevertExecuted);
        receipt.topic_sequence_number = Some(42);
        let err = ExecuteError::Receipt {
            status: receipt.status,
            transaction_id: txid(),
            receipt: Some(receipt),
        };
        match err {
            ExecuteError::Receipt { receipt: Some(r), .. } => {
                assert_eq!(r.topic_sequence_number, Some(42));
            }
            other => panic!("unexpected: {other}"),
        }
    }
}
