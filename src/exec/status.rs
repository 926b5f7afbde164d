//! Phase-sensitive status code interpretation
//!
//! The same numeric code can warrant different handling depending on where it
//! was observed: `ReceiptNotFound` is a retry signal while polling but a hard
//! error in the precheck phase, where no further polling is expected.

use crate::types::StatusCode;

/// Where a status code was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Immediate synchronous acknowledgment, before consensus
    Precheck,
    /// Polled minimal consensus outcome
    Receipt,
    /// Polled detailed, fee-bearing consensus outcome
    Record,
}

/// What the caller should do with an observed status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// Re-poll (or re-attempt) after backoff
    Retry,
    /// Terminal; return the result
    Finished,
    /// Terminal failure; surface immediately, no further polling
    Error,
}

/// Decision table mapping (code, phase) to the next action.
///
/// `validate_receipt_status = false` is the escape hatch for callers who want
/// the raw receipt instead of an error: a definite non-success code observed
/// in a polled phase is then treated as finished, carrying the failure code.
pub fn decide(code: StatusCode, phase: Phase, validate_receipt_status: bool) -> ExecutionState {
    match phase {
        Phase::Precheck => match code {
            StatusCode::Ok => ExecutionState::Finished,
            // The transient allow-list at precheck is deliberately narrow.
            StatusCode::Busy => ExecutionState::Retry,
            _ => ExecutionState::Error,
        },
        Phase::Receipt | Phase::Record => {
            if code.is_success() {
                ExecutionState::Finished
            } else if code.is_transient() {
                ExecutionState::Retry
            } else if code.is_consensus_throttle() {
                // Always an error here; the retry controller rebuilds the
                // identifier and resubmits.
                ExecutionState::Error
            } else if validate_receipt_status {
                ExecutionState::Error
            } else {
                ExecutionState::Finished
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precheck_allow_list_is_narrow() {
        assert_eq!(
            decide(StatusCode::Busy, Phase::Precheck, true),
            ExecutionState::Retry
        );
        assert_eq!(
            decide(StatusCode::Ok, Phase::Precheck, true),
            ExecutionState::Finished
        );
        // Transient at poll time, hard error at precheck.
        assert_eq!(
            decide(StatusCode::ReceiptNotFound, Phase::Precheck, true),
            ExecutionState::Error
        );
        assert_eq!(
            decide(StatusCode::InvalidSignature, Phase::Precheck, true),
            ExecutionState::Error
        );
    }

    #[test]
    fn test_poll_phase_transients_retry() {
        for code in [
            StatusCode::Busy,
            StatusCode::Unknown,
            StatusCode::ReceiptNotFound,
            StatusCode::RecordNotFound,
        ] {
            assert_eq!(decide(code, Phase::Receipt, true), ExecutionState::Retry);
            assert_eq!(decide(code, Phase::Record, true), ExecutionState::Retry);
        }
    }

    #[test]
    fn test_definite_failure_respects_validation_flag() {
        assert_eq!(
            decide(StatusCode::ContractRevertExecuted, Phase::Receipt, true),
            ExecutionState::Error
        );
        assert_eq!(
            decide(StatusCode::ContractRevertExecuted, Phase::Receipt, false),
            ExecutionState::Finished
        );
    }

    #[test]
    fn test_consensus_throttle_errors_regardless_of_flag() {
        assert_eq!(
            decide(StatusCode::ThrottledAtConsensus, Phase::Receipt, false),
            ExecutionState::Error
        );
        assert_eq!(
            decide(StatusCode::ThrottledAtConsensus, Phase::Receipt, true),
            ExecutionState::Error
        );
    }

    #[test]
    fn test_success_finishes_everywhere() {
        for phase in [Phase::Precheck, Phase::Receipt, Phase::Record] {
            assert_eq!(decide(StatusCode::Ok, phase, true), ExecutionState::Finished);
        }
    }
}
