//! Common types shared across the ledger client

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity identifier on the ledger (shard and realm fixed at 0)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0.0.{}", self.0)
    }
}

/// Consensus topic identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct TopicId(pub u64);

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0.0.{}", self.0)
    }
}

pub(crate) const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Point in time as seconds + nanoseconds since the Unix epoch
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    /// Total nanoseconds since the epoch
    pub fn as_nanos(&self) -> i128 {
        self.seconds as i128 * NANOS_PER_SECOND as i128 + self.nanos as i128
    }

    pub fn from_total_nanos(total: i128) -> Self {
        let seconds = (total / NANOS_PER_SECOND as i128) as i64;
        let nanos = (total % NANOS_PER_SECOND as i128) as i32;
        Self { seconds, nanos }
    }

    /// Returns this timestamp advanced by `n` nanoseconds, normalizing carry.
    ///
    /// Used to derive sibling chunk identifiers deterministically without
    /// re-rolling the jittered clock.
    pub fn plus_nanos(&self, n: u64) -> Self {
        Self::from_total_nanos(self.as_nanos() + n as i128)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

/// Globally-unique transaction identifier: payer account + valid-start instant.
///
/// Immutable once created. See [`crate::txid`] for generation rules.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct TransactionId {
    pub payer: AccountId,
    pub valid_start: Timestamp,
}

impl TransactionId {
    pub fn new(payer: AccountId, valid_start: Timestamp) -> Self {
        Self { payer, valid_start }
    }

    /// Sibling identifier: same payer, valid-start advanced by one nanosecond
    pub fn next_sibling(&self) -> Self {
        Self {
            payer: self.payer,
            valid_start: self.valid_start.plus_nanos(1),
        }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.payer, self.valid_start)
    }
}

/// Links the sub-transactions of one oversized payload.
///
/// Present only on multi-chunk operations. All chunks of a group carry the
/// identifier of the first chunk as `initial_transaction_id`; `number` is
/// 1-based and contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkInfo {
    pub initial_transaction_id: TransactionId,
    pub total: u32,
    pub number: u32,
}

/// Ed25519 public key bytes, used as the signature-map key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PublicKeyBytes(pub [u8; 32]);

impl fmt::Display for PublicKeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// One (public key, signature) contribution for a serialized body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePair {
    pub public_key: PublicKeyBytes,
    pub signature: Vec<u8>,
}

/// Wire envelope: serialized body plus the signatures that cover it.
///
/// One envelope exists per (chunk, target node) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEnvelope {
    pub body_bytes: Vec<u8>,
    pub sig_pairs: Vec<SignaturePair>,
}

/// Raw status codes observed in node responses.
///
/// Codes are returned unclassified by the dispatcher; phase-sensitive meaning
/// is assigned by the execution-layer decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    Ok,
    /// Node is overloaded pre-consensus; transient
    Busy,
    /// Node could not yet determine an outcome; transient
    Unknown,
    /// No receipt recorded yet for the queried identifier
    ReceiptNotFound,
    /// No record recorded yet for the queried identifier
    RecordNotFound,
    /// Rejected by network rate limiting after reaching consensus
    ThrottledAtConsensus,
    DuplicateTransaction,
    InvalidSignature,
    InvalidTransaction,
    InvalidNodeAccount,
    TransactionExpired,
    InsufficientPayerBalance,
    PayerAccountNotFound,
    ContractRevertExecuted,
    /// Any code this client has no dedicated variant for
    Other(u32),
}

impl StatusCode {
    pub fn is_success(&self) -> bool {
        matches!(self, StatusCode::Ok)
    }

    /// Transient codes that warrant re-polling or a retried attempt
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StatusCode::Busy
                | StatusCode::Unknown
                | StatusCode::ReceiptNotFound
                | StatusCode::RecordNotFound
        )
    }

    /// Post-consensus throttle; retryable only via identifier rebuild
    pub fn is_consensus_throttle(&self) -> bool {
        matches!(self, StatusCode::ThrottledAtConsensus)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Other(code) => write!(f, "Other({code})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Minimal asynchronous consensus outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub status: StatusCode,
    /// Created account, when the operation creates one
    pub account_id: Option<AccountId>,
    /// Created topic, when the operation creates one
    pub topic_id: Option<TopicId>,
    /// New sequence number after a topic message reached consensus
    pub topic_sequence_number: Option<u64>,
    pub topic_running_hash: Option<Vec<u8>>,
}

impl Receipt {
    pub fn with_status(status: StatusCode) -> Self {
        Self {
            status,
            account_id: None,
            topic_id: None,
            topic_sequence_number: None,
            topic_running_hash: None,
        }
    }
}

/// Detailed, fee-bearing consensus outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub receipt: Receipt,
    pub transaction_id: TransactionId,
    pub consensus_timestamp: Option<Timestamp>,
    pub transaction_fee: u64,
    pub memo: String,
}

/// Final result of one logical submission.
///
/// Callers must keep these distinct; collapsing pending/failed/ok into a
/// boolean loses the pending state the poll design exists to expose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Dispatched and acknowledged, consensus result not yet observed
    Pending { transaction_id: TransactionId },
    Success {
        transaction_id: TransactionId,
        receipt: Receipt,
    },
    /// Node rejected the submission before consensus
    PrecheckFailure {
        transaction_id: TransactionId,
        node: AccountId,
        status: StatusCode,
    },
    /// Consensus reached a definite non-success result
    ConsensusFailure {
        transaction_id: TransactionId,
        status: StatusCode,
        receipt: Option<Receipt>,
    },
    TransportFailure {
        transaction_id: TransactionId,
        cause: String,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn transaction_id(&self) -> TransactionId {
        match self {
            Outcome::Pending { transaction_id }
            | Outcome::Success { transaction_id, .. }
            | Outcome::PrecheckFailure { transaction_id, .. }
            | Outcome::ConsensusFailure { transaction_id, .. }
            | Outcome::TransportFailure { transaction_id, .. } => *transaction_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats() {
        let id = TransactionId::new(AccountId(1001), Timestamp::new(1700000000, 42));
        assert_eq!(id.to_string(), "0.0.1001@1700000000.000000042");
        assert_eq!(AccountId(3).to_string(), "0.0.3");
        assert_eq!(TopicId(7).to_string(), "0.0.7");
    }

    #[test]
    fn test_plus_nanos_carry() {
        let ts = Timestamp::new(10, 999_999_999);
        let next = ts.plus_nanos(1);
        assert_eq!(next, Timestamp::new(11, 0));

        let far = ts.plus_nanos(2_000_000_001);
        assert_eq!(far, Timestamp::new(13, 0));
    }

    #[test]
    fn test_next_sibling_advances_one_nano() {
        let id = TransactionId::new(AccountId(5), Timestamp::new(100, 7));
        let sib = id.next_sibling();
        assert_eq!(sib.payer, id.payer);
        assert_eq!(sib.valid_start.nanos, 8);
        assert_eq!(sib.valid_start.seconds, 100);
    }

    #[test]
    fn test_status_classification() {
        assert!(StatusCode::Ok.is_success());
        assert!(StatusCode::Busy.is_transient());
        assert!(StatusCode::ReceiptNotFound.is_transient());
        assert!(!StatusCode::InvalidSignature.is_transient());
        assert!(StatusCode::ThrottledAtConsensus.is_consensus_throttle());
        assert!(!StatusCode::Busy.is_consensus_throttle());
    }

    #[test]
    fn test_outcome_accessors() {
        let id = TransactionId::new(AccountId(9), Timestamp::new(1, 2));
        let ok = Outcome::Success {
            transaction_id: id,
            receipt: Receipt::with_status(StatusCode::Ok),
        };
        assert!(ok.is_success());
        assert_eq!(ok.transaction_id(), id);

        let pending = Outcome::Pending { transaction_id: id };
        assert!(!pending.is_success());
    }
}
