//! Transaction body: a closed tagged union over operation kinds
//!
//! Each operation variant carries its own typed payload and is dispatched by
//! exhaustive matching; there is no runtime type registry. The serialized
//! body is the byte string that gets signed and shipped per target node.

use crate::tx::errors::BuildError;
use crate::types::{AccountId, ChunkInfo, PublicKeyBytes, TopicId, TransactionId};
use serde::{Deserialize, Serialize};

/// Operation-specific payload of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationBody {
    AccountCreate {
        key: PublicKeyBytes,
        initial_balance: u64,
    },
    Transfer {
        /// Signed deltas; a valid transfer list sums to zero
        transfers: Vec<(AccountId, i64)>,
    },
    TopicCreate {
        memo: String,
        admin_key: Option<PublicKeyBytes>,
    },
    TopicMessageSubmit {
        topic_id: TopicId,
        message: Vec<u8>,
        /// Set by the chunk planner; absent on single-chunk submissions
        chunk_info: Option<ChunkInfo>,
    },
}

impl OperationBody {
    /// Short operation name for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            OperationBody::AccountCreate { .. } => "account_create",
            OperationBody::Transfer { .. } => "transfer",
            OperationBody::TopicCreate { .. } => "topic_create",
            OperationBody::TopicMessageSubmit { .. } => "topic_message_submit",
        }
    }

    /// Payload that is subject to chunking, if this operation carries one
    pub fn chunkable_payload(&self) -> Option<&[u8]> {
        match self {
            OperationBody::TopicMessageSubmit { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Full signable body for one (chunk, target node) pair.
///
/// Bodies for the same chunk differ only in `node_account_id`; everything
/// else, including the transaction identifier, is shared so the client can
/// retry against a different node without rebuilding semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBody {
    pub transaction_id: TransactionId,
    pub node_account_id: AccountId,
    pub valid_duration_secs: u64,
    pub max_fee: u64,
    pub memo: String,
    pub operation: OperationBody,
}

impl TransactionBody {
    /// Serialize to the wire byte string that gets signed
    pub fn to_bytes(&self) -> Result<Vec<u8>, BuildError> {
        bincode::serialize(self).map_err(|e| BuildError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BuildError> {
        bincode::deserialize(bytes).map_err(|e| BuildError::Serialization(e.to_string()))
    }
}
