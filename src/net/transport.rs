//! Transport seam: the single trait the client speaks through
//!
//! Implementations own the remote-procedure channel to a node; this crate
//! only requires the structural contract: a submission carries body bytes
//! plus (key, signature) pairs, an immediate response carries a status code,
//! and a polled response carries a status code plus an effect payload.
//!
//! [`MockTransport`] provides a scripted implementation for tests and local
//! development; it never touches the network.

use crate::net::errors::TransportError;
use crate::types::{Receipt, Record, SignedEnvelope, StatusCode, TransactionId};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// One consensus node: its ledger account plus network address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAddress {
    pub account: crate::types::AccountId,
    pub address: String,
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.account, self.address)
    }
}

/// Immediate, pre-consensus acknowledgment from a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrecheckResponse {
    pub status: StatusCode,
}

/// Poll request for an asynchronous consensus outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeQuery {
    Receipt { transaction_id: TransactionId },
    Record { transaction_id: TransactionId },
}

impl OutcomeQuery {
    pub fn transaction_id(&self) -> TransactionId {
        match self {
            OutcomeQuery::Receipt { transaction_id } | OutcomeQuery::Record { transaction_id } => {
                *transaction_id
            }
        }
    }
}

/// Response to an outcome poll.
///
/// `header_status` is the query-level code (e.g. the receipt is not recorded
/// yet); the payload, when present, carries its own consensus status inside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResponse {
    Receipt {
        header_status: StatusCode,
        receipt: Option<Receipt>,
    },
    Record {
        header_status: StatusCode,
        record: Option<Record>,
    },
}

/// Node-addressed remote-procedure channel.
///
/// One call per method invocation; retrying is the retry controller's job,
/// never the transport's.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn submit(
        &self,
        node: &NodeAddress,
        envelope: &SignedEnvelope,
    ) -> Result<PrecheckResponse, TransportError>;

    async fn query(
        &self,
        node: &NodeAddress,
        query: &OutcomeQuery,
    ) -> Result<QueryResponse, TransportError>;
}

/// Scripted query reply for [`MockTransport`]
#[derive(Debug, Clone)]
pub struct QueryReply {
    pub header_status: StatusCode,
    pub receipt: Option<Receipt>,
}

impl QueryReply {
    pub fn found(receipt: Receipt) -> Self {
        Self {
            header_status: StatusCode::Ok,
            receipt: Some(receipt),
        }
    }

    pub fn not_yet() -> Self {
        Self {
            header_status: StatusCode::ReceiptNotFound,
            receipt: None,
        }
    }
}

/// In-memory transport with scripted responses and call counters.
///
/// When a script queue runs dry the mock answers success, so happy-path tests
/// only need to script the interesting prefix.
#[derive(Default)]
pub struct MockTransport {
    submit_script: Mutex<VecDeque<Result<StatusCode, TransportError>>>,
    query_script: Mutex<VecDeque<Result<QueryReply, TransportError>>>,
    submit_calls: AtomicU64,
    query_calls: AtomicU64,
    seen: Mutex<Vec<(NodeAddress, SignedEnvelope)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_submit(&self, reply: Result<StatusCode, TransportError>) {
        self.submit_script.lock().push_back(reply);
    }

    pub fn queue_query(&self, reply: Result<QueryReply, TransportError>) {
        self.query_script.lock().push_back(reply);
    }

    /// Total `submit` invocations observed
    pub fn submit_calls(&self) -> u64 {
        self.submit_calls.load(Ordering::Relaxed)
    }

    /// Total `query` invocations observed
    pub fn query_calls(&self) -> u64 {
        self.query_calls.load(Ordering::Relaxed)
    }

    /// Every envelope submitted so far, with its target node
    pub fn seen_envelopes(&self) -> Vec<(NodeAddress, SignedEnvelope)> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn submit(
        &self,
        node: &NodeAddress,
        envelope: &SignedEnvelope,
    ) -> Result<PrecheckResponse, TransportError> {
        self.submit_calls.fetch_add(1, Ordering::Relaxed);
        self.seen.lock().push((node.clone(), envelope.clone()));
        match self.submit_script.lock().pop_front() {
            Some(Ok(status)) => Ok(PrecheckResponse { status }),
            Some(Err(err)) => Err(err),
            None => Ok(PrecheckResponse {
                status: StatusCode::Ok,
            }),
        }
    }

    async fn query(
        &self,
        _node: &NodeAddress,
        query: &OutcomeQuery,
    ) -> Result<QueryResponse, TransportError> {
        self.query_calls.fetch_add(1, Ordering::Relaxed);
        let reply = match self.query_script.lock().pop_front() {
            Some(Ok(reply)) => reply,
            Some(Err(err)) => return Err(err),
            None => QueryReply::found(Receipt::with_status(StatusCode::Ok)),
        };

        Ok(match query {
            OutcomeQuery::Receipt { .. } => QueryResponse::Receipt {
                header_status: reply.header_status,
                receipt: reply.receipt,
            },
            OutcomeQuery::Record { transaction_id } => QueryResponse::Record {
                header_status: reply.header_status,
                record: reply.receipt.map(|receipt| Record {
                    receipt,
                    transaction_id: *transaction_id,
                    consensus_timestamp: None,
                    transaction_fee: 0,
                    memo: String::new(),
                }),
            },
        })
    }
}
