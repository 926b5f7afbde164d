//! Transaction builder and its frozen, signable form
//!
//! `TransactionBuilder` accumulates operation parameters through chainable
//! setters. `freeze` consumes the builder by value and yields a
//! [`FrozenTransaction`]; immutability after freezing is enforced by
//! ownership transfer, so a post-freeze setter call is a compile error rather
//! than a runtime check.
//!
//! A frozen transaction stores one serialized body per (chunk, target node)
//! pair, CHUNK-MAJOR: all per-node bodies for chunk 0 first, then chunk 1,
//! so `index = chunk * node_count + node`. [`SignatureMap::from_frozen`]
//! relies on the same arithmetic.

use crate::operator::Operator;
use crate::tx::body::{OperationBody, TransactionBody};
use crate::tx::chunk;
use crate::tx::errors::BuildError;
use crate::tx::sigmap::SignatureMap;
use crate::types::{AccountId, ChunkInfo, PublicKeyBytes, SignedEnvelope, TransactionId};
use tracing::debug;

const DEFAULT_VALID_DURATION_SECS: u64 = 120;
const DEFAULT_MAX_FEE: u64 = 100_000_000;

/// Mutable accumulator for one logical transaction
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    operation: Option<OperationBody>,
    memo: String,
    max_fee: u64,
    valid_duration_secs: u64,
    chunk_size: usize,
    max_chunks: usize,
    /// Sub-transactions queued by the chunk planner during freeze
    queued: Vec<QueuedChunk>,
}

#[derive(Debug, Clone)]
struct QueuedChunk {
    transaction_id: TransactionId,
    operation: OperationBody,
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self {
            operation: None,
            memo: String::new(),
            max_fee: DEFAULT_MAX_FEE,
            valid_duration_secs: DEFAULT_VALID_DURATION_SECS,
            chunk_size: 1024,
            max_chunks: 20,
            queued: Vec::new(),
        }
    }

    pub fn operation(mut self, operation: OperationBody) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    pub fn max_fee(mut self, max_fee: u64) -> Self {
        self.max_fee = max_fee;
        self
    }

    pub fn valid_duration_secs(mut self, secs: u64) -> Self {
        self.valid_duration_secs = secs;
        self
    }

    pub fn chunk_limits(mut self, chunk_size: usize, max_chunks: usize) -> Self {
        self.chunk_size = chunk_size;
        self.max_chunks = max_chunks;
        self
    }

    /// Consumes the builder and produces the immutable, signable form.
    ///
    /// For each target node a body is serialized that differs only in
    /// `node_account_id`. Payload-carrying operations over the chunk size are
    /// split here; the chunk ceiling is enforced before any network call.
    pub fn freeze(
        mut self,
        node_ids: &[AccountId],
        transaction_id: TransactionId,
    ) -> Result<FrozenTransaction, BuildError> {
        let operation = self.operation.take().ok_or(BuildError::MissingField("operation"))?;
        if node_ids.is_empty() {
            return Err(BuildError::Configuration(
                "at least one target node is required".to_string(),
            ));
        }

        match operation {
            OperationBody::TopicMessageSubmit {
                topic_id, message, ..
            } => {
                let slices = chunk::plan(transaction_id, &message, self.chunk_size, self.max_chunks)?;
                for slice in slices {
                    self.queued.push(QueuedChunk {
                        transaction_id: slice.transaction_id,
                        operation: OperationBody::TopicMessageSubmit {
                            topic_id,
                            message: slice.payload,
                            chunk_info: slice.info,
                        },
                    });
                }
            }
            other => {
                self.queued.push(QueuedChunk {
                    transaction_id,
                    operation: other,
                });
            }
        }

        let mut bodies = Vec::with_capacity(self.queued.len() * node_ids.len());
        for queued in &self.queued {
            for &node in node_ids {
                let body = TransactionBody {
                    transaction_id: queued.transaction_id,
                    node_account_id: node,
                    valid_duration_secs: self.valid_duration_secs,
                    max_fee: self.max_fee,
                    memo: self.memo.clone(),
                    operation: queued.operation.clone(),
                };
                bodies.push(body.to_bytes()?);
            }
        }

        debug!(
            transaction_id = %transaction_id,
            chunks = self.queued.len(),
            nodes = node_ids.len(),
            "Transaction frozen"
        );

        Ok(FrozenTransaction {
            node_ids: node_ids.to_vec(),
            chunks: self.queued,
            memo: self.memo,
            max_fee: self.max_fee,
            valid_duration_secs: self.valid_duration_secs,
            bodies,
            signatures: SignatureMap::new(),
        })
    }
}

/// Immutable signed artifact produced by [`TransactionBuilder::freeze`].
///
/// Shared read-only across all dispatch attempts and chunks. The single
/// sanctioned mutation is [`rebuild_chunk`](Self::rebuild_chunk), which the
/// retry controller invokes after a consensus-level throttle.
#[derive(Debug, Clone)]
pub struct FrozenTransaction {
    node_ids: Vec<AccountId>,
    chunks: Vec<QueuedChunk>,
    memo: String,
    max_fee: u64,
    valid_duration_secs: u64,
    /// Chunk-major: index = chunk * node_count + node
    bodies: Vec<Vec<u8>>,
    signatures: SignatureMap,
}

impl FrozenTransaction {
    pub fn node_ids(&self) -> &[AccountId] {
        &self.node_ids
    }

    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Identifier of the first chunk; the group identifier for chunked
    /// submissions
    pub fn transaction_id(&self) -> TransactionId {
        self.chunks[0].transaction_id
    }

    pub fn transaction_id_for_chunk(&self, chunk: usize) -> Result<TransactionId, BuildError> {
        self.chunks
            .get(chunk)
            .map(|c| c.transaction_id)
            .ok_or_else(|| BuildError::IndexOutOfRange(format!("chunk {chunk}")))
    }

    pub fn chunk_info(&self, chunk: usize) -> Option<ChunkInfo> {
        match self.chunks.get(chunk)?.operation {
            OperationBody::TopicMessageSubmit { chunk_info, .. } => chunk_info,
            _ => None,
        }
    }

    fn body_index(&self, chunk: usize, node: usize) -> Result<usize, BuildError> {
        if chunk >= self.chunk_count() || node >= self.node_count() {
            return Err(BuildError::IndexOutOfRange(format!(
                "chunk {chunk}, node {node} (dimensions {}x{})",
                self.chunk_count(),
                self.node_count()
            )));
        }
        Ok(chunk * self.node_count() + node)
    }

    pub fn body_bytes(&self, chunk: usize, node: usize) -> Result<&[u8], BuildError> {
        let index = self.body_index(chunk, node)?;
        Ok(&self.bodies[index])
    }

    /// Signs every (chunk, node) body with the operator key
    pub fn sign(&mut self, operator: &Operator) -> Result<(), BuildError> {
        for chunk in 0..self.chunk_count() {
            let txid = self.chunks[chunk].transaction_id;
            for node_index in 0..self.node_count() {
                let node = self.node_ids[node_index];
                let index = self.body_index(chunk, node_index)?;
                let signature = operator.sign(&self.bodies[index]);
                self.signatures
                    .add_signature(node, txid, operator.public_key(), signature);
            }
        }
        Ok(())
    }

    /// Adds an externally produced signature for one (node, chunk) body
    pub fn add_signature(
        &mut self,
        node: AccountId,
        txid: TransactionId,
        public_key: PublicKeyBytes,
        signature: Vec<u8>,
    ) {
        self.signatures.add_signature(node, txid, public_key, signature);
    }

    pub fn signatures(&self) -> &SignatureMap {
        &self.signatures
    }

    /// Assembles the wire envelope for one (chunk, node) pair.
    ///
    /// Fails with a frozen-state violation if no signature covers the body;
    /// an unsigned envelope can never be accepted by a node.
    pub fn envelope(&self, chunk: usize, node: usize) -> Result<SignedEnvelope, BuildError> {
        let index = self.body_index(chunk, node)?;
        let txid = self.chunks[chunk].transaction_id;
        let node_id = self.node_ids[node];
        let pairs = self.signatures.pairs(node_id, txid);
        if pairs.is_empty() {
            return Err(BuildError::FrozenState(format!(
                "envelope for {txid} on node {node_id} requested before signing"
            )));
        }
        Ok(SignedEnvelope {
            body_bytes: self.bodies[index].clone(),
            sig_pairs: pairs.to_vec(),
        })
    }

    /// Re-freezes one chunk under a fresh transaction identifier and re-signs
    /// it with the operator key.
    ///
    /// Invoked by the retry controller after a consensus-level throttle: the
    /// old identifier is already recorded against the failed transaction and
    /// must not be reused. Stale signatures for the old identifier are
    /// dropped. The group's `initial_transaction_id` in `ChunkInfo` is left
    /// untouched; group membership is tracked by it, not by the sibling
    /// identifier arithmetic used at planning time.
    pub fn rebuild_chunk(
        &mut self,
        chunk: usize,
        new_txid: TransactionId,
        operator: &Operator,
    ) -> Result<(), BuildError> {
        if chunk >= self.chunk_count() {
            return Err(BuildError::IndexOutOfRange(format!("chunk {chunk}")));
        }

        let old_txid = self.chunks[chunk].transaction_id;
        self.signatures.remove_transaction(old_txid);
        self.chunks[chunk].transaction_id = new_txid;

        for node_index in 0..self.node_count() {
            let node = self.node_ids[node_index];
            let body = TransactionBody {
                transaction_id: new_txid,
                node_account_id: node,
                valid_duration_secs: self.valid_duration_secs,
                max_fee: self.max_fee,
                memo: self.memo.clone(),
                operation: self.chunks[chunk].operation.clone(),
            };
            let bytes = body.to_bytes()?;
            let signature = operator.sign(&bytes);
            self.signatures
                .add_signature(node, new_txid, operator.public_key(), signature);
            let index = self.body_index(chunk, node_index)?;
            self.bodies[index] = bytes;
        }

        debug!(old = %old_txid, new = %new_txid, chunk, "Chunk rebuilt with fresh identifier");
        Ok(())
    }
}
