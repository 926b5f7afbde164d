//! Signature map: per-node, per-transaction signature collection
//!
//! Nested mapping node account -> transaction identifier -> list of
//! (public key, signature) pairs. Insertion is idempotent per public key:
//! re-adding a signature for the same (node, txid, key) replaces the bytes
//! instead of appending a duplicate row.

use crate::tx::builder::FrozenTransaction;
use crate::tx::errors::BuildError;
use crate::types::{AccountId, PublicKeyBytes, SignaturePair, TransactionId};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureMap {
    inner: BTreeMap<AccountId, BTreeMap<TransactionId, Vec<SignaturePair>>>,
}

impl SignatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstructs the (node, txid) row structure of an already-frozen
    /// transaction, with empty signature lists.
    ///
    /// The frozen body list is CHUNK-MAJOR: all per-node bodies for chunk 0,
    /// then all for chunk 1, so `index = chunk * node_count + node`. This
    /// arithmetic must match `FrozenTransaction` exactly; a mismatch would
    /// silently cross-wire chunks and nodes.
    pub fn from_frozen(frozen: &FrozenTransaction) -> Result<Self, BuildError> {
        let nodes = frozen.node_ids();
        let chunks = frozen.chunk_count();
        if frozen.body_count() != chunks * nodes.len() {
            return Err(BuildError::FrozenState(format!(
                "frozen transaction has {} bodies, expected {} chunks x {} nodes",
                frozen.body_count(),
                chunks,
                nodes.len()
            )));
        }

        let mut map = Self::new();
        for chunk in 0..chunks {
            let txid = frozen.transaction_id_for_chunk(chunk)?;
            for &node in nodes {
                map.inner.entry(node).or_default().entry(txid).or_default();
            }
        }
        Ok(map)
    }

    /// Adds `signature` under (node, txid, public key), replacing any
    /// previous signature by the same key.
    pub fn add_signature(
        &mut self,
        node: AccountId,
        txid: TransactionId,
        public_key: PublicKeyBytes,
        signature: Vec<u8>,
    ) {
        let pairs = self.inner.entry(node).or_default().entry(txid).or_default();
        if let Some(existing) = pairs.iter_mut().find(|p| p.public_key == public_key) {
            existing.signature = signature;
        } else {
            pairs.push(SignaturePair {
                public_key,
                signature,
            });
        }
    }

    /// Signatures for one (node, txid) row, in insertion order
    pub fn pairs(&self, node: AccountId, txid: TransactionId) -> &[SignaturePair] {
        self.inner
            .get(&node)
            .and_then(|by_tx| by_tx.get(&txid))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Flattened list of every signature pair, for wire assembly
    pub fn flat_signature_list(&self) -> Vec<SignaturePair> {
        self.inner
            .values()
            .flat_map(|by_tx| by_tx.values())
            .flat_map(|pairs| pairs.iter().cloned())
            .collect()
    }

    /// Drops every signature row keyed by `txid` (all nodes).
    ///
    /// Used when a consensus-level throttle forces an identifier rebuild; the
    /// stale identifier's signatures must not leak into the fresh envelope.
    pub fn remove_transaction(&mut self, txid: TransactionId) {
        for by_tx in self.inner.values_mut() {
            by_tx.remove(&txid);
        }
    }

    pub fn signature_count(&self, node: AccountId, txid: TransactionId) -> usize {
        self.pairs(node, txid).len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner
            .values()
            .all(|by_tx| by_tx.values().all(Vec::is_empty))
    }
}
