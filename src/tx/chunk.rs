//! Chunk planning for oversized payloads
//!
//! Splits a payload into at most `max_chunks` slices of `chunk_size` bytes
//! and derives one sub-transaction identifier per slice. The ceiling is
//! enforced here, strictly before any network call. No I/O happens in this
//! module.

use crate::tx::errors::BuildError;
use crate::txid;
use crate::types::{ChunkInfo, TransactionId};

/// One planned sub-transaction of a chunk group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSlice {
    pub transaction_id: TransactionId,
    /// None when the payload fits in a single chunk
    pub info: Option<ChunkInfo>,
    pub payload: Vec<u8>,
}

/// Plans the chunk group for `payload` under the given limits.
///
/// Chunk 1 uses `initial_id` unchanged; every following chunk's identifier is
/// the previous chunk's advanced by exactly one nanosecond, giving sibling
/// sub-transactions a strict, deterministic order without re-rolling the
/// jittered clock. The derived identifiers are reserved in the process-wide
/// set so independently generated identifiers cannot collide with them.
pub fn plan(
    initial_id: TransactionId,
    payload: &[u8],
    chunk_size: usize,
    max_chunks: usize,
) -> Result<Vec<ChunkSlice>, BuildError> {
    if chunk_size == 0 {
        return Err(BuildError::Configuration(
            "chunk_size must be greater than zero".to_string(),
        ));
    }
    if max_chunks == 0 {
        return Err(BuildError::Configuration(
            "max_chunks must be greater than zero".to_string(),
        ));
    }

    // An empty payload still produces one (empty) sub-transaction.
    let required = payload.len().div_ceil(chunk_size).max(1);
    if required > max_chunks {
        return Err(BuildError::MessageTooLong {
            size: payload.len(),
            chunk_size,
            required,
            max_chunks,
        });
    }

    if required == 1 {
        return Ok(vec![ChunkSlice {
            transaction_id: initial_id,
            info: None,
            payload: payload.to_vec(),
        }]);
    }

    let mut slices = Vec::with_capacity(required);
    let mut id = initial_id;
    for (index, piece) in payload.chunks(chunk_size).enumerate() {
        if index > 0 {
            id = id.next_sibling();
            txid::reserve(id.valid_start);
        }
        slices.push(ChunkSlice {
            transaction_id: id,
            info: Some(ChunkInfo {
                initial_transaction_id: initial_id,
                total: required as u32,
                number: (index + 1) as u32,
            }),
            payload: piece.to_vec(),
        });
    }
    Ok(slices)
}
