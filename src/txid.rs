//! Transaction identifier generation
//!
//! Identifiers combine the payer account with a jittered valid-start
//! timestamp. The jitter pulls the timestamp 3000-8000 ms into the past so
//! that a node with a slightly behind clock does not reject the transaction
//! as "from the future". A process-wide set of issued valid-start instants
//! guarantees that rapid successive calls never produce a duplicate; a
//! monotonic microsecond drift counter keeps identifiers advancing even when
//! two clock reads land on the same nanosecond.

use crate::types::{AccountId, Timestamp, TransactionId};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Lower bound of the backward clock jitter, milliseconds
pub const JITTER_MIN_MS: u64 = 3000;
/// Upper bound of the backward clock jitter, milliseconds
pub const JITTER_MAX_MS: u64 = 8000;

/// Valid-start instants already handed out by this process.
///
/// The only synchronization point required by the core: concurrent
/// submissions share nothing else mutable.
static ISSUED: Lazy<Mutex<HashSet<Timestamp>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// Monotonic drift applied on top of the wall clock, microseconds
static DRIFT_MICROS: AtomicU64 = AtomicU64::new(0);

fn wall_clock_nanos() -> i128 {
    // A clock before the Unix epoch is a broken host; fall back to zero and
    // let the drift counter keep identifiers distinct.
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i128)
        .unwrap_or(0)
}

fn candidate_timestamp(jitter: bool) -> Timestamp {
    let jitter_nanos = if jitter {
        fastrand::u64(JITTER_MIN_MS..JITTER_MAX_MS) as i128 * 1_000_000
    } else {
        0
    };
    let drift_nanos = DRIFT_MICROS.fetch_add(1, Ordering::Relaxed) as i128 * 1_000;
    Timestamp::from_total_nanos(wall_clock_nanos() - jitter_nanos + drift_nanos)
}

/// Generates a process-unique transaction identifier for `payer`.
///
/// When `jitter` is false the backward offset is skipped and determinism is
/// the caller's responsibility; uniqueness within the process still holds.
pub fn generate_with_policy(payer: AccountId, jitter: bool) -> TransactionId {
    loop {
        let valid_start = candidate_timestamp(jitter);
        let mut issued = ISSUED.lock();
        if issued.insert(valid_start) {
            return TransactionId::new(payer, valid_start);
        }
        // Collision: regenerate. The drift counter advanced, so the next
        // candidate differs even under a frozen wall clock.
    }
}

/// Generates a jittered, process-unique transaction identifier for `payer`
pub fn generate(payer: AccountId) -> TransactionId {
    generate_with_policy(payer, true)
}

/// Reserves a caller-derived valid-start (for example a +1 ns chunk sibling)
/// in the process-wide set so the jittered path can never collide with it.
pub(crate) fn reserve(valid_start: Timestamp) {
    ISSUED.lock().insert(valid_start);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sequential_ids_are_distinct() {
        let payer = AccountId(1001);
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let id = generate(payer);
            assert!(seen.insert(id), "duplicate identifier: {id}");
        }
    }

    #[test]
    fn test_jitter_pulls_timestamp_backward() {
        let before = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos() as i128;
        let id = generate(AccountId(1));
        let min_offset = (JITTER_MIN_MS as i128 - 1) * 1_000_000;
        assert!(
            id.valid_start.as_nanos() < before - min_offset,
            "valid-start {} not jittered behind wall clock",
            id.valid_start
        );
    }

    #[test]
    fn test_unjittered_ids_still_unique() {
        let payer = AccountId(2);
        let a = generate_with_policy(payer, false);
        let b = generate_with_policy(payer, false);
        assert_ne!(a, b);
    }

    #[test]
    fn test_concurrent_generation_no_collisions() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    (0..200)
                        .map(|_| generate(AccountId(77)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().expect("generator thread panicked") {
                assert!(seen.insert(id), "cross-thread duplicate: {id}");
            }
        }
    }
}
