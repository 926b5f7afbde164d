//! Node selection with health tracking
//!
//! The node table is supplied externally. Selection rotates round-robin over
//! nodes that are not cooling down; a node enters cooldown after a run of
//! consecutive failures and returns automatically once the period elapses.

use crate::net::errors::TransportError;
use crate::net::transport::NodeAddress;
use crate::types::AccountId;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug)]
struct TrackedNode {
    address: NodeAddress,
    consecutive_failures: AtomicU64,
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    cooldown_until: parking_lot::Mutex<Option<Instant>>,
}

impl TrackedNode {
    fn new(address: NodeAddress) -> Self {
        Self {
            address,
            consecutive_failures: AtomicU64::new(0),
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            cooldown_until: parking_lot::Mutex::new(None),
        }
    }

    fn in_cooldown(&self) -> bool {
        let mut guard = self.cooldown_until.lock();
        match *guard {
            Some(until) if Instant::now() < until => true,
            Some(_) => {
                // Cooldown elapsed; the node is eligible again.
                *guard = None;
                self.consecutive_failures.store(0, Ordering::Relaxed);
                false
            }
            None => false,
        }
    }
}

/// Round-robin pool over the externally supplied node table
pub struct NodePool {
    nodes: Vec<Arc<TrackedNode>>,
    by_account: DashMap<AccountId, usize>,
    cursor: AtomicU64,
    failure_threshold: u64,
    cooldown: Duration,
}

impl NodePool {
    pub fn new(addresses: Vec<NodeAddress>, failure_threshold: u64, cooldown: Duration) -> Self {
        let nodes: Vec<_> = addresses
            .into_iter()
            .map(|a| Arc::new(TrackedNode::new(a)))
            .collect();
        let by_account = DashMap::new();
        for (index, node) in nodes.iter().enumerate() {
            by_account.insert(node.address.account, index);
        }
        Self {
            nodes,
            by_account,
            cursor: AtomicU64::new(0),
            failure_threshold,
            cooldown,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node accounts in table order; the target-node set for freezing
    pub fn accounts(&self) -> Vec<AccountId> {
        self.nodes.iter().map(|n| n.address.account).collect()
    }

    pub fn address_of(&self, account: AccountId) -> Option<NodeAddress> {
        self.by_account
            .get(&account)
            .map(|index| self.nodes[*index].address.clone())
    }

    /// Index (into the frozen transaction's node list) and address of the
    /// next eligible node.
    ///
    /// Skips nodes in cooldown; when every node is cooling down the next one
    /// in rotation is returned anyway rather than stalling the submission.
    pub fn select(&self) -> Result<(usize, NodeAddress), TransportError> {
        if self.nodes.is_empty() {
            return Err(TransportError::NoHealthyNodes { total: 0 });
        }

        let start = self.cursor.fetch_add(1, Ordering::Relaxed) as usize;
        for offset in 0..self.nodes.len() {
            let index = (start + offset) % self.nodes.len();
            if !self.nodes[index].in_cooldown() {
                return Ok((index, self.nodes[index].address.clone()));
            }
        }

        let index = start % self.nodes.len();
        warn!(total = self.nodes.len(), "All nodes in cooldown; selecting anyway");
        Ok((index, self.nodes[index].address.clone()))
    }

    /// Records the result of one call against `account`
    pub fn record_result(&self, account: AccountId, success: bool) {
        let Some(index) = self.by_account.get(&account).map(|i| *i) else {
            return;
        };
        let node = &self.nodes[index];
        node.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            node.successful_requests.fetch_add(1, Ordering::Relaxed);
            node.consecutive_failures.store(0, Ordering::Relaxed);
            return;
        }

        let failures = node.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= self.failure_threshold {
            *node.cooldown_until.lock() = Some(Instant::now() + self.cooldown);
            debug!(
                node = %node.address,
                failures,
                cooldown_secs = self.cooldown.as_secs(),
                "Node entered cooldown"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_of(n: u64) -> NodePool {
        let addresses = (0..n)
            .map(|i| NodeAddress {
                account: AccountId(3 + i),
                address: format!("node{i}:50211"),
            })
            .collect();
        NodePool::new(addresses, 3, Duration::from_secs(30))
    }

    #[test]
    fn test_round_robin_rotation() {
        let pool = pool_of(3);
        let a = pool.select().unwrap().1.account;
        let b = pool.select().unwrap().1.account;
        let c = pool.select().unwrap().1.account;
        let d = pool.select().unwrap().1.account;
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(a, d);
    }

    #[test]
    fn test_cooldown_after_consecutive_failures() {
        let pool = pool_of(2);
        for _ in 0..3 {
            pool.record_result(AccountId(3), false);
        }
        // Node 3 is cooling down; every selection lands on node 4.
        for _ in 0..4 {
            assert_eq!(pool.select().unwrap().1.account, AccountId(4));
        }
    }

    #[test]
    fn test_success_resets_failure_run() {
        let pool = pool_of(2);
        pool.record_result(AccountId(3), false);
        pool.record_result(AccountId(3), false);
        pool.record_result(AccountId(3), true);
        pool.record_result(AccountId(3), false);
        // Never reached the threshold of 3 consecutive failures.
        let selected: Vec<_> = (0..2).map(|_| pool.select().unwrap().1.account).collect();
        assert!(selected.contains(&AccountId(3)));
    }

    #[test]
    fn test_all_cooling_down_still_selects() {
        let pool = pool_of(2);
        for account in [AccountId(3), AccountId(4)] {
            for _ in 0..3 {
                pool.record_result(account, false);
            }
        }
        assert!(pool.select().is_ok());
    }

    #[test]
    fn test_empty_pool_errors() {
        let pool = NodePool::new(vec![], 3, Duration::from_secs(30));
        assert!(matches!(
            pool.select(),
            Err(TransportError::NoHealthyNodes { total: 0 })
        ));
    }

    #[test]
    fn test_cooldown_expires() {
        let addresses = vec![
            NodeAddress {
                account: AccountId(3),
                address: "node0:50211".into(),
            },
            NodeAddress {
                account: AccountId(4),
                address: "node1:50211".into(),
            },
        ];
        let pool = NodePool::new(addresses, 1, Duration::from_millis(0));
        pool.record_result(AccountId(3), false);
        // Zero-length cooldown: immediately eligible again.
        let selected: Vec<_> = (0..2).map(|_| pool.select().unwrap().1.account).collect();
        assert!(selected.contains(&AccountId(3)));
    }
}
