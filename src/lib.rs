//! Ledgerlink - Ledger transaction submission client
//!
//! Builds signed transactions against a multi-node ledger network, splits
//! oversized payloads into chunk groups, broadcasts with retry/backoff, and
//! polls receipts and records until consensus settles.

pub mod client;
pub mod config;
pub mod exec;
pub mod net;
pub mod observability;
pub mod operator;
pub mod tx;
pub mod txid;
pub mod types;

// Re-export the surface most integrations need
pub use client::LedgerClient;
pub use config::ClientConfig;
pub use exec::{ExecuteError, RetryConfig};
pub use net::{MockTransport, NodeAddress, Transport, TransportError};
pub use operator::Operator;
pub use tx::{BuildError, FrozenTransaction, OperationBody, TransactionBuilder};
pub use types::{
    AccountId, Outcome, Receipt, Record, StatusCode, Timestamp, TopicId, TransactionId,
};
