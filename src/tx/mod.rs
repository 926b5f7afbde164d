//! Transaction construction: typed operation bodies, chunk planning,
//! signature collection, and the freeze lifecycle.
//!
//! The flow is: accumulate parameters on a [`TransactionBuilder`], freeze it
//! against a target node set and a transaction identifier (consuming the
//! builder), sign the frozen result, then hand per-(chunk, node) envelopes to
//! the dispatcher.

pub mod body;
pub mod builder;
pub mod chunk;
pub mod errors;
pub mod sigmap;

pub use body::{OperationBody, TransactionBody};
pub use builder::{FrozenTransaction, TransactionBuilder};
pub use chunk::ChunkSlice;
pub use errors::BuildError;
pub use sigmap::SignatureMap;
