//! Network layer: transport seam, node pool, and single-attempt dispatch

pub mod dispatcher;
pub mod errors;
pub mod node_pool;
pub mod transport;

pub use dispatcher::{AttemptState, DispatchAttempt, Dispatcher};
pub use errors::TransportError;
pub use node_pool::NodePool;
pub use transport::{
    MockTransport, NodeAddress, OutcomeQuery, PrecheckResponse, QueryReply, QueryResponse,
    Transport,
};
