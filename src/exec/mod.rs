//! Execution layer: status classification, outcome polling, and the
//! retry/backoff controller that drives dispatch attempts.

pub mod errors;
pub mod poller;
pub mod retry;
pub mod status;

pub use errors::{classify, ExecuteError, FailureContext};
pub use poller::Poller;
pub use retry::{execute_with_retry, AttemptCtx, AttemptVerdict, RetryConfig};
pub use status::{decide, ExecutionState, Phase};
