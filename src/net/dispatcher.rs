//! Single-attempt dispatch
//!
//! The dispatcher sends exactly one network call per invocation and never
//! retries internally; retry policy lives in the execution layer, which keeps
//! this component trivially testable. The returned status code is
//! unclassified; phase-sensitive meaning is assigned by the error
//! classifier.

use crate::net::errors::TransportError;
use crate::net::transport::{NodeAddress, OutcomeQuery, QueryResponse, Transport};
use crate::types::{AccountId, SignedEnvelope, StatusCode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Lifecycle of one logical submission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Unsent,
    Sent,
    Acked(StatusCode),
    TimedOut,
    TransportError,
}

/// Attempt-scoped state; created per send, discarded once a terminal outcome
/// or exhausted retries is reached
#[derive(Debug, Clone)]
pub struct DispatchAttempt {
    pub node: AccountId,
    pub number: u32,
    pub state: AttemptState,
    pub started_at: Option<Instant>,
}

impl DispatchAttempt {
    pub fn new(node: AccountId, number: u32) -> Self {
        Self {
            node,
            number,
            state: AttemptState::Unsent,
            started_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.state, AttemptState::Unsent | AttemptState::Sent)
    }
}

/// Sends envelopes and polls outcomes over a [`Transport`], one call at a time
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    request_timeout: Duration,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, request_timeout: Duration) -> Self {
        Self {
            transport,
            request_timeout,
        }
    }

    /// One submission round-trip: `Unsent -> Sent -> Acked | TimedOut | TransportError`.
    ///
    /// A per-call timeout firing is a transport failure, feeding the same
    /// retry path as explicit connectivity errors.
    pub async fn dispatch(
        &self,
        node: &NodeAddress,
        envelope: &SignedEnvelope,
        attempt: &mut DispatchAttempt,
    ) -> Result<StatusCode, TransportError> {
        attempt.state = AttemptState::Sent;
        attempt.started_at = Some(Instant::now());
        metrics::counter!("ledgerlink_dispatch_total").increment(1);

        let result = tokio::time::timeout(
            self.request_timeout,
            self.transport.submit(node, envelope),
        )
        .await;

        match result {
            Ok(Ok(response)) => {
                attempt.state = AttemptState::Acked(response.status);
                debug!(
                    node = %node,
                    attempt = attempt.number,
                    status = %response.status,
                    latency_ms = attempt.started_at.map(|t| t.elapsed().as_millis() as u64),
                    "Dispatch acknowledged"
                );
                Ok(response.status)
            }
            Ok(Err(err)) => {
                attempt.state = AttemptState::TransportError;
                metrics::counter!("ledgerlink_dispatch_transport_errors").increment(1);
                warn!(node = %node, attempt = attempt.number, error = %err, "Dispatch failed");
                Err(err)
            }
            Err(_elapsed) => {
                attempt.state = AttemptState::TimedOut;
                metrics::counter!("ledgerlink_dispatch_timeouts").increment(1);
                warn!(
                    node = %node,
                    attempt = attempt.number,
                    timeout_ms = self.request_timeout.as_millis() as u64,
                    "Dispatch timed out"
                );
                Err(TransportError::Timeout {
                    node: node.to_string(),
                    timeout_ms: self.request_timeout.as_millis() as u64,
                })
            }
        }
    }

    /// One outcome poll round-trip, under the same per-call timeout
    pub async fn query(
        &self,
        node: &NodeAddress,
        query: &OutcomeQuery,
    ) -> Result<QueryResponse, TransportError> {
        metrics::counter!("ledgerlink_poll_total").increment(1);
        match tokio::time::timeout(self.request_timeout, self.transport.query(node, query)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(TransportError::Timeout {
                node: node.to_string(),
                timeout_ms: self.request_timeout.as_millis() as u64,
            }),
        }
    }
}
