//! Outcome polling
//!
//! Consensus is asynchronous: after a successful dispatch ack the client
//! polls the network for the receipt (or record) on a backoff schedule. The
//! poller owns no transaction state, only query parameters; abandoning a
//! poll loop has no effect on the ledger.

use crate::config::ExecutionConfig;
use crate::exec::errors::{classify, ExecuteError, FailureContext};
use crate::exec::retry::RetryConfig;
use crate::exec::status::{decide, ExecutionState, Phase};
use crate::net::dispatcher::Dispatcher;
use crate::net::transport::{NodeAddress, OutcomeQuery, QueryResponse};
use crate::types::{Receipt, Record, StatusCode, TransactionId};
use tokio::time::sleep;
use tracing::{debug, trace};

/// Polls one node for the settlement result of a transaction
pub struct Poller<'a> {
    dispatcher: &'a Dispatcher,
    backoff: RetryConfig,
    max_polls: u32,
    validate_receipt_status: bool,
}

impl<'a> Poller<'a> {
    pub fn new(dispatcher: &'a Dispatcher, backoff: RetryConfig, execution: &ExecutionConfig) -> Self {
        Self {
            dispatcher,
            backoff,
            max_polls: execution.max_polls,
            validate_receipt_status: execution.validate_receipt_status,
        }
    }

    /// Polls until the receipt is definite, a hard error surfaces, or the
    /// poll ceiling is reached.
    ///
    /// Transport errors propagate to the retry controller, which feeds them
    /// into the same backoff path as explicit throttling signals.
    pub async fn await_receipt(
        &self,
        transaction_id: TransactionId,
        node: &NodeAddress,
    ) -> Result<Receipt, ExecuteError> {
        let mut last_status = None;
        for poll in 0..self.max_polls {
            let response = self
                .dispatcher
                .query(node, &OutcomeQuery::Receipt { transaction_id })
                .await?;
            let QueryResponse::Receipt {
                header_status,
                receipt,
            } = response
            else {
                return Err(ExecuteError::Configuration(
                    "transport answered a receipt query with a record".to_string(),
                ));
            };

            match self.step(transaction_id, node, header_status, receipt.clone(), Phase::Receipt)? {
                PollStep::Settled(receipt) => return Ok(receipt),
                PollStep::Again(status) => last_status = Some(status),
            }

            if poll + 1 < self.max_polls {
                sleep(self.backoff.backoff_for(poll)).await;
            }
        }

        Err(ExecuteError::RetryExhausted {
            attempts: self.max_polls,
            last_status,
        })
    }

    /// Record flavor of [`await_receipt`]; same decision table, richer payload
    pub async fn await_record(
        &self,
        transaction_id: TransactionId,
        node: &NodeAddress,
    ) -> Result<Record, ExecuteError> {
        let mut last_status = None;
        for poll in 0..self.max_polls {
            let response = self
                .dispatcher
                .query(node, &OutcomeQuery::Record { transaction_id })
                .await?;
            let QueryResponse::Record {
                header_status,
                record,
            } = response
            else {
                return Err(ExecuteError::Configuration(
                    "transport answered a record query with a receipt".to_string(),
                ));
            };

            let payload_status = record.as_ref().map(|r| r.receipt.status);
            match self.step_generic(
                transaction_id,
                header_status,
                payload_status,
                Phase::Record,
                FailureContext {
                    transaction_id,
                    node: Some(node.account),
                    record: record.clone(),
                    ..Default::default()
                },
            )? {
                PollDecision::Settled => {
                    return record.ok_or_else(|| {
                        ExecuteError::Configuration(
                            "node reported success without a record payload".to_string(),
                        )
                    })
                }
                PollDecision::Again(status) => last_status = Some(status),
            }

            if poll + 1 < self.max_polls {
                sleep(self.backoff.backoff_for(poll)).await;
            }
        }

        Err(ExecuteError::RetryExhausted {
            attempts: self.max_polls,
            last_status,
        })
    }

    fn step(
        &self,
        transaction_id: TransactionId,
        node: &NodeAddress,
        header_status: StatusCode,
        receipt: Option<Receipt>,
        phase: Phase,
    ) -> Result<PollStep, ExecuteError> {
        let ctx = FailureContext {
            transaction_id,
            node: Some(node.account),
            receipt: receipt.clone(),
            ..Default::default()
        };
        match self.step_generic(
            transaction_id,
            header_status,
            receipt.as_ref().map(|r| r.status),
            phase,
            ctx,
        )? {
            PollDecision::Settled => receipt.map(PollStep::Settled).ok_or_else(|| {
                ExecuteError::Configuration(
                    "node reported success without a receipt payload".to_string(),
                )
            }),
            PollDecision::Again(status) => Ok(PollStep::Again(status)),
        }
    }

    /// Applies the decision table to the header status, then to the payload's
    /// own consensus status.
    fn step_generic(
        &self,
        transaction_id: TransactionId,
        header_status: StatusCode,
        payload_status: Option<StatusCode>,
        phase: Phase,
        ctx: FailureContext,
    ) -> Result<PollDecision, ExecuteError> {
        match decide(header_status, phase, self.validate_receipt_status) {
            ExecutionState::Retry => {
                trace!(transaction_id = %transaction_id, status = %header_status, "Outcome not ready");
                return Ok(PollDecision::Again(header_status));
            }
            ExecutionState::Error => return Err(classify(header_status, phase, ctx)),
            ExecutionState::Finished => {}
        }

        let Some(status) = payload_status else {
            // Header said finished but no payload came back; decode trouble
            // on the node side, surface as-is.
            return Err(classify(header_status, phase, ctx));
        };

        match decide(status, phase, self.validate_receipt_status) {
            ExecutionState::Retry => {
                trace!(transaction_id = %transaction_id, status = %status, "Consensus still pending");
                Ok(PollDecision::Again(status))
            }
            ExecutionState::Finished => {
                debug!(transaction_id = %transaction_id, status = %status, "Outcome settled");
                Ok(PollDecision::Settled)
            }
            ExecutionState::Error => Err(classify(status, phase, ctx)),
        }
    }
}

enum PollStep {
    Settled(Receipt),
    Again(StatusCode),
}

enum PollDecision {
    Settled,
    Again(StatusCode),
}
