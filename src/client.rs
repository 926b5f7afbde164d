//! Ledger client facade
//!
//! Ties the pipeline together: build and freeze a transaction against the
//! node table, sign it with the operator key, dispatch per attempt through
//! the retry controller, and poll the settlement outcome. Many independent
//! submissions may be in flight concurrently; they share nothing mutable
//! beyond the process-wide identifier set.

use crate::config::ClientConfig;
use crate::exec::errors::{classify, ExecuteError, FailureContext};
use crate::exec::poller::Poller;
use crate::exec::retry::{execute_with_retry, AttemptVerdict, RetryConfig};
use crate::exec::status::{decide, ExecutionState, Phase};
use crate::net::dispatcher::{DispatchAttempt, Dispatcher};
use crate::net::node_pool::NodePool;
use crate::net::transport::{NodeAddress, Transport};
use crate::operator::Operator;
use crate::tx::body::OperationBody;
use crate::tx::builder::{FrozenTransaction, TransactionBuilder};
use crate::txid;
use crate::types::{Outcome, Receipt, Record, TransactionId};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Client over one operator identity and one node table
pub struct LedgerClient {
    operator: Operator,
    pool: Arc<NodePool>,
    dispatcher: Arc<Dispatcher>,
    config: ClientConfig,
}

impl LedgerClient {
    pub fn new(
        config: ClientConfig,
        operator: Operator,
        transport: Arc<dyn Transport>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let addresses = config
            .network
            .nodes
            .iter()
            .map(|n| NodeAddress {
                account: crate::types::AccountId(n.account),
                address: n.address.clone(),
            })
            .collect();
        let pool = Arc::new(NodePool::new(
            addresses,
            config.network.failure_threshold,
            Duration::from_secs(config.network.cooldown_secs),
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            transport,
            Duration::from_millis(config.network.request_timeout_ms),
        ));
        Ok(Self {
            operator,
            pool,
            dispatcher,
            config,
        })
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    /// Submits one operation and waits for its settled outcome.
    ///
    /// Operations whose payload spans multiple chunks must go through
    /// [`submit_chunked`](Self::submit_chunked) so the caller receives one
    /// outcome per chunk.
    #[instrument(skip(self, operation), fields(kind = operation.kind()))]
    pub async fn submit(&self, operation: OperationBody) -> Result<Outcome, ExecuteError> {
        let frozen = self.freeze_and_sign(operation)?;
        if frozen.chunk_count() != 1 {
            return Err(ExecuteError::Configuration(format!(
                "payload spans {} chunks; use submit_chunked",
                frozen.chunk_count()
            )));
        }
        let mut outcomes = self.drive_group(frozen).await?;
        Ok(outcomes.remove(0))
    }

    /// Splits `payload` into chunks and submits them strictly in chunk
    /// order, returning one outcome per chunk.
    ///
    /// Chunk N+1 is not dispatched until chunk N's dispatch has been
    /// attempted; interleaving would break the ordering assumption carried
    /// by the chunk group metadata.
    #[instrument(skip(self, operation, payload), fields(kind = operation.kind(), payload_len = payload.len()))]
    pub async fn submit_chunked(
        &self,
        operation: OperationBody,
        payload: &[u8],
    ) -> Result<Vec<Outcome>, ExecuteError> {
        let operation = match operation {
            OperationBody::TopicMessageSubmit { topic_id, .. } => {
                OperationBody::TopicMessageSubmit {
                    topic_id,
                    message: payload.to_vec(),
                    chunk_info: None,
                }
            }
            other => {
                return Err(ExecuteError::Configuration(format!(
                    "operation '{}' does not carry a chunkable payload",
                    other.kind()
                )))
            }
        };
        self.submit_group(operation).await
    }

    /// Dispatches one operation without waiting for consensus; the returned
    /// outcome is `Pending` and the caller polls later via
    /// [`receipt_for`](Self::receipt_for).
    pub async fn submit_nowait(&self, operation: OperationBody) -> Result<Outcome, ExecuteError> {
        let frozen = self.freeze_and_sign(operation)?;
        if frozen.chunk_count() != 1 {
            return Err(ExecuteError::Configuration(
                "submit_nowait does not support chunked payloads".to_string(),
            ));
        }
        let shared = Arc::new(Mutex::new(frozen));
        let transaction_id = shared.lock().transaction_id();
        self.run_chunk_dispatch(shared, 0).await?;
        Ok(Outcome::Pending { transaction_id })
    }

    /// Polls any eligible node for the receipt of a previous submission
    pub async fn receipt_for(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Receipt, ExecuteError> {
        let (_, node) = self.pool.select()?;
        self.poller().await_receipt(transaction_id, &node).await
    }

    /// Polls any eligible node for the detailed record of a previous
    /// submission
    pub async fn record_for(&self, transaction_id: TransactionId) -> Result<Record, ExecuteError> {
        let (_, node) = self.pool.select()?;
        self.poller().await_record(transaction_id, &node).await
    }

    fn poller(&self) -> Poller<'_> {
        Poller::new(
            &self.dispatcher,
            RetryConfig::from(&self.config.retry),
            &self.config.execution,
        )
    }

    fn freeze_and_sign(&self, operation: OperationBody) -> Result<FrozenTransaction, ExecuteError> {
        let transaction_id = txid::generate(self.operator.account());
        let mut frozen = TransactionBuilder::new()
            .operation(operation)
            .chunk_limits(self.config.chunking.chunk_size, self.config.chunking.max_chunks)
            .freeze(&self.pool.accounts(), transaction_id)?;
        frozen.sign(&self.operator)?;
        Ok(frozen)
    }

    async fn submit_group(&self, operation: OperationBody) -> Result<Vec<Outcome>, ExecuteError> {
        // Chunk-ceiling violations surface here, before any dispatch.
        let frozen = self.freeze_and_sign(operation)?;
        self.drive_group(frozen).await
    }

    async fn drive_group(&self, frozen: FrozenTransaction) -> Result<Vec<Outcome>, ExecuteError> {
        let chunk_count = frozen.chunk_count();
        let group_id = frozen.transaction_id();
        let shared = Arc::new(Mutex::new(frozen));

        let mut outcomes = Vec::with_capacity(chunk_count);
        for chunk in 0..chunk_count {
            let outcome = self.run_chunk(shared.clone(), chunk).await?;
            outcomes.push(outcome);
        }

        info!(
            group_id = %group_id,
            chunks = chunk_count,
            succeeded = outcomes.iter().filter(|o| o.is_success()).count(),
            "Submission group settled"
        );
        Ok(outcomes)
    }

    /// Drives one chunk through dispatch + poll under the retry controller.
    ///
    /// Classified ledger failures come back as failure `Outcome`s so callers
    /// keep the pending/failed/succeeded distinction; local precondition and
    /// exhaustion errors propagate as typed errors.
    async fn run_chunk(
        &self,
        shared: Arc<Mutex<FrozenTransaction>>,
        chunk: usize,
    ) -> Result<Outcome, ExecuteError> {
        match self.run_chunk_settled(shared, chunk).await {
            Ok(outcome) => Ok(outcome),
            Err(ExecuteError::Precheck {
                status,
                transaction_id,
                node,
            }) => Ok(Outcome::PrecheckFailure {
                transaction_id,
                node,
                status,
            }),
            Err(ExecuteError::Receipt {
                status,
                transaction_id,
                receipt,
            }) => Ok(Outcome::ConsensusFailure {
                transaction_id,
                status,
                receipt,
            }),
            Err(ExecuteError::Record {
                status,
                transaction_id,
                record,
            }) => Ok(Outcome::ConsensusFailure {
                transaction_id,
                status,
                receipt: record.map(|r| r.receipt),
            }),
            Err(other) => Err(other),
        }
    }

    async fn run_chunk_settled(
        &self,
        shared: Arc<Mutex<FrozenTransaction>>,
        chunk: usize,
    ) -> Result<Outcome, ExecuteError> {
        let retry_config = RetryConfig::from(&self.config.retry);
        let operator = self.operator.clone();
        let pool = self.pool.clone();
        let dispatcher = self.dispatcher.clone();
        let execution = self.config.execution.clone();

        execute_with_retry("submit_chunk", &retry_config, move |ctx| {
            let operator = operator.clone();
            let pool = pool.clone();
            let dispatcher = dispatcher.clone();
            let execution = execution.clone();
            let shared = shared.clone();
            async move {
                if ctx.rebuild_requested {
                    rebuild_chunk_identifier(&shared, chunk, &operator)?;
                }

                let (node_index, node) = pool.select()?;
                let (transaction_id, envelope) = {
                    let frozen = shared.lock();
                    (
                        frozen.transaction_id_for_chunk(chunk)?,
                        frozen.envelope(chunk, node_index)?,
                    )
                };

                let mut attempt = DispatchAttempt::new(node.account, ctx.number);
                let status = match dispatcher.dispatch(&node, &envelope, &mut attempt).await {
                    Ok(status) => status,
                    Err(transport_err) => {
                        pool.record_result(node.account, false);
                        return Err(transport_err.into());
                    }
                };
                pool.record_result(node.account, true);

                match decide(status, Phase::Precheck, true) {
                    ExecutionState::Retry => {
                        return Ok(AttemptVerdict::RetryTransient {
                            status: Some(status),
                        })
                    }
                    ExecutionState::Error => {
                        return Err(classify(
                            status,
                            Phase::Precheck,
                            FailureContext {
                                transaction_id,
                                node: Some(node.account),
                                ..Default::default()
                            },
                        ))
                    }
                    ExecutionState::Finished => {}
                }

                let poller = Poller::new(&dispatcher, RetryConfig::default(), &execution);
                let receipt = poller.await_receipt(transaction_id, &node).await?;
                Ok(AttemptVerdict::Done(Outcome::Success {
                    transaction_id,
                    receipt,
                }))
            }
        })
        .await
    }

    /// Precheck-only dispatch used by [`submit_nowait`](Self::submit_nowait)
    async fn run_chunk_dispatch(
        &self,
        shared: Arc<Mutex<FrozenTransaction>>,
        chunk: usize,
    ) -> Result<(), ExecuteError> {
        let retry_config = RetryConfig::from(&self.config.retry);
        let operator = self.operator.clone();
        let pool = self.pool.clone();
        let dispatcher = self.dispatcher.clone();

        execute_with_retry("dispatch_chunk", &retry_config, move |ctx| {
            let operator = operator.clone();
            let pool = pool.clone();
            let dispatcher = dispatcher.clone();
            let shared = shared.clone();
            async move {
                if ctx.rebuild_requested {
                    rebuild_chunk_identifier(&shared, chunk, &operator)?;
                }

                let (node_index, node) = pool.select()?;
                let (transaction_id, envelope) = {
                    let frozen = shared.lock();
                    (
                        frozen.transaction_id_for_chunk(chunk)?,
                        frozen.envelope(chunk, node_index)?,
                    )
                };

                let mut attempt = DispatchAttempt::new(node.account, ctx.number);
                let status = match dispatcher.dispatch(&node, &envelope, &mut attempt).await {
                    Ok(status) => status,
                    Err(transport_err) => {
                        pool.record_result(node.account, false);
                        return Err(transport_err.into());
                    }
                };
                pool.record_result(node.account, true);

                match decide(status, Phase::Precheck, true) {
                    ExecutionState::Retry => Ok(AttemptVerdict::RetryTransient {
                        status: Some(status),
                    }),
                    ExecutionState::Error => Err(classify(
                        status,
                        Phase::Precheck,
                        FailureContext {
                            transaction_id,
                            node: Some(node.account),
                            ..Default::default()
                        },
                    )),
                    ExecutionState::Finished => Ok(AttemptVerdict::Done(())),
                }
            }
        })
        .await
    }
}

/// Regenerates one chunk's transaction identifier after a consensus-level
/// throttle.
///
/// Only identifiers generated under the operator's own payer account are
/// eligible: the client cannot legally re-sign on another payer's behalf, so
/// a third-party identifier fails fast with a configuration error.
fn rebuild_chunk_identifier(
    shared: &Arc<Mutex<FrozenTransaction>>,
    chunk: usize,
    operator: &Operator,
) -> Result<(), ExecuteError> {
    let mut frozen = shared.lock();
    let failed = frozen.transaction_id_for_chunk(chunk)?;
    if failed.payer != operator.account() {
        return Err(ExecuteError::Configuration(format!(
            "cannot rebuild {failed}: payer is not the operator account {}",
            operator.account()
        )));
    }
    let fresh = txid::generate(operator.account());
    frozen.rebuild_chunk(chunk, fresh, operator)?;
    info!(old = %failed, new = %fresh, "Identifier rebuilt after consensus throttle");
    Ok(())
}
