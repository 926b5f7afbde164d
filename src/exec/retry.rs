//! Retry/backoff controller
//!
//! Drives repeated dispatch attempts across node failures, precheck
//! rejections, and consensus-level throttling: exponential backoff from a
//! 250 ms base, doubling per attempt, capped by `max_backoff_ms` and
//! `max_attempts`. A consensus-level throttle additionally forces the caller
//! to rebuild the transaction with a fresh identifier before the next
//! attempt; reusing the original would collide with the already-recorded
//! failed transaction.

use crate::config::RetrySection;
use crate::exec::errors::ExecuteError;
use crate::types::StatusCode;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Backoff and attempt ceilings
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum attempts, including the initial one
    pub max_attempts: u32,
    /// Initial backoff delay in milliseconds
    pub base_backoff_ms: u64,
    /// Backoff ceiling in milliseconds
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff_ms: 250,
            max_backoff_ms: 16_000,
        }
    }
}

impl RetryConfig {
    /// Delay before the attempt after `attempt` (0-indexed): base * 2^attempt,
    /// capped at the ceiling
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_backoff_ms
            .saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
        Duration::from_millis(exp.min(self.max_backoff_ms))
    }
}

impl From<&RetrySection> for RetryConfig {
    fn from(section: &RetrySection) -> Self {
        Self {
            max_attempts: section.max_attempts,
            base_backoff_ms: section.base_backoff_ms,
            max_backoff_ms: section.max_backoff_ms,
        }
    }
}

/// What one attempt concluded
#[derive(Debug)]
pub enum AttemptVerdict<T> {
    /// Terminal result; stop
    Done(T),
    /// Transient condition; back off and retry with the same identifier
    RetryTransient { status: Option<StatusCode> },
    /// Throttled at consensus; back off and retry with a REBUILT identifier
    RetryRebuild { status: StatusCode },
}

/// Per-attempt context handed to the operation
#[derive(Debug, Clone, Copy)]
pub struct AttemptCtx {
    /// 1-based attempt number
    pub number: u32,
    /// The previous attempt was throttled at consensus; the operation must
    /// regenerate its transaction identifier before dispatching
    pub rebuild_requested: bool,
}

/// Runs `attempt_fn` until it finishes, fails terminally, or the ceilings are
/// exhausted.
///
/// Retryable errors (`ExecuteError::is_retryable`) are absorbed into the
/// backoff loop; errors demanding an identifier rebuild set the flag on the
/// next attempt's context; everything else propagates immediately.
pub async fn execute_with_retry<T, F, Fut>(
    operation_name: &str,
    config: &RetryConfig,
    mut attempt_fn: F,
) -> Result<T, ExecuteError>
where
    F: FnMut(AttemptCtx) -> Fut,
    Fut: Future<Output = Result<AttemptVerdict<T>, ExecuteError>>,
{
    let mut last_status: Option<StatusCode> = None;
    let mut rebuild_requested = false;

    for attempt in 0..config.max_attempts {
        let ctx = AttemptCtx {
            number: attempt + 1,
            rebuild_requested,
        };
        rebuild_requested = false;

        match attempt_fn(ctx).await {
            Ok(AttemptVerdict::Done(value)) => {
                if attempt > 0 {
                    debug!(
                        operation = operation_name,
                        attempts = attempt + 1,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Ok(AttemptVerdict::RetryTransient { status }) => {
                last_status = status.or(last_status);
            }
            Ok(AttemptVerdict::RetryRebuild { status }) => {
                last_status = Some(status);
                rebuild_requested = true;
            }
            Err(err) if err.requires_rebuild() => {
                last_status = err.status().or(last_status);
                rebuild_requested = true;
            }
            Err(err) if err.is_retryable() => {
                last_status = err.status().or(last_status);
            }
            Err(err) => return Err(err),
        }

        if attempt + 1 < config.max_attempts {
            let delay = config.backoff_for(attempt);
            debug!(
                operation = operation_name,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                rebuild = rebuild_requested,
                last_status = ?last_status,
                "Backing off before retry"
            );
            sleep(delay).await;
        }
    }

    warn!(
        operation = operation_name,
        attempts = config.max_attempts,
        last_status = ?last_status,
        "Retries exhausted"
    );
    metrics::counter!("ledgerlink_retry_exhausted").increment(1);
    Err(ExecuteError::RetryExhausted {
        attempts: config.max_attempts,
        last_status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::time::Instant;

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            ..RetryConfig::default()
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff_for(0), Duration::from_millis(250));
        assert_eq!(config.backoff_for(1), Duration::from_millis(500));
        assert_eq!(config.backoff_for(2), Duration::from_millis(1000));
        assert_eq!(config.backoff_for(6), Duration::from_millis(16_000));
        assert_eq!(config.backoff_for(63), Duration::from_millis(16_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_three_times_then_done() {
        let attempts = Arc::new(Mutex::new(Vec::<(u32, Instant)>::new()));
        let attempts_ref = attempts.clone();

        let result = execute_with_retry("test_op", &fast_config(5), |ctx| {
            let attempts = attempts_ref.clone();
            async move {
                attempts.lock().push((ctx.number, Instant::now()));
                if ctx.number <= 3 {
                    Ok(AttemptVerdict::RetryTransient {
                        status: Some(StatusCode::Busy),
                    })
                } else {
                    Ok(AttemptVerdict::Done("ok"))
                }
            }
        })
        .await
        .expect("fourth attempt succeeds");
        assert_eq!(result, "ok");

        let recorded = attempts.lock();
        assert_eq!(recorded.len(), 4);
        let gaps: Vec<u64> = recorded
            .windows(2)
            .map(|w| (w[1].1 - w[0].1).as_millis() as u64)
            .collect();
        assert_eq!(gaps, vec![250, 500, 1000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_monotone_and_bounded() {
        let instants = Arc::new(Mutex::new(Vec::<Instant>::new()));
        let instants_ref = instants.clone();
        let config = RetryConfig {
            max_attempts: 6,
            base_backoff_ms: 250,
            max_backoff_ms: 2000,
        };

        let err = execute_with_retry("throttled", &config, |_ctx| {
            let instants = instants_ref.clone();
            async move {
                instants.lock().push(Instant::now());
                Ok(AttemptVerdict::<()>::RetryTransient {
                    status: Some(StatusCode::Busy),
                })
            }
        })
        .await
        .expect_err("never succeeds");
        assert!(matches!(
            err,
            ExecuteError::RetryExhausted {
                attempts: 6,
                last_status: Some(StatusCode::Busy),
            }
        ));

        let recorded = instants.lock();
        let gaps: Vec<u64> = recorded
            .windows(2)
            .map(|w| (w[1] - w[0]).as_millis() as u64)
            .collect();
        for pair in gaps.windows(2) {
            assert!(pair[1] >= pair[0], "backoff must be non-decreasing: {gaps:?}");
        }
        assert!(gaps.iter().all(|&g| g <= 2000), "bounded by max: {gaps:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rebuild_flag_set_after_consensus_throttle() {
        let flags = Arc::new(Mutex::new(Vec::<bool>::new()));
        let flags_ref = flags.clone();

        execute_with_retry("rebuild", &fast_config(3), |ctx| {
            let flags = flags_ref.clone();
            async move {
                flags.lock().push(ctx.rebuild_requested);
                if ctx.number == 1 {
                    Ok(AttemptVerdict::RetryRebuild {
                        status: StatusCode::ThrottledAtConsensus,
                    })
                } else {
                    Ok(AttemptVerdict::Done(()))
                }
            }
        })
        .await
        .expect("second attempt succeeds");

        assert_eq!(*flags.lock(), vec![false, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rebuild_triggered_by_error_variant() {
        let flags = Arc::new(Mutex::new(Vec::<bool>::new()));
        let flags_ref = flags.clone();

        execute_with_retry("rebuild_err", &fast_config(3), |ctx| {
            let flags = flags_ref.clone();
            async move {
                flags.lock().push(ctx.rebuild_requested);
                if ctx.number == 1 {
                    Err(ExecuteError::Receipt {
                        status: StatusCode::ThrottledAtConsensus,
                        transaction_id: Default::default(),
                        receipt: None,
                    })
                } else {
                    Ok(AttemptVerdict::Done(()))
                }
            }
        })
        .await
        .expect("second attempt succeeds");

        assert_eq!(*flags.lock(), vec![false, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_propagates_immediately() {
        let calls = Arc::new(Mutex::new(0u32));
        let calls_ref = calls.clone();

        let err = execute_with_retry::<(), _, _>("fatal", &fast_config(5), |_ctx| {
            let calls = calls_ref.clone();
            async move {
                *calls.lock() += 1;
                Err(ExecuteError::Configuration("bad payer".into()))
            }
        })
        .await
        .expect_err("fatal error");
        assert!(matches!(err, ExecuteError::Configuration(_)));
        assert_eq!(*calls.lock(), 1);
    }
}
