//! Sequential retry with a clamped backoff schedule.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::core::{OperationKind, RetryConfig};
use crate::{ProverError, ProverResult};

use super::errors::{ErrorLog, ErrorRecord};

/// Attempt limit plus backoff schedule for one kind of operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delays: Vec<Duration>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delays_ms: &[u64]) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            delays: delays_ms.iter().copied().map(Duration::from_millis).collect(),
        }
    }

    /// Policy used for compile and setup.
    pub fn standard(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, &config.delays_ms)
    }

    /// Policy used for proof generation.
    pub fn heavy(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, &config.proof_delays_ms)
    }

    /// Delay to wait after failed attempt `attempt` (1-based).
    ///
    /// Attempts past the end of the schedule reuse its last entry.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let idx = (attempt.saturating_sub(1) as usize).min(self.delays.len().saturating_sub(1));
        self.delays.get(idx).copied().unwrap_or(Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard(&RetryConfig::default())
    }
}

/// Runs fallible async operations under a [`RetryPolicy`], logging each failure.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    log: Arc<ErrorLog>,
    detailed: bool,
}

impl RetryExecutor {
    pub fn new(log: Arc<ErrorLog>, detailed: bool) -> Self {
        RetryExecutor { log, detailed }
    }

    pub fn log(&self) -> &Arc<ErrorLog> {
        &self.log
    }

    /// Whether records carry the error's debug rendering.
    pub fn detailed(&self) -> bool {
        self.detailed
    }

    /// Executor with the same settings writing to a fresh, private log.
    pub fn staged(&self) -> RetryExecutor {
        RetryExecutor::new(Arc::new(ErrorLog::new()), self.detailed)
    }

    /// Call `op` until it succeeds or `policy.max_attempts` attempts have failed.
    ///
    /// Every failure is recorded, whatever its kind. Exhaustion yields
    /// [`ProverError::RetriesExhausted`] carrying the last failure message.
    pub async fn run<T, F, Fut>(
        &self,
        operation: OperationKind,
        policy: &RetryPolicy,
        mut op: F,
    ) -> ProverResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProverResult<T>>,
    {
        let max_attempts = policy.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(%operation, attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => {
                    self.log
                        .record(ErrorRecord::from_error(&e, operation, attempt, self.detailed));
                    last_error = e.to_string();
                    if attempt < max_attempts {
                        let delay = policy.delay_for(attempt);
                        tracing::warn!(
                            %operation,
                            attempt,
                            max_attempts,
                            "attempt failed, retrying in {delay:?}: {e}"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(ProverError::RetriesExhausted {
            operation,
            attempts: max_attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn executor() -> (RetryExecutor, Arc<ErrorLog>) {
        let log = Arc::new(ErrorLog::new());
        (RetryExecutor::new(Arc::clone(&log), false), log)
    }

    #[test]
    fn test_delay_clamps_to_last_entry() {
        let policy = RetryPolicy::new(5, &[1000, 2000, 5000]);
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(5000));
        assert_eq!(policy.delay_for(7), Duration::from_millis(5000));
    }

    #[test]
    fn test_empty_schedule_means_no_delay() {
        let policy = RetryPolicy::new(3, &[]);
        assert_eq!(policy.delay_for(2), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let (exec, log) = executor();
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3, &[1, 1, 1]);

        let c = Arc::clone(&calls);
        let result = exec
            .run(OperationKind::Compile, &policy, || {
                let c = Arc::clone(&c);
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ProverError::Message("temporary glitch".into()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(log.len(), 2);
        let attempts: Vec<u32> = log.stats().recent.iter().map(|r| r.attempt).collect();
        assert_eq!(attempts, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_operation_and_attempts() {
        let (exec, log) = executor();
        let policy = RetryPolicy::new(3, &[1, 1, 1]);

        let err = exec
            .run(OperationKind::Setup, &policy, || async {
                Err::<(), _>(ProverError::Message("always broken".into()))
            })
            .await
            .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("setup"), "{msg}");
        assert!(msg.contains('3'), "{msg}");
        assert!(msg.contains("always broken"), "{msg}");
        assert_eq!(log.stats().by_operation[&OperationKind::Setup], 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleeps_follow_schedule() {
        let (exec, _log) = executor();
        let policy = RetryPolicy::new(3, &[1000, 2000, 5000]);
        let start = tokio::time::Instant::now();

        let _ = exec
            .run(OperationKind::GenerateProof, &policy, || async {
                Err::<(), _>(ProverError::Message("no".into()))
            })
            .await;

        // no sleep after the final attempt
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(3000), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(5000), "{elapsed:?}");
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let (exec, _log) = executor();
        let policy = RetryPolicy {
            max_attempts: 0,
            delays: vec![],
        };
        let out = exec
            .run(OperationKind::Compile, &policy, || async { Ok::<_, ProverError>(1) })
            .await;
        assert_eq!(out.unwrap(), 1);
    }
}
