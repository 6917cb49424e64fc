//! Bounded retry with exponential backoff and jitter.

use crate::error::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Retry policy. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub exponential_base: f64,
    /// Multiply each delay by a uniform [0.5, 1.0] factor so callers
    /// failing together do not retry together.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            exponential_base: 2.0,
            jitter: true,
        }
    }
}

/// Executes an async operation up to `max_attempts` times.
///
/// Success returns immediately. A failure before the last attempt sleeps
/// the backoff delay and tries again; failure on the last attempt
/// re-raises the last error unchanged. Terminal failures are never
/// swallowed.
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Backoff delay for a failure on `attempt` (1-based), before jitter:
    /// `min(base_delay * exponential_base^(attempt-1), max_delay)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let scaled =
            self.config.base_delay.as_secs_f64() * self.config.exponential_base.powi(exponent);

        if !scaled.is_finite() {
            return self.config.max_delay;
        }

        let capped = scaled.clamp(0.0, self.config.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    fn sleep_for(&self, attempt: u32) -> Duration {
        let delay = self.delay_for(attempt);
        if !self.config.jitter {
            return delay;
        }

        let factor: f64 = rand::thread_rng().gen_range(0.5..=1.0);
        Duration::from_secs_f64(delay.as_secs_f64() * factor)
    }

    /// Run `op` until it succeeds or attempts are exhausted. The closure
    /// receives the 1-based attempt number.
    pub async fn execute<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        info!("RetryExecutor: succeeded on attempt {}/{}", attempt, max_attempts);
                    }
                    return Ok(value);
                }
                Err(e) if attempt >= max_attempts => {
                    warn!(
                        "RetryExecutor: attempt {}/{} failed, giving up: {}",
                        attempt, max_attempts, e
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.sleep_for(attempt);
                    warn!(
                        "RetryExecutor: attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            exponential_base: 2.0,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn test_always_failing_op_attempts_exactly_max_then_reraises() {
        let executor = RetryExecutor::new(fast_config(3));
        let calls = Arc::new(AtomicU32::new(0));

        let calls_in = calls.clone();
        let result: Result<()> = executor
            .execute(move |_| {
                let calls = calls_in.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(PipelineError::Retriever("down".to_string()))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(result.unwrap_err(), PipelineError::Retriever(_)));
    }

    #[tokio::test]
    async fn test_success_at_attempt_j_stops_there() {
        let executor = RetryExecutor::new(fast_config(5));
        let calls = Arc::new(AtomicU32::new(0));

        let calls_in = calls.clone();
        let result = executor
            .execute(move |attempt| {
                let calls = calls_in.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if attempt < 2 {
                        Err(PipelineError::Retriever("flaky".to_string()))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_immediate_success_is_single_attempt() {
        let executor = RetryExecutor::new(fast_config(3));
        let result = executor.execute(|attempt| async move { Ok(attempt) }).await.unwrap();
        assert_eq!(result, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_schedule_without_jitter() {
        // base 1s, exponential base 2, fail twice then succeed: the two
        // sleeps are 1s + 2s of virtual time.
        let executor = RetryExecutor::new(RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            exponential_base: 2.0,
            jitter: false,
        });

        let start = tokio::time::Instant::now();
        let result = executor
            .execute(|attempt| async move {
                if attempt <= 2 {
                    Err(PipelineError::Retriever("flaky".to_string()))
                } else {
                    Ok(attempt)
                }
            })
            .await
            .unwrap();

        assert_eq!(result, 3);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_secs(4));
    }

    #[test]
    fn test_delay_growth_and_cap() {
        let executor = RetryExecutor::new(RetryConfig {
            max_attempts: 6,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
            exponential_base: 2.0,
            jitter: false,
        });

        assert_eq!(executor.delay_for(1), Duration::from_secs(1));
        assert_eq!(executor.delay_for(2), Duration::from_secs(2));
        assert_eq!(executor.delay_for(3), Duration::from_secs(4));
        // Capped from here on.
        assert_eq!(executor.delay_for(4), Duration::from_secs(4));
        assert_eq!(executor.delay_for(6), Duration::from_secs(4));
    }

    #[test]
    fn test_jittered_sleep_stays_within_bounds() {
        let executor = RetryExecutor::new(RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            exponential_base: 2.0,
            jitter: true,
        });

        for _ in 0..100 {
            let slept = executor.sleep_for(1);
            assert!(slept >= Duration::from_secs(1));
            assert!(slept <= Duration::from_secs(2));
        }
    }
}
