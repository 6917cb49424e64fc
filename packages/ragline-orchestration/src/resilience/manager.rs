//! Retry and memory governance composed around one unit of work.

use crate::error::Result;
use crate::resilience::memory::{MemoryGovernor, PressureState};
use crate::resilience::retry::RetryExecutor;
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

/// Wraps an async operation with bounded retry and memory-pressure
/// mitigation. Explicitly constructed and injected into each owner —
/// process-wide peak tracking comes from sharing one governor, not from
/// a global.
pub struct ResilienceManager {
    retry: RetryExecutor,
    governor: Arc<MemoryGovernor>,
}

impl ResilienceManager {
    pub fn new(retry: RetryExecutor, governor: Arc<MemoryGovernor>) -> Self {
        Self { retry, governor }
    }

    pub fn governor(&self) -> &Arc<MemoryGovernor> {
        &self.governor
    }

    pub fn retry(&self) -> &RetryExecutor {
        &self.retry
    }

    /// Pre-check (forced cleanup when already critical/emergency), run
    /// the operation under retry, post-check (soft cleanup on warning).
    /// A propagated failure gets one best-effort cleanup on the way out;
    /// the original error is never hidden, and memory is never left
    /// unmanaged across the call boundary.
    pub async fn execute_with_resilience<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let snapshot = self.governor.sample();
        let state = self.governor.classify(&snapshot);
        if matches!(state, PressureState::Critical | PressureState::Emergency) {
            warn!(
                "ResilienceManager: {} MB ({:?}) before run, forcing cleanup",
                snapshot.current_mb, state
            );
            self.governor.cleanup(true);
        }

        let result = self.retry.execute(op).await;

        match result {
            Ok(value) => {
                let snapshot = self.governor.sample();
                if self.governor.classify(&snapshot) == PressureState::Warning {
                    self.governor.cleanup(false);
                }
                Ok(value)
            }
            Err(e) => {
                // Best-effort cleanup; the caller gets the original error.
                self.governor.cleanup(true);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::resilience::memory::{MemoryProbe, MemoryThreshold};
    use crate::resilience::retry::RetryConfig;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::time::Duration;

    struct StaticProbe {
        current: AtomicU64,
    }

    impl MemoryProbe for Arc<StaticProbe> {
        fn current_mb(&self) -> Option<u64> {
            Some(self.current.load(Ordering::SeqCst))
        }

        fn available_mb(&self) -> Option<u64> {
            Some(4096)
        }
    }

    fn manager_at(current_mb: u64) -> (ResilienceManager, Arc<AtomicUsize>) {
        let probe = Arc::new(StaticProbe {
            current: AtomicU64::new(current_mb),
        });
        let governor = Arc::new(MemoryGovernor::with_probe(
            MemoryThreshold::default(),
            Box::new(probe),
        ));

        let cleanups = Arc::new(AtomicUsize::new(0));
        let cleanups_in = cleanups.clone();
        governor.register_cleanup(Box::new(move |_| {
            cleanups_in.fetch_add(1, Ordering::SeqCst);
        }));

        let retry = RetryExecutor::new(RetryConfig {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            exponential_base: 2.0,
            jitter: false,
        });

        (ResilienceManager::new(retry, governor), cleanups)
    }

    #[tokio::test]
    async fn test_success_passes_value_through() {
        let (manager, cleanups) = manager_at(100);

        let value = manager
            .execute_with_resilience(|_| async { Ok(42) })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(cleanups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_precheck_forces_cleanup_under_critical_pressure() {
        let (manager, cleanups) = manager_at(2500);

        manager
            .execute_with_resilience(|_| async { Ok(()) })
            .await
            .unwrap();

        assert!(cleanups.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_warning_after_success_triggers_soft_cleanup() {
        let (manager, cleanups) = manager_at(1200);

        manager
            .execute_with_resilience(|_| async { Ok(()) })
            .await
            .unwrap();

        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_cleanup_and_preserve_error() {
        let (manager, cleanups) = manager_at(100);
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_in = calls.clone();
        let result: Result<()> = manager
            .execute_with_resilience(move |_| {
                let calls = calls_in.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(PipelineError::LanguageModel("offline".to_string()))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(result.unwrap_err(), PipelineError::LanguageModel(_)));
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }
}
