//! Resilience layer: bounded retry with backoff/jitter plus
//! memory-pressure governance, composed by [`ResilienceManager`].

pub mod manager;
pub mod memory;
pub mod retry;

pub use manager::ResilienceManager;
pub use memory::{
    parse_meminfo_available_mb, parse_status_rss_mb, CleanupHook, MemoryGovernor, MemoryProbe,
    MemorySnapshot, MemoryThreshold, MonitorHandle, PressureState, ProcProbe,
};
pub use retry::{RetryConfig, RetryExecutor};
