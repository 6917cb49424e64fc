//! Memory-pressure governance.
//!
//! Samples process RSS and host availability, classifies the reading
//! against configured thresholds, and mitigates pressure by running
//! registered cleanup hooks plus a best-effort native allocator trim.
//! Pressure is a degraded-mode signal, not a failure: nothing in this
//! module returns an error to the caller.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Pressure thresholds in MB of process RSS. Immutable config.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MemoryThreshold {
    pub warning_mb: u64,
    pub critical_mb: u64,
    pub max_mb: u64,
}

impl Default for MemoryThreshold {
    fn default() -> Self {
        Self {
            warning_mb: 1024,
            critical_mb: 2048,
            max_mb: 3072,
        }
    }
}

/// One on-demand reading. `peak_mb` is monotonic non-decreasing for the
/// lifetime of one governor instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub current_mb: u64,
    pub peak_mb: u64,
    pub available_mb: u64,
    /// Current usage as a percentage of `max_mb`.
    pub percent: f64,
}

/// Exactly one state per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureState {
    Healthy,
    Warning,
    Critical,
    Emergency,
}

/// Source of raw memory readings. Probes return `None` instead of
/// erroring when a signal is unavailable (non-Linux hosts, test fakes).
pub trait MemoryProbe: Send + Sync {
    fn current_mb(&self) -> Option<u64>;
    fn available_mb(&self) -> Option<u64>;
}

/// `/proc`-backed probe: VmRSS from `/proc/self/status`, MemAvailable
/// from `/proc/meminfo`.
#[derive(Debug, Default)]
pub struct ProcProbe;

impl MemoryProbe for ProcProbe {
    fn current_mb(&self) -> Option<u64> {
        let contents = std::fs::read_to_string(Path::new("/proc/self/status")).ok()?;
        parse_status_rss_mb(&contents)
    }

    fn available_mb(&self) -> Option<u64> {
        let contents = std::fs::read_to_string(Path::new("/proc/meminfo")).ok()?;
        parse_meminfo_available_mb(&contents)
    }
}

/// Parse the `VmRSS:` line (kB) out of `/proc/self/status`.
pub fn parse_status_rss_mb(contents: &str) -> Option<u64> {
    parse_kb_field(contents, "VmRSS:")
}

/// Parse the `MemAvailable:` line (kB) out of `/proc/meminfo`.
pub fn parse_meminfo_available_mb(contents: &str) -> Option<u64> {
    parse_kb_field(contents, "MemAvailable:")
}

fn parse_kb_field(contents: &str, field: &str) -> Option<u64> {
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix(field) {
            let kb: u64 = rest.split_whitespace().next()?.parse().ok()?;
            return Some(kb / 1024);
        }
    }
    None
}

/// Cleanup hook. Receives `force`: `false` for advisory trims on
/// warning, `true` for full cleanup on critical/emergency.
pub type CleanupHook = Box<dyn Fn(bool) + Send + Sync>;

/// Memory governor for one owner.
///
/// `peak_mb` is the one mutable piece of governor state; it follows a
/// single-writer rule — one governor instance per sampling owner — and
/// is kept monotonic with an atomic fetch-max so a stray concurrent
/// reader still never observes it decreasing.
pub struct MemoryGovernor {
    thresholds: MemoryThreshold,
    probe: Box<dyn MemoryProbe>,
    peak_mb: AtomicU64,
    hooks: Mutex<Vec<CleanupHook>>,
}

impl MemoryGovernor {
    pub fn new(thresholds: MemoryThreshold) -> Self {
        Self::with_probe(thresholds, Box::new(ProcProbe))
    }

    pub fn with_probe(thresholds: MemoryThreshold, probe: Box<dyn MemoryProbe>) -> Self {
        Self {
            thresholds,
            probe,
            peak_mb: AtomicU64::new(0),
            hooks: Mutex::new(Vec::new()),
        }
    }

    pub fn thresholds(&self) -> MemoryThreshold {
        self.thresholds
    }

    /// Register a cleanup hook (cache trim, buffer drop, ...). Hooks run
    /// in registration order on every cleanup.
    pub fn register_cleanup(&self, hook: CleanupHook) {
        self.hooks.lock().push(hook);
    }

    /// Take one reading. A probe returning nothing yields a zero reading,
    /// which classifies as healthy — sampling never fails the caller.
    pub fn sample(&self) -> MemorySnapshot {
        let current_mb = self.probe.current_mb().unwrap_or(0);
        let available_mb = self.probe.available_mb().unwrap_or(0);

        let peak_mb = self
            .peak_mb
            .fetch_max(current_mb, Ordering::Relaxed)
            .max(current_mb);

        let percent = if self.thresholds.max_mb == 0 {
            0.0
        } else {
            (current_mb as f64 / self.thresholds.max_mb as f64) * 100.0
        };

        MemorySnapshot {
            current_mb,
            peak_mb,
            available_mb,
            percent,
        }
    }

    /// Classify a reading into exactly one pressure state.
    pub fn classify(&self, snapshot: &MemorySnapshot) -> PressureState {
        let t = self.thresholds;
        match snapshot.current_mb {
            mb if mb >= t.max_mb => PressureState::Emergency,
            mb if mb >= t.critical_mb => PressureState::Critical,
            mb if mb >= t.warning_mb => PressureState::Warning,
            _ => PressureState::Healthy,
        }
    }

    /// Sample, classify, and mitigate per the pressure table: warning
    /// gets a non-forced cleanup, critical and emergency a forced one.
    pub fn check_and_mitigate(&self) -> (MemorySnapshot, PressureState) {
        let snapshot = self.sample();
        let state = self.classify(&snapshot);

        match state {
            PressureState::Healthy => {}
            PressureState::Warning => {
                debug!(
                    "MemoryGovernor: warning at {} MB (peak {} MB), soft cleanup",
                    snapshot.current_mb, snapshot.peak_mb
                );
                self.cleanup(false);
            }
            PressureState::Critical => {
                warn!(
                    "MemoryGovernor: critical at {} MB (peak {} MB), forced cleanup",
                    snapshot.current_mb, snapshot.peak_mb
                );
                self.cleanup(true);
            }
            PressureState::Emergency => {
                warn!(
                    "MemoryGovernor: emergency at {} MB >= max {} MB; non-essential work should abort",
                    snapshot.current_mb, self.thresholds.max_mb
                );
                self.cleanup(true);
            }
        }

        (snapshot, state)
    }

    /// Run registered hooks and, when forced, a best-effort native trim.
    /// Never errors; a failed trim is debug-logged and swallowed.
    pub fn cleanup(&self, force: bool) {
        for hook in self.hooks.lock().iter() {
            hook(force);
        }

        if force {
            native_trim();
        }
    }

    /// Spawn the cancellable sampling loop. The owner of the run owns
    /// this handle and must stop it with the run.
    pub fn spawn_monitor(self: &Arc<Self>, interval: Duration) -> MonitorHandle {
        let token = CancellationToken::new();
        let loop_token = token.clone();
        let governor = Arc::clone(self);

        let task = tokio::spawn(async move {
            info!("MemoryGovernor: monitor started, sampling every {:?}", interval);
            loop {
                tokio::select! {
                    _ = loop_token.cancelled() => {
                        info!("MemoryGovernor: monitor cancelled");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        governor.check_and_mitigate();
                    }
                }
            }
        });

        MonitorHandle { token, task }
    }
}

/// Handle to a running monitor loop; cancellation is cooperative and
/// abandons any pending sleep promptly.
pub struct MonitorHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub async fn shutdown(self) {
        self.token.cancel();
        let _ = self.task.await;
    }
}

#[cfg(target_os = "linux")]
fn native_trim() {
    // malloc_trim(0) returns 1 when memory was returned to the OS.
    let released = unsafe { libc::malloc_trim(0) };
    debug!("MemoryGovernor: malloc_trim released={}", released);
}

#[cfg(not(target_os = "linux"))]
fn native_trim() {
    debug!("MemoryGovernor: native trim unavailable on this platform");
}
