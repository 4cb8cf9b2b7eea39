//! Latency and memory measurement.
//!
//! Memory is the resident set size of the whole process, so concurrent
//! work inflates it. Benchmarks that need reproducible reports turn
//! resource recording off.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::debug;

/// Measured cost of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    /// Wall-clock time in milliseconds.
    pub latency_ms: f64,
    /// Peak process RSS observed, in megabytes.
    pub peak_memory_mb: f64,
}

/// Samples process memory while an operation runs.
///
/// # Examples
///
/// ```
/// use chunkbench::evaluation::ResourceProbe;
///
/// let mut probe = ResourceProbe::start();
/// let _work: Vec<u64> = (0..1_000).collect();
/// probe.sample();
/// let usage = probe.finish();
/// assert!(usage.latency_ms >= 0.0);
/// ```
pub struct ResourceProbe {
    system: System,
    pid: Pid,
    started: Instant,
    peak_memory_mb: f64,
}

impl ResourceProbe {
    /// Starts timing and records baseline memory.
    #[must_use]
    pub fn start() -> Self {
        let mut probe = Self {
            system: System::new(),
            pid: Pid::from_u32(std::process::id()),
            started: Instant::now(),
            peak_memory_mb: 0.0,
        };
        probe.sample();
        probe
    }

    /// Current process memory in megabytes, 0 if unavailable.
    #[allow(clippy::cast_precision_loss)]
    fn process_memory_mb(&mut self) -> f64 {
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);
        self.system
            .process(self.pid)
            .map_or(0.0, |process| process.memory() as f64 / (1024.0 * 1024.0))
    }

    /// Records the current memory if it is a new peak.
    pub fn sample(&mut self) {
        let current = self.process_memory_mb();
        if current > self.peak_memory_mb {
            self.peak_memory_mb = current;
        }
    }

    /// Time since the probe started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Stops the probe and returns what it measured.
    #[must_use]
    pub fn finish(mut self) -> ResourceUsage {
        self.sample();
        let usage = ResourceUsage {
            latency_ms: self.elapsed().as_secs_f64() * 1000.0,
            peak_memory_mb: self.peak_memory_mb,
        };
        debug!(
            latency_ms = usage.latency_ms,
            peak_memory_mb = usage.peak_memory_mb,
            "resource probe finished"
        );
        usage
    }
}
