//! Host resource samplers.
//!
//! Samplers read raw counters through the [`HostCounters`] trait and turn
//! them into observations. The CPU sampler measures over a 1 second window
//! and the disk sampler compares two readings 3 seconds apart; both windows
//! are configurable.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use routewatch_types::{CpuUsage, DiskStats, MemoryStats, MetricKind, Observation};
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

use crate::MetricUnavailable;

/// Default CPU sampling window.
pub const DEFAULT_CPU_WINDOW: Duration = Duration::from_secs(1);

/// Default disk sampling window.
pub const DEFAULT_DISK_WINDOW: Duration = Duration::from_secs(3);

/// Raw memory counters in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryCounters {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub free: u64,
    pub cached: u64,
}

/// Source of OS-level counters.
pub trait HostCounters: Send + Sync + Debug {
    /// Aggregate CPU utilization since the previous call.
    fn cpu_usage(&self) -> Result<f64, MetricUnavailable>;

    /// Current memory counters.
    fn memory(&self) -> Result<MemoryCounters, MetricUnavailable>;
}

/// Counters read through `sysinfo`.
#[derive(Debug)]
pub struct SysinfoCounters {
    sys: Mutex<System>,
}

impl SysinfoCounters {
    pub fn new() -> Self {
        let sys = System::new_with_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::everything())
                .with_memory(MemoryRefreshKind::everything()),
        );
        Self {
            sys: Mutex::new(sys),
        }
    }
}

impl Default for SysinfoCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl HostCounters for SysinfoCounters {
    fn cpu_usage(&self) -> Result<f64, MetricUnavailable> {
        let mut sys = self.sys.lock();
        sys.refresh_cpu();
        if sys.cpus().is_empty() {
            return Err(MetricUnavailable::new(MetricKind::Cpu, "no CPUs reported"));
        }
        Ok(sys.global_cpu_info().cpu_usage() as f64)
    }

    fn memory(&self) -> Result<MemoryCounters, MetricUnavailable> {
        let mut sys = self.sys.lock();
        sys.refresh_memory();

        let total = sys.total_memory();
        if total == 0 {
            return Err(MetricUnavailable::new(MetricKind::Memory, "total memory reported as zero"));
        }
        let available = sys.available_memory();
        let free = sys.free_memory();

        Ok(MemoryCounters {
            total,
            available,
            used: sys.used_memory(),
            free,
            // Reclaimable memory (page cache and buffers) is what is
            // available beyond the truly free pages.
            cached: available.saturating_sub(free),
        })
    }
}

/// Produces CPU, memory and disk observations.
#[derive(Debug, Clone)]
pub struct HostSampler {
    counters: Arc<dyn HostCounters>,
    cpu_window: Duration,
    disk_window: Duration,
}

impl HostSampler {
    /// Create a sampler with the default windows.
    pub fn new(counters: Arc<dyn HostCounters>) -> Self {
        Self {
            counters,
            cpu_window: DEFAULT_CPU_WINDOW,
            disk_window: DEFAULT_DISK_WINDOW,
        }
    }

    /// Set the CPU sampling window.
    pub fn cpu_window(mut self, window: Duration) -> Self {
        self.cpu_window = window;
        self
    }

    /// Set the disk sampling window.
    pub fn disk_window(mut self, window: Duration) -> Self {
        self.disk_window = window;
        self
    }

    /// How long sampling `kind` waits between readings.
    pub fn window(&self, kind: MetricKind) -> Duration {
        match kind {
            MetricKind::Cpu => self.cpu_window,
            MetricKind::Disk => self.disk_window,
            _ => Duration::ZERO,
        }
    }

    /// CPU utilization over the CPU window, in percent.
    pub async fn cpu(&self) -> Result<CpuUsage, MetricUnavailable> {
        // The first reading only starts the measurement window.
        self.counters.cpu_usage()?;
        tokio::time::sleep(self.cpu_window).await;
        let percent = self.counters.cpu_usage()?;
        Ok(CpuUsage { percent })
    }

    /// Virtual memory snapshot in megabytes.
    pub async fn memory(&self) -> Result<MemoryStats, MetricUnavailable> {
        let m = self.counters.memory()?;
        Ok(MemoryStats::from_bytes(m.total, m.available, m.used, m.free))
    }

    /// Used-bytes delta over the disk window and closing cached volume.
    pub async fn disk(&self) -> Result<DiskStats, MetricUnavailable> {
        let before = self.counters.memory().map_err(into_disk)?;
        tokio::time::sleep(self.disk_window).await;
        let after = self.counters.memory().map_err(into_disk)?;
        Ok(DiskStats::from_readings(before.used, after.used, after.cached))
    }

    /// Sample the host metric of `kind`.
    pub async fn sample(&self, kind: MetricKind) -> Result<Observation, MetricUnavailable> {
        match kind {
            MetricKind::Cpu => self.cpu().await.map(Observation::Cpu),
            MetricKind::Memory => self.memory().await.map(Observation::Memory),
            MetricKind::Disk => self.disk().await.map(Observation::Disk),
            other => Err(MetricUnavailable::new(other, "not a host metric")),
        }
    }
}

fn into_disk(e: MetricUnavailable) -> MetricUnavailable {
    MetricUnavailable::new(MetricKind::Disk, e.reason)
}
