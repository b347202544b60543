//! Observations produced by route probes and host samplers.
//!
//! An observation lives only until it is encoded into a block payload. The
//! encoding joins fields with [`BLOCK_DATA_SEPARATOR`] in a fixed order:
//!
//! - route: `delay_ms`, `response_length`, `status_code`
//! - cpu: `percent` (two decimals)
//! - memory: `total`, `available`, `used`, `used_percent`, `free` (MB)
//! - disk: `io_delta_kb`, `cached_mb`

use crate::{MetricKind, BLOCK_DATA_SEPARATOR};

/// Delay reported when a route is excluded or could not be probed.
///
/// Far above any health threshold, so downstream checks always skip it.
pub const SENTINEL_DELAY_MS: i64 = i32::MAX as i64;

/// Status reported for routes whose method is not probed.
pub const UNSUPPORTED_STATUS: u16 = 100;

/// Status reported when no response was received at all.
pub const NO_RESPONSE_STATUS: u16 = 0;

/// Outcome of a single route probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteResponse {
    /// Wall time from request start until the body was received.
    pub delay_ms: i64,
    /// Value of the `Content-Length` header, or -1 when absent.
    pub response_length: i64,
    /// HTTP status code.
    pub status_code: u16,
}

impl RouteResponse {
    /// A response that was actually measured.
    pub fn measured(delay_ms: i64, response_length: i64, status_code: u16) -> Self {
        Self {
            delay_ms,
            response_length,
            status_code,
        }
    }

    /// Sentinel for routes whose method is not probed.
    pub fn unsupported() -> Self {
        Self::measured(SENTINEL_DELAY_MS, 0, UNSUPPORTED_STATUS)
    }

    /// Sentinel for probes that timed out or failed in transport.
    pub fn failed() -> Self {
        Self::measured(SENTINEL_DELAY_MS, 0, NO_RESPONSE_STATUS)
    }

    /// Returns true if this carries the sentinel delay.
    pub fn is_sentinel(&self) -> bool {
        self.delay_ms == SENTINEL_DELAY_MS
    }

    /// Returns true if the probe produced no response.
    pub fn is_failure(&self) -> bool {
        self.is_sentinel() && self.status_code == NO_RESPONSE_STATUS
    }
}

/// Aggregate CPU utilization across all cores.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CpuUsage {
    pub percent: f64,
}

/// Virtual memory snapshot in megabytes.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryStats {
    pub total_mb: u64,
    pub available_mb: u64,
    pub used_mb: u64,
    pub used_percent: f64,
    pub free_mb: u64,
}

impl MemoryStats {
    /// Build from raw byte counters, truncating to megabytes.
    pub fn from_bytes(total: u64, available: u64, used: u64, free: u64) -> Self {
        let used_percent = if total > 0 {
            used as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Self {
            total_mb: total / BYTES_PER_MB,
            available_mb: available / BYTES_PER_MB,
            used_mb: used / BYTES_PER_MB,
            used_percent,
            free_mb: free / BYTES_PER_MB,
        }
    }
}

/// Disk activity over a sampling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiskStats {
    /// Change in used bytes over the window, in kilobytes.
    pub io_delta_kb: i64,
    /// Cached volume at the end of the window, in megabytes.
    pub cached_mb: u64,
}

impl DiskStats {
    /// Build from two used-byte readings and the closing cached-byte reading.
    pub fn from_readings(used_before: u64, used_after: u64, cached_after: u64) -> Self {
        let delta = used_after as i64 - used_before as i64;
        Self {
            io_delta_kb: delta / BYTES_PER_KB as i64,
            cached_mb: cached_after / BYTES_PER_MB,
        }
    }
}

const BYTES_PER_KB: u64 = 1_000;
const BYTES_PER_MB: u64 = 1_000_000;

/// A value produced by exactly one probe task.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Observation {
    Route(RouteResponse),
    Cpu(CpuUsage),
    Memory(MemoryStats),
    Disk(DiskStats),
}

impl Observation {
    /// Serialize the fields into one separator-joined payload.
    pub fn encode(&self) -> String {
        match self {
            Observation::Route(r) => join(&[
                r.delay_ms.to_string(),
                r.response_length.to_string(),
                r.status_code.to_string(),
            ]),
            Observation::Cpu(c) => format!("{:.2}", c.percent),
            Observation::Memory(m) => join(&[
                m.total_mb.to_string(),
                m.available_mb.to_string(),
                m.used_mb.to_string(),
                format!("{:.6}", m.used_percent),
                m.free_mb.to_string(),
            ]),
            Observation::Disk(d) => join(&[d.io_delta_kb.to_string(), d.cached_mb.to_string()]),
        }
    }

    /// The chain kinds this observation is written to.
    pub fn kinds(&self) -> &'static [MetricKind] {
        match self {
            Observation::Route(_) => &MetricKind::ROUTE,
            Observation::Cpu(_) => &[MetricKind::Cpu],
            Observation::Memory(_) => &[MetricKind::Memory],
            Observation::Disk(_) => &[MetricKind::Disk],
        }
    }
}

fn join(fields: &[String]) -> String {
    fields.join(BLOCK_DATA_SEPARATOR)
}
