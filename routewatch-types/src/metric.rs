//! Metric kinds partitioning the chain store.

use core::fmt;

/// The kind of series a chain holds.
///
/// Every chain is addressed by a (target, kind) pair. Route kinds are fed by
/// one route probe; host kinds are each fed by their own sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MetricKind {
    /// Request/response delay in milliseconds.
    Delay,
    /// Response length in bytes.
    Length,
    /// Response status code.
    Status,
    /// Aggregate CPU utilization.
    Cpu,
    /// Virtual memory snapshot.
    Memory,
    /// Disk I/O delta and cached volume.
    Disk,
}

impl MetricKind {
    /// Kinds written for every route probe, in write order.
    pub const ROUTE: [MetricKind; 3] = [MetricKind::Delay, MetricKind::Length, MetricKind::Status];

    /// Kinds written by the host samplers.
    pub const HOST: [MetricKind; 3] = [MetricKind::Cpu, MetricKind::Memory, MetricKind::Disk];

    /// Suffix used in chain file names.
    pub fn suffix(&self) -> &'static str {
        match self {
            MetricKind::Delay => "delay",
            MetricKind::Length => "length",
            MetricKind::Status => "status",
            MetricKind::Cpu => "cpu",
            MetricKind::Memory => "memory",
            MetricKind::Disk => "disk",
        }
    }

    /// Index of the payload field that becomes the block datapoint.
    ///
    /// Memory blocks plot the used percentage; disk blocks plot the I/O delta.
    pub fn datapoint_field(&self) -> usize {
        match self {
            MetricKind::Delay => 0,
            MetricKind::Length => 1,
            MetricKind::Status => 2,
            MetricKind::Cpu => 0,
            MetricKind::Memory => 3,
            MetricKind::Disk => 0,
        }
    }

    /// Returns true for kinds fed by route probes.
    pub fn is_route(&self) -> bool {
        matches!(self, MetricKind::Delay | MetricKind::Length | MetricKind::Status)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}
