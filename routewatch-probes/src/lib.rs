//! # routewatch-probes
//!
//! Probe tasks for the routewatch agent: HTTP route probes and host
//! resource samplers. Each call produces exactly one observation.
//!
//! ## Probes
//!
//! - **Route** - request delay, `Content-Length` and status code of a GET route
//! - **CPU** - aggregate utilization over a 1 second window
//! - **Memory** - virtual memory snapshot in megabytes
//! - **Disk** - used-bytes delta over a 3 second window plus cached volume
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use routewatch_probes::{HostSampler, SysinfoCounters};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sampler = HostSampler::new(Arc::new(SysinfoCounters::new()));
//!
//!     let cpu = sampler.cpu().await?;
//!     println!("CPU: {:.2}%", cpu.percent);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod host;
pub mod route;

pub use error::{MetricUnavailable, ProbeFailure};
pub use host::{HostCounters, HostSampler, MemoryCounters, SysinfoCounters};
pub use route::{dispatch, HttpProber, HttpProberBuilder, Route, RouteProber};

// Re-export types for convenience
pub use routewatch_types::{CpuUsage, DiskStats, MemoryStats, Observation, RouteResponse};
