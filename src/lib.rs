//! # routewatch
//!
//! A self-hosted monitoring agent. On every interval it probes a set of
//! configured routes and samples host resources, and appends each
//! observation to a per-metric, per-target chain on local storage.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         routewatch                           │
//! │  ┌────────┐    ┌─────────────┐    ┌────────────────────────┐ │
//! │  │ config │───▶│ coordinator │───▶│ routewatch-tsdb        │ │
//! │  └────────┘    └──────┬──────┘    │ (registry → chains)    │ │
//! │                       │ oneshot   └────────────────────────┘ │
//! │                       ▼                                      │
//! │              ┌──────────────────┐                            │
//! │              │ routewatch-probes│◀── HTTP │ sysinfo          │
//! │              └──────────────────┘                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`config`]**: [`AgentConfig`] loading and validation
//! - **[`coordinator`]**: [`Coordinator`] fanning out probe tasks and
//!   writing their observations, with per-batch completion reports
//! - **[`summary`]**: JSON summaries for the CLI
//!
//! ## Usage
//!
//! ```bash
//! # Run the collection loop
//! routewatch --config routewatch.toml
//!
//! # Run a single interval and print what was written
//! routewatch --config routewatch.toml --once
//!
//! # Inspect a persisted chain
//! routewatch --inspect storage/req-res-delay-monitoring/chunk_req_res_example_com_delay.json
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use std::sync::Arc;
//! use routewatch::{Coordinator, HttpProber, Route, StorageLayout};
//! use routewatch_tsdb::ChainRegistry;
//!
//! # tokio_test::block_on(async {
//! let routes = vec![Route::get("https://example.com/health")];
//! let layout = StorageLayout::new("storage");
//! let registry = ChainRegistry::open(&layout, &["https://example.com/health"], false).unwrap();
//! let prober = HttpProber::builder().build().unwrap();
//!
//! let coordinator = Coordinator::new(Arc::new(registry), layout, Arc::new(prober));
//! let batch = coordinator.run_batch(&routes).await;
//! assert!(batch.is_complete());
//! # });
//! ```

pub mod config;
pub mod coordinator;
pub mod summary;

// Re-export main types for convenience
pub use config::AgentConfig;
pub use coordinator::{BatchReport, CollectionReport, Coordinator, CycleReport, WriteOutcome};
pub use routewatch_probes::{HostSampler, HttpProber, Route, RouteProber, SysinfoCounters};
pub use routewatch_tsdb::{Chain, ChainRegistry, StorageLayout};
