//! # routewatch-tsdb
//!
//! Append-only time-series storage for the routewatch agent.
//!
//! Every monitored (target, metric kind) pair owns one [`Chain`]: an ordered
//! sequence of [`Block`]s persisted as a JSON file at a stable path. The
//! [`ChainRegistry`] owns all chains, grouped by [`MetricKind`], and routes a
//! freshly built block to the chain whose path matches.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use routewatch_tsdb::{Block, ChainRegistry, StorageLayout};
//! use routewatch_types::{MetricKind, Observation, RouteResponse};
//!
//! # fn main() -> Result<(), routewatch_tsdb::ChainError> {
//! let layout = StorageLayout::new("storage");
//! let urls = ["https://example.com/health"];
//! let registry = ChainRegistry::open(&layout, &urls, true)?;
//!
//! let payload = Observation::Route(RouteResponse::measured(120, 512, 200)).encode();
//! for kind in MetricKind::ROUTE {
//!     let block = Block::new(kind, payload.clone())?;
//!     registry.write(kind, &layout.route_chain(urls[0], kind), block)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! - **Per-chain locking**: each chain has its own lock held across append + save
//! - **Lock-free lookup**: chain paths are immutable and scanned without locking
//! - **Atomic saves**: chains are written to a temporary file and renamed

mod block;
mod chain;
mod error;
mod normalize;
mod paths;
mod registry;

pub use block::{current_timestamp_ms, Block};
pub use chain::Chain;
pub use error::ChainError;
pub use normalize::{BlockIndex, SecondsSinceFirst, TimeNormalizer};
pub use paths::{sanitize_target, StorageLayout, CHAIN_EXTENSION, HOST_CHAIN_DIR, ROUTE_CHAIN_DIR};
pub use registry::{ChainGroup, ChainRegistry, ChainSlot};

// Re-export types for convenience
pub use routewatch_types::{MetricKind, Observation};
