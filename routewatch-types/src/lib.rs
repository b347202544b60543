//! # routewatch-types
//!
//! Core types for the routewatch agent. This crate defines the observations
//! produced by probes and samplers, the metric kinds that partition the
//! time-series store, and the payload encoding that turns an observation into
//! the string carried by a stored block.
//!
//! ## Features
//!
//! - `serde`: serialization of observations and metric kinds via serde
//!
//! ## Example
//!
//! ```rust
//! use routewatch_types::{MetricKind, Observation, RouteResponse};
//!
//! let observation = Observation::Route(RouteResponse::measured(120, 512, 200));
//! assert_eq!(observation.encode(), "120|512|200");
//!
//! // A route observation feeds three chains
//! assert_eq!(MetricKind::ROUTE.len(), 3);
//! ```
//!
//! ## Format Version
//!
//! Persisted chains carry a [`FormatVersion`] so readers can detect files
//! written by an incompatible release.

mod metric;
mod observation;
mod version;

pub use metric::*;
pub use observation::*;
pub use version::*;

/// Current chain file format version.
///
/// Increment this when making breaking changes to the persisted chain layout.
pub const FORMAT_VERSION: u32 = 1;

/// Reserved token joining the fields of an encoded observation.
pub const BLOCK_DATA_SEPARATOR: &str = "|";
