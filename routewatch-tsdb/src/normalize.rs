//! Strategies for a block's chain-relative time coordinate.
//!
//! Every strategy must be non-decreasing along a chain whose timestamps are
//! non-decreasing; the chain rejects out-of-order blocks before asking.

use std::fmt::Debug;

use crate::Block;

/// Assigns `normalized_time` to a block being appended.
pub trait TimeNormalizer: Send + Sync + Debug {
    /// Compute the coordinate for a block at `index` with `timestamp_ms`.
    ///
    /// `first` is the chain's first block, or `None` when the chain is empty.
    fn normalize(&self, first: Option<&Block>, index: usize, timestamp_ms: u64) -> f64;
}

/// Seconds elapsed since the chain's first block.
///
/// The first block sits at `0.0`. This is the default strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecondsSinceFirst;

impl TimeNormalizer for SecondsSinceFirst {
    fn normalize(&self, first: Option<&Block>, _index: usize, timestamp_ms: u64) -> f64 {
        match first {
            Some(first) => timestamp_ms.saturating_sub(first.timestamp_ms) as f64 / 1000.0,
            None => 0.0,
        }
    }
}

/// The block's position in the chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockIndex;

impl TimeNormalizer for BlockIndex {
    fn normalize(&self, _first: Option<&Block>, index: usize, _timestamp_ms: u64) -> f64 {
        index as f64
    }
}
