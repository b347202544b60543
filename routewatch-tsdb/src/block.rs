//! Blocks - single timestamped observations within a chain.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use routewatch_types::{MetricKind, BLOCK_DATA_SEPARATOR};
use serde::{Deserialize, Serialize};

use crate::ChainError;

/// One immutable observation stored in a chain.
///
/// Adjacency is positional: the chain owns its blocks in a `Vec`, and the
/// previous/next block of position `i` are `i - 1` and `i + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Value plotted for this block's metric kind.
    pub datapoint: f32,

    /// The full encoded observation the datapoint was taken from.
    pub payload: String,

    /// Wall-clock time in milliseconds since the Unix epoch.
    pub timestamp_ms: u64,

    /// Chain-relative time coordinate, assigned on append.
    pub normalized_time: f64,
}

impl Block {
    /// Create a block stamped with the current time.
    pub fn new(kind: MetricKind, payload: impl Into<String>) -> Result<Self, ChainError> {
        Self::with_timestamp(kind, payload, current_timestamp_ms())
    }

    /// Create a block with a specific timestamp.
    ///
    /// The datapoint is the payload field selected by `kind`. Normalized time
    /// starts at zero and is overwritten when the block is appended.
    pub fn with_timestamp(
        kind: MetricKind,
        payload: impl Into<String>,
        timestamp_ms: u64,
    ) -> Result<Self, ChainError> {
        let payload = payload.into();
        let datapoint = payload
            .split(BLOCK_DATA_SEPARATOR)
            .nth(kind.datapoint_field())
            .and_then(|field| field.trim().parse::<f32>().ok());

        match datapoint {
            Some(datapoint) => Ok(Self {
                datapoint,
                payload,
                timestamp_ms,
                normalized_time: 0.0,
            }),
            None => Err(ChainError::Payload { kind, payload }),
        }
    }

    /// The block timestamp as a `SystemTime`.
    pub fn timestamp(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.timestamp_ms)
    }
}

/// Milliseconds since the Unix epoch.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datapoint_follows_kind() {
        let payload = "120|512|200";
        let delay = Block::with_timestamp(MetricKind::Delay, payload, 1).unwrap();
        let length = Block::with_timestamp(MetricKind::Length, payload, 1).unwrap();
        let status = Block::with_timestamp(MetricKind::Status, payload, 1).unwrap();

        assert_eq!(delay.datapoint, 120.0);
        assert_eq!(length.datapoint, 512.0);
        assert_eq!(status.datapoint, 200.0);
        assert_eq!(delay.payload, payload);
    }

    #[test]
    fn memory_block_plots_used_percent() {
        let block = Block::with_timestamp(MetricKind::Memory, "8000|4500|3500|43.750000|1", 1).unwrap();
        assert_eq!(block.datapoint, 43.75);
    }

    #[test]
    fn short_payload_is_rejected() {
        let err = Block::with_timestamp(MetricKind::Status, "120|512", 1).unwrap_err();
        assert!(matches!(err, ChainError::Payload { kind: MetricKind::Status, .. }));
    }

    #[test]
    fn non_numeric_field_is_rejected() {
        assert!(Block::new(MetricKind::Cpu, "busy").is_err());
    }

    #[test]
    fn new_block_uses_current_time() {
        let before = current_timestamp_ms();
        let block = Block::new(MetricKind::Cpu, "12.50").unwrap();
        assert!(block.timestamp_ms >= before);
        assert_eq!(block.normalized_time, 0.0);
    }
}
