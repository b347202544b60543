//! Error types for chain storage.

use std::io;
use std::path::PathBuf;

use routewatch_types::{FormatVersion, MetricKind};
use thiserror::Error;

/// Errors that can occur when building, appending to, or persisting chains.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Block timestamp precedes the chain tail.
    #[error("out-of-order append to {}: block at {block_ms}ms precedes tail at {tail_ms}ms", .path.display())]
    InvalidAppend {
        path: PathBuf,
        block_ms: u64,
        tail_ms: u64,
    },

    /// Reading or writing the chain file failed.
    #[error("storage error on {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The chain file could not be encoded or decoded.
    #[error("codec error on {}: {source}", .path.display())]
    Codec {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The chain file was written by an incompatible format version.
    #[error("{} has incompatible format version {found}", .path.display())]
    IncompatibleVersion { path: PathBuf, found: FormatVersion },

    /// The block payload has no parseable field for this kind.
    #[error("payload {payload:?} has no {kind} datapoint")]
    Payload { kind: MetricKind, payload: String },

    /// A chain with this path is already registered.
    #[error("duplicate chain path {}", .path.display())]
    DuplicatePath { path: PathBuf },

    /// No registered chain matches the target path.
    #[error("no {kind} chain registered at {}", .path.display())]
    NotFound { kind: MetricKind, path: PathBuf },
}

impl ChainError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ChainError::Storage {
            path: path.into(),
            source,
        }
    }

    /// Returns true if this is a storage error for a file that does not exist.
    pub fn is_missing_file(&self) -> bool {
        matches!(self, ChainError::Storage { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}
