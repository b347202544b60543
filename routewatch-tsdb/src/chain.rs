//! Chains - ordered, append-only sequences of blocks.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use routewatch_types::FormatVersion;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::normalize::{SecondsSinceFirst, TimeNormalizer};
use crate::{Block, ChainError};

/// An append-only series of blocks for one (target, metric kind) pair.
///
/// The chain is addressed by its storage `path`, which doubles as its key in
/// the registry. Blocks are kept in insertion order with non-decreasing
/// timestamps; an out-of-order block is rejected rather than reordered.
///
/// # Example
///
/// ```rust
/// use routewatch_tsdb::{Block, Chain};
/// use routewatch_types::MetricKind;
///
/// let mut chain = Chain::new("storage/chunk_req_res_example_com_delay.json");
/// chain.append(Block::with_timestamp(MetricKind::Delay, "120|512|200", 1_000).unwrap()).unwrap();
/// chain.append(Block::with_timestamp(MetricKind::Delay, "95|512|200", 3_000).unwrap()).unwrap();
///
/// assert_eq!(chain.len(), 2);
/// assert_eq!(chain.tail().unwrap().normalized_time, 2.0);
/// assert_eq!(chain.prev(1).unwrap().datapoint, 120.0);
/// ```
#[derive(Clone)]
pub struct Chain {
    path: PathBuf,
    blocks: Vec<Block>,
    normalizer: Arc<dyn TimeNormalizer>,
}

/// On-disk layout of a chain.
#[derive(Serialize)]
struct ChainRecord<'a> {
    version: FormatVersion,
    path: &'a Path,
    blocks: &'a [Block],
}

#[derive(Deserialize)]
struct OwnedChainRecord {
    version: FormatVersion,
    path: PathBuf,
    blocks: Vec<Block>,
}

impl Chain {
    /// Create an empty chain using seconds-since-first normalization.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_normalizer(path, Arc::new(SecondsSinceFirst))
    }

    /// Create an empty chain with a specific normalization strategy.
    pub fn with_normalizer(path: impl Into<PathBuf>, normalizer: Arc<dyn TimeNormalizer>) -> Self {
        Self {
            path: path.into(),
            blocks: Vec::new(),
            normalizer,
        }
    }

    /// The storage path identifying this chain.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All blocks in insertion order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The block at `index`.
    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// The oldest block.
    pub fn first(&self) -> Option<&Block> {
        self.blocks.first()
    }

    /// The most recently appended block.
    pub fn tail(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// The block before `index`.
    pub fn prev(&self, index: usize) -> Option<&Block> {
        index.checked_sub(1).and_then(|i| self.blocks.get(i))
    }

    /// The block after `index`.
    pub fn next(&self, index: usize) -> Option<&Block> {
        if index >= self.blocks.len() {
            return None;
        }
        self.blocks.get(index + 1)
    }

    /// Place `block` at the tail and assign its normalized time.
    ///
    /// Fails with [`ChainError::InvalidAppend`] if the block is older than the
    /// current tail; the chain is left unchanged in that case.
    pub fn append(&mut self, mut block: Block) -> Result<&Block, ChainError> {
        if let Some(tail) = self.blocks.last() {
            if block.timestamp_ms < tail.timestamp_ms {
                return Err(ChainError::InvalidAppend {
                    path: self.path.clone(),
                    block_ms: block.timestamp_ms,
                    tail_ms: tail.timestamp_ms,
                });
            }
        }

        block.normalized_time =
            self.normalizer
                .normalize(self.blocks.first(), self.blocks.len(), block.timestamp_ms);
        self.blocks.push(block);
        Ok(&self.blocks[self.blocks.len() - 1])
    }

    /// Drop the tail block that failed to persist.
    pub(crate) fn rollback_tail(&mut self) {
        self.blocks.pop();
    }

    /// Serialize the chain to pretty-printed JSON.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&ChainRecord {
            version: FormatVersion::current(),
            path: &self.path,
            blocks: &self.blocks,
        })
    }

    /// Deserialize a chain from JSON produced by [`Chain::encode`].
    ///
    /// The decoded chain uses seconds-since-first normalization for any
    /// further appends.
    pub fn decode(json: &str) -> Result<Self, ChainError> {
        let record: OwnedChainRecord =
            serde_json::from_str(json).map_err(|source| ChainError::Codec {
                path: PathBuf::new(),
                source,
            })?;

        if !record.version.is_compatible() {
            return Err(ChainError::IncompatibleVersion {
                path: record.path,
                found: record.version,
            });
        }

        Ok(Self {
            path: record.path,
            blocks: record.blocks,
            normalizer: Arc::new(SecondsSinceFirst),
        })
    }

    /// Persist the full chain to its path.
    ///
    /// The chain is written to a sibling temporary file and renamed into
    /// place, so readers see either the previous or the new contents.
    pub fn save(&self) -> Result<(), ChainError> {
        let json = self.encode().map_err(|source| ChainError::Codec {
            path: self.path.clone(),
            source,
        })?;

        let tmp = temp_path(&self.path);
        fs::write(&tmp, json).map_err(|e| ChainError::storage(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            ChainError::storage(&self.path, e)
        })?;

        debug!(path = %self.path.display(), blocks = self.blocks.len(), "saved chain");
        Ok(())
    }

    /// Load a persisted chain from `path`.
    ///
    /// The chain is addressed by the location it was loaded from, even if
    /// the file records a different path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ChainError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| ChainError::storage(path, e))?;

        let mut chain = Self::decode(&json).map_err(|e| match e {
            ChainError::Codec { source, .. } => ChainError::Codec {
                path: path.to_path_buf(),
                source,
            },
            ChainError::IncompatibleVersion { found, .. } => ChainError::IncompatibleVersion {
                path: path.to_path_buf(),
                found,
            },
            other => other,
        })?;

        if chain.path != path {
            debug!(
                recorded = %chain.path.display(),
                actual = %path.display(),
                "chain file was moved, using its current location"
            );
            chain.path = path.to_path_buf();
        }
        Ok(chain)
    }

    /// Load the chain at `path`, or start an empty one if no file exists.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Result<Self, ChainError> {
        match Self::load(path.as_ref()) {
            Ok(chain) => Ok(chain),
            Err(e) if e.is_missing_file() => Ok(Self::new(path.as_ref())),
            Err(e) => Err(e),
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

impl PartialEq for Chain {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.blocks == other.blocks
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("path", &self.path)
            .field("blocks", &self.blocks.len())
            .field("normalizer", &self.normalizer)
            .finish()
    }
}
