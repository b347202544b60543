//! Chain registry and router.
//!
//! The registry owns every chain, partitioned into one group per metric
//! kind. Each chain sits behind its own lock: concurrent cycles writing to
//! different chains never contend, and two cycles writing the same chain are
//! serialized for the whole append + save.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard};
use routewatch_types::MetricKind;
use tracing::{info, warn};

use crate::{Block, Chain, ChainError, StorageLayout};

/// A registered chain together with its lock.
#[derive(Debug)]
pub struct ChainSlot {
    path: std::path::PathBuf,
    chain: Mutex<Chain>,
}

impl ChainSlot {
    fn new(chain: Chain) -> Self {
        Self {
            path: chain.path().to_path_buf(),
            chain: Mutex::new(chain),
        }
    }

    /// The chain's path. Readable without taking the lock.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Exclusive access to the chain.
    pub fn lock(&self) -> MutexGuard<'_, Chain> {
        self.chain.lock()
    }

    /// Append `block` and persist the chain while holding the lock.
    ///
    /// If the save fails the block is dropped again, so the in-memory chain
    /// never runs ahead of what is on disk.
    pub fn append_and_save(&self, block: Block) -> Result<(), ChainError> {
        let mut chain = self.chain.lock();
        Self::commit(&mut chain, block)
    }

    /// Build a block from `payload`, stamped while holding the lock.
    ///
    /// Stamping under the lock keeps timestamps in lock order when cycles
    /// for the same chain overlap.
    pub fn record(&self, kind: MetricKind, payload: &str) -> Result<(), ChainError> {
        let mut chain = self.chain.lock();
        let block = Block::new(kind, payload)?;
        Self::commit(&mut chain, block)
    }

    fn commit(chain: &mut Chain, block: Block) -> Result<(), ChainError> {
        chain.append(block)?;
        if let Err(e) = chain.save() {
            chain.rollback_tail();
            return Err(e);
        }
        Ok(())
    }
}

/// All chains of one metric kind.
///
/// Groups are small (one chain per monitored route), so lookup is a linear
/// scan over the paths.
#[derive(Debug)]
pub struct ChainGroup {
    kind: MetricKind,
    slots: Vec<ChainSlot>,
    misses: AtomicU64,
}

impl ChainGroup {
    /// Create an empty group.
    pub fn new(kind: MetricKind) -> Self {
        Self {
            kind,
            slots: Vec::new(),
            misses: AtomicU64::new(0),
        }
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Add a chain. Paths must be unique within the group.
    pub fn insert(&mut self, chain: Chain) -> Result<(), ChainError> {
        if self.slots.iter().any(|slot| slot.path == chain.path()) {
            return Err(ChainError::DuplicatePath {
                path: chain.path().to_path_buf(),
            });
        }
        self.slots.push(ChainSlot::new(chain));
        Ok(())
    }

    /// Find the chain whose path equals `path`.
    ///
    /// A miss is counted and logged; whether it matters is up to the caller.
    pub fn resolve(&self, path: &Path) -> Option<&ChainSlot> {
        let found = self.slots.iter().find(|slot| slot.path == path);
        if found.is_none() {
            self.misses.fetch_add(1, Ordering::Relaxed);
            warn!(kind = %self.kind, path = %path.display(), "no chain registered for path");
        }
        found
    }

    /// Number of lookups that found no chain.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Iterate over the registered chains.
    pub fn iter(&self) -> impl Iterator<Item = &ChainSlot> {
        self.slots.iter()
    }
}

/// The fixed set of chains the agent writes to.
#[derive(Debug, Default)]
pub struct ChainRegistry {
    groups: BTreeMap<MetricKind, ChainGroup>,
}

impl ChainRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open every chain for the given routes (and the host, if enabled).
    ///
    /// Directories are created as needed. Existing chain files are loaded;
    /// missing ones start empty and are written on their first save.
    pub fn open<S: AsRef<str>>(
        layout: &StorageLayout,
        urls: &[S],
        host_metrics: bool,
    ) -> Result<Self, ChainError> {
        let mut registry = Self::new();

        fs::create_dir_all(layout.route_root())
            .map_err(|e| ChainError::storage(layout.route_root(), e))?;
        for url in urls {
            for kind in MetricKind::ROUTE {
                let chain = Chain::load_or_empty(layout.route_chain(url.as_ref(), kind))?;
                registry.insert(kind, chain)?;
            }
        }

        if host_metrics {
            fs::create_dir_all(layout.host_root())
                .map_err(|e| ChainError::storage(layout.host_root(), e))?;
            for kind in MetricKind::HOST {
                registry.insert(kind, Chain::load_or_empty(layout.host_chain(kind))?)?;
            }
        }

        info!(
            chains = registry.len(),
            blocks = registry.total_blocks(),
            "opened chain registry"
        );
        Ok(registry)
    }

    /// Register a chain under `kind`.
    pub fn insert(&mut self, kind: MetricKind, chain: Chain) -> Result<(), ChainError> {
        self.groups
            .entry(kind)
            .or_insert_with(|| ChainGroup::new(kind))
            .insert(chain)
    }

    /// The group holding chains of `kind`.
    pub fn group(&self, kind: MetricKind) -> Option<&ChainGroup> {
        self.groups.get(&kind)
    }

    /// Find the `kind` chain at `path`.
    pub fn resolve(&self, kind: MetricKind, path: &Path) -> Option<&ChainSlot> {
        match self.groups.get(&kind) {
            Some(group) => group.resolve(path),
            None => {
                warn!(kind = %kind, path = %path.display(), "no chain group for kind");
                None
            }
        }
    }

    /// Resolve, append and save in one step.
    ///
    /// A miss is reported as [`ChainError::NotFound`].
    pub fn write(&self, kind: MetricKind, path: &Path, block: Block) -> Result<(), ChainError> {
        match self.resolve(kind, path) {
            Some(slot) => slot.append_and_save(block),
            None => Err(ChainError::NotFound {
                kind,
                path: path.to_path_buf(),
            }),
        }
    }

    /// Resolve and record a payload as a freshly stamped block.
    ///
    /// A miss is reported as [`ChainError::NotFound`].
    pub fn record(&self, kind: MetricKind, path: &Path, payload: &str) -> Result<(), ChainError> {
        match self.resolve(kind, path) {
            Some(slot) => slot.record(kind, payload),
            None => Err(ChainError::NotFound {
                kind,
                path: path.to_path_buf(),
            }),
        }
    }

    /// Total number of registered chains.
    pub fn len(&self) -> usize {
        self.groups.values().map(ChainGroup::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total resolve misses across all groups.
    pub fn misses(&self) -> u64 {
        self.groups.values().map(ChainGroup::misses).sum()
    }

    /// Total blocks across all chains.
    pub fn total_blocks(&self) -> usize {
        self.groups
            .values()
            .flat_map(|group| group.iter())
            .map(|slot| slot.lock().len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn group_with(kind: MetricKind, paths: &[&str]) -> ChainGroup {
        let mut group = ChainGroup::new(kind);
        for path in paths {
            group.insert(Chain::new(*path)).unwrap();
        }
        group
    }

    #[test]
    fn resolve_finds_unique_chain() {
        let group = group_with(MetricKind::Delay, &["a.json", "b.json", "c.json"]);

        let slot = group.resolve(Path::new("b.json")).unwrap();
        assert_eq!(slot.path(), Path::new("b.json"));
        assert_eq!(slot.lock().path(), Path::new("b.json"));
        assert_eq!(group.misses(), 0);
    }

    #[test]
    fn resolve_miss_is_counted() {
        let group = group_with(MetricKind::Length, &["a.json"]);

        assert!(group.resolve(Path::new("gone.json")).is_none());
        assert!(group.resolve(Path::new("gone.json")).is_none());
        assert_eq!(group.misses(), 2);
    }

    #[test]
    fn duplicate_path_is_rejected() {
        let mut group = group_with(MetricKind::Status, &["a.json"]);
        let err = group.insert(Chain::new("a.json")).unwrap_err();
        assert!(matches!(err, ChainError::DuplicatePath { .. }));
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn registry_routes_by_kind() {
        let mut registry = ChainRegistry::new();
        registry.insert(MetricKind::Delay, Chain::new("x.json")).unwrap();
        registry.insert(MetricKind::Length, Chain::new("y.json")).unwrap();

        assert!(registry.resolve(MetricKind::Delay, Path::new("x.json")).is_some());
        assert!(registry.resolve(MetricKind::Length, Path::new("x.json")).is_none());
        assert!(registry.resolve(MetricKind::Cpu, Path::new("x.json")).is_none());
        assert_eq!(registry.misses(), 1);
    }

    #[test]
    fn write_reports_missing_chain() {
        let registry = ChainRegistry::new();
        let block = Block::with_timestamp(MetricKind::Delay, "1|1|200", 1).unwrap();

        let err = registry.write(MetricKind::Delay, Path::new("none.json"), block).unwrap_err();
        assert!(matches!(err, ChainError::NotFound { kind: MetricKind::Delay, .. }));
    }

    #[test]
    fn open_creates_every_chain() {
        let dir = TempDir::new().unwrap();
        let layout = StorageLayout::new(dir.path());
        let urls = ["https://a.example", "https://b.example"];

        let registry = ChainRegistry::open(&layout, &urls, true).unwrap();
        assert_eq!(registry.len(), 9);
        assert_eq!(registry.group(MetricKind::Delay).unwrap().len(), 2);
        assert!(layout.route_root().is_dir());
        assert!(layout.host_root().is_dir());

        let path = layout.route_chain("https://b.example", MetricKind::Status);
        assert!(registry.resolve(MetricKind::Status, &path).is_some());
    }

    #[test]
    fn open_reloads_saved_blocks() {
        let dir = TempDir::new().unwrap();
        let layout = StorageLayout::new(dir.path());
        let urls = ["https://a.example"];
        let path = layout.route_chain(urls[0], MetricKind::Delay);

        {
            let registry = ChainRegistry::open(&layout, &urls, false).unwrap();
            let block = Block::with_timestamp(MetricKind::Delay, "120|512|200", 10).unwrap();
            registry.write(MetricKind::Delay, &path, block).unwrap();
        }

        let registry = ChainRegistry::open(&layout, &urls, false).unwrap();
        assert_eq!(registry.total_blocks(), 1);
        let slot = registry.resolve(MetricKind::Delay, &path).unwrap();
        assert_eq!(slot.lock().tail().unwrap().datapoint, 120.0);
    }

    #[test]
    fn failed_save_rolls_back_append() {
        let dir = TempDir::new().unwrap();
        let path: PathBuf = dir.path().join("missing-dir").join("chain.json");
        let slot = ChainSlot::new(Chain::new(&path));

        let block = Block::with_timestamp(MetricKind::Cpu, "5.00", 1).unwrap();
        assert!(matches!(slot.append_and_save(block), Err(ChainError::Storage { .. })));
        assert!(slot.lock().is_empty());
    }

    #[test]
    fn record_stamps_and_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chunk_memory.json");
        let mut registry = ChainRegistry::new();
        registry.insert(MetricKind::Memory, Chain::new(&path)).unwrap();

        registry
            .record(MetricKind::Memory, &path, "8000|4500|3500|43.750000|1")
            .unwrap();
        let err = registry.record(MetricKind::Memory, &path, "8000|4500").unwrap_err();
        assert!(matches!(err, ChainError::Payload { .. }));

        let reloaded = Chain::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.tail().unwrap().datapoint, 43.75);
    }

    #[test]
    fn concurrent_writers_to_one_chain_are_serialized() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chunk_cpu.json");
        let mut registry = ChainRegistry::new();
        registry.insert(MetricKind::Cpu, Chain::new(&path)).unwrap();
        let registry = Arc::new(registry);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let path = path.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        registry.record(MetricKind::Cpu, &path, "1.00").unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let reloaded = Chain::load(&path).unwrap();
        assert_eq!(reloaded.len(), 80);
        let times: Vec<f64> = reloaded.blocks().iter().map(|b| b.normalized_time).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }
}
