//! Storage path conventions.
//!
//! Route chains live at
//! `<route_root>/chunk_req_res_<sanitized-target>_<suffix>.json`, host chains
//! at `<host_root>/chunk_<suffix>.json`.

use std::path::{Path, PathBuf};

use routewatch_types::MetricKind;

/// Directory under the storage root holding route chains.
pub const ROUTE_CHAIN_DIR: &str = "req-res-delay-monitoring";

/// Directory under the storage root holding host chains.
pub const HOST_CHAIN_DIR: &str = "system-metrics";

/// File extension of persisted chains.
pub const CHAIN_EXTENSION: &str = "json";

/// Reduce a target address to a string that is safe inside a file name.
///
/// The scheme is dropped and every character other than ASCII alphanumerics,
/// `-` and `_` becomes `_`.
pub fn sanitize_target(target: &str) -> String {
    let trimmed = target
        .strip_prefix("https://")
        .or_else(|| target.strip_prefix("http://"))
        .unwrap_or(target);

    trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Where chains of each family are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    route_root: PathBuf,
    host_root: PathBuf,
}

impl StorageLayout {
    /// Standard layout beneath a storage root.
    pub fn new(storage_root: impl AsRef<Path>) -> Self {
        let root = storage_root.as_ref();
        Self {
            route_root: root.join(ROUTE_CHAIN_DIR),
            host_root: root.join(HOST_CHAIN_DIR),
        }
    }

    /// Layout with explicit directories for each chain family.
    pub fn with_roots(route_root: impl Into<PathBuf>, host_root: impl Into<PathBuf>) -> Self {
        Self {
            route_root: route_root.into(),
            host_root: host_root.into(),
        }
    }

    pub fn route_root(&self) -> &Path {
        &self.route_root
    }

    pub fn host_root(&self) -> &Path {
        &self.host_root
    }

    /// Path of the chain holding `kind` samples for the route at `url`.
    pub fn route_chain(&self, url: &str, kind: MetricKind) -> PathBuf {
        self.route_root.join(format!(
            "chunk_req_res_{}_{}.{}",
            sanitize_target(url),
            kind.suffix(),
            CHAIN_EXTENSION
        ))
    }

    /// Path of the chain holding `kind` samples for this host.
    pub fn host_chain(&self, kind: MetricKind) -> PathBuf {
        self.host_root
            .join(format!("chunk_{}.{}", kind.suffix(), CHAIN_EXTENSION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_target() {
        assert_eq!(sanitize_target("https://example.com/api/v1"), "example_com_api_v1");
        assert_eq!(sanitize_target("http://localhost:8080/?q=1"), "localhost_8080__q_1");
        assert_eq!(sanitize_target("plain-host_name"), "plain-host_name");
    }

    #[test]
    fn test_route_chain_paths() {
        let layout = StorageLayout::new("storage");
        assert_eq!(
            layout.route_chain("https://example.com/health", MetricKind::Delay),
            PathBuf::from("storage/req-res-delay-monitoring/chunk_req_res_example_com_health_delay.json")
        );
        assert_eq!(
            layout.route_chain("https://example.com/health", MetricKind::Status),
            PathBuf::from("storage/req-res-delay-monitoring/chunk_req_res_example_com_health_status.json")
        );
    }

    #[test]
    fn test_host_chain_paths() {
        let layout = StorageLayout::with_roots("routes", "host");
        assert_eq!(layout.host_chain(MetricKind::Disk), PathBuf::from("host/chunk_disk.json"));
    }
}
