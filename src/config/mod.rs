//! Agent configuration.
//!
//! Configuration is read from a file (format chosen by extension) and then
//! overlaid with `ROUTEWATCH_*` environment variables, e.g.
//! `ROUTEWATCH_INTERVAL=30s`.
//!
//! ```toml
//! storage_root = "storage"
//! interval = "10s"
//! probe_timeout = "5s"
//!
//! [[routes]]
//! url = "https://example.com/health"
//!
//! [[routes]]
//! url = "https://example.com/login"
//! method = "POST"
//! ```

pub mod duration;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File, FileFormat};
use routewatch_probes::Route;
use routewatch_tsdb::{sanitize_target, StorageLayout};
use serde::Deserialize;

/// Settings for one agent process.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Directory under which all chains are stored.
    pub storage_root: PathBuf,

    /// Time between the starts of two collection cycles.
    #[serde(deserialize_with = "duration::deserialize")]
    pub interval: Duration,

    /// Deadline for a single route probe.
    #[serde(deserialize_with = "duration::deserialize")]
    pub probe_timeout: Duration,

    /// CPU sampling window.
    #[serde(deserialize_with = "duration::deserialize")]
    pub cpu_window: Duration,

    /// Disk sampling window.
    #[serde(deserialize_with = "duration::deserialize")]
    pub disk_window: Duration,

    /// Whether CPU, memory and disk are sampled.
    pub host_metrics: bool,

    /// Monitored routes.
    pub routes: Vec<Route>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("storage"),
            interval: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
            cpu_window: Duration::from_secs(1),
            disk_window: Duration::from_secs(3),
            host_metrics: true,
            routes: Vec::new(),
        }
    }
}

impl AgentConfig {
    /// Load from a config file plus `ROUTEWATCH_*` environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path))
            .add_source(Environment::with_prefix("ROUTEWATCH").separator("__"))
            .build()
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_config(config)
    }

    /// Parse from an in-memory TOML document.
    pub fn from_toml(toml: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self> {
        let agent: AgentConfig = config.try_deserialize().context("Invalid agent config")?;
        agent.validate()?;
        Ok(agent)
    }

    /// Reject settings the agent cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            bail!("interval must be greater than zero");
        }
        if self.probe_timeout.is_zero() {
            bail!("probe_timeout must be greater than zero");
        }

        // Chains are keyed by the sanitized URL, so distinct URLs can still
        // collide on disk (scheme and punctuation are folded away).
        let mut seen: HashMap<String, &str> = HashMap::new();
        for route in &self.routes {
            if route.url.trim().is_empty() {
                bail!("route url must not be empty");
            }
            if let Some(previous) = seen.insert(sanitize_target(&route.url), &route.url) {
                if previous == route.url {
                    bail!("duplicate route url: {}", route.url);
                }
                bail!(
                    "route urls {} and {} map to the same chain files",
                    previous,
                    route.url
                );
            }
        }
        Ok(())
    }

    /// Chain storage layout under `storage_root`.
    pub fn layout(&self) -> StorageLayout {
        StorageLayout::new(&self.storage_root)
    }

    /// URLs of all configured routes.
    pub fn urls(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.url.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_apply() {
        let config = AgentConfig::from_toml("").unwrap();
        assert_eq!(config.storage_root, PathBuf::from("storage"));
        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.disk_window, Duration::from_secs(3));
        assert!(config.host_metrics);
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_routes_and_durations() {
        let config = AgentConfig::from_toml(
            r#"
            interval = "30s"
            probe_timeout = "1500ms"
            host_metrics = false

            [[routes]]
            url = "https://example.com/health"

            [[routes]]
            url = "https://example.com/login"
            method = "POST"
            "#,
        )
        .unwrap();

        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.probe_timeout, Duration::from_millis(1500));
        assert!(!config.host_metrics);
        assert_eq!(config.routes.len(), 2);
        assert_eq!(config.routes[0].method, "GET");
        assert_eq!(config.routes[1].method, "POST");
        assert_eq!(config.urls(), vec!["https://example.com/health", "https://example.com/login"]);
    }

    #[test]
    fn test_duplicate_routes_rejected() {
        let err = AgentConfig::from_toml(
            r#"
            [[routes]]
            url = "https://a"
            [[routes]]
            url = "https://a"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate route url"));
    }

    #[test]
    fn test_colliding_chain_paths_rejected() {
        let err = AgentConfig::from_toml(
            r#"
            [[routes]]
            url = "http://example.com/a"
            [[routes]]
            url = "https://example.com/a"
            "#,
        )
        .unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("http://example.com/a"), "{}", message);
        assert!(message.contains("https://example.com/a"), "{}", message);

        let err = AgentConfig::from_toml(
            r#"
            [[routes]]
            url = "https://a.b/health"
            [[routes]]
            url = "https://a_b/health"
            "#,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("same chain files"));
    }

    #[test]
    fn test_validated_routes_open_cleanly() {
        let config = AgentConfig::from_toml(
            r#"
            storage_root = "unused"
            [[routes]]
            url = "https://example.com/a"
            [[routes]]
            url = "https://example.com/b"
            "#,
        )
        .unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        let layout = StorageLayout::new(dir.path());
        let registry = routewatch_tsdb::ChainRegistry::open(&layout, &config.urls(), false).unwrap();
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(AgentConfig::from_toml(r#"interval = "0s""#).is_err());
    }

    #[test]
    fn test_bad_duration_rejected() {
        assert!(AgentConfig::from_toml(r#"probe_timeout = "soon""#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "storage_root = \"/var/lib/routewatch\"").unwrap();
        writeln!(file, "[[routes]]\nurl = \"https://example.com\"").unwrap();

        let config = AgentConfig::load(file.path()).unwrap();
        assert_eq!(config.storage_root, PathBuf::from("/var/lib/routewatch"));
        assert_eq!(config.routes, vec![Route::get("https://example.com")]);
        assert_eq!(
            config.layout().route_root(),
            Path::new("/var/lib/routewatch/req-res-delay-monitoring")
        );
    }
}
