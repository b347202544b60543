use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use routewatch::config::duration::format_duration;
use routewatch::summary::{chain_summary, collection_summary};
use routewatch::{
    AgentConfig, Chain, ChainRegistry, Coordinator, HostSampler, HttpProber, SysinfoCounters,
};

#[derive(Parser, Debug)]
#[command(name = "routewatch")]
#[command(about = "Probe routes and host resources into local time-series chains")]
struct Args {
    /// Path to the agent config file (TOML, YAML or JSON)
    #[arg(short, long, default_value = "routewatch.toml", conflicts_with = "inspect")]
    config: PathBuf,

    /// Run a single collection interval, print a summary and exit
    #[arg(long)]
    once: bool,

    /// Print a summary of a persisted chain file and exit
    #[arg(short, long)]
    inspect: Option<PathBuf>,

    /// Log filter (e.g. "info", "routewatch=debug"); overrides RUST_LOG
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    // Handle inspect mode (no config, no runtime)
    if let Some(path) = args.inspect {
        return inspect_chain(&path);
    }

    let config = AgentConfig::load(&args.config)?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config, args.once))
}

fn init_tracing(filter: Option<&str>) {
    let filter = match filter {
        Some(f) => EnvFilter::new(f),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Print a JSON summary of one chain file
fn inspect_chain(path: &Path) -> Result<()> {
    let chain = Chain::load(path).with_context(|| format!("Failed to load {}", path.display()))?;
    println!("{}", serde_json::to_string_pretty(&chain_summary(&chain))?);
    Ok(())
}

/// Build the coordinator and run one interval or the collection loop
async fn run(config: AgentConfig, once: bool) -> Result<()> {
    let layout = config.layout();
    let registry = ChainRegistry::open(&layout, &config.urls(), config.host_metrics)
        .context("Failed to open chain storage")?;

    let prober = HttpProber::builder().timeout(config.probe_timeout).build()?;
    let mut coordinator = Coordinator::new(Arc::new(registry), layout, Arc::new(prober))
        .with_probe_timeout(config.probe_timeout);
    if config.host_metrics {
        let sampler = HostSampler::new(Arc::new(SysinfoCounters::new()))
            .cpu_window(config.cpu_window)
            .disk_window(config.disk_window);
        coordinator = coordinator.with_sampler(sampler);
    }

    if once {
        let report = coordinator.collect(&config.routes).await;
        println!("{}", serde_json::to_string_pretty(&collection_summary(&report))?);
        return Ok(());
    }

    info!(
        routes = config.routes.len(),
        interval = %format_duration(config.interval),
        storage = %config.storage_root.display(),
        "starting collection loop"
    );

    coordinator
        .run_until(&config.routes, config.interval, tokio::signal::ctrl_c())
        .await;
    Ok(())
}
