//! Ingestion coordinator.
//!
//! The coordinator fans out probe tasks, takes each task's single
//! observation from a oneshot channel, and fans the encoded observation back
//! in as chain writes through the registry.
//!
//! ```text
//!  run_batch ──spawn──▶ route cycle ──spawn──▶ probe task
//!      │                    │   ◀── oneshot ──────┘
//!      │                    ▼
//!      │            encode → record(delay) / record(length) / record(status)
//!      ▼
//!  BatchReport (complete once every cycle has reported)
//! ```

mod report;

pub use report::{BatchReport, CycleReport, WriteOutcome, WriteReport};

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use routewatch_probes::{dispatch, HostSampler, Route, RouteProber};
use routewatch_tsdb::{ChainError, ChainRegistry, StorageLayout};
use routewatch_types::{MetricKind, Observation, RouteResponse};
use tokio::sync::oneshot;
use tokio::time::{timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Target name used in reports for host samplers.
pub const HOST_TARGET: &str = "host";

/// Default deadline for one probe task.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Drives probe tasks and writes their observations into the chain store.
///
/// Cloning is cheap; clones share the registry, prober and sampler.
#[derive(Debug, Clone)]
pub struct Coordinator {
    registry: Arc<ChainRegistry>,
    layout: StorageLayout,
    prober: Arc<dyn RouteProber>,
    sampler: Option<HostSampler>,
    probe_timeout: Duration,
}

/// Routes and host results of one collection interval.
#[derive(Debug)]
pub struct CollectionReport {
    pub routes: BatchReport,
    pub host: Vec<CycleReport>,
}

impl Coordinator {
    /// Create a coordinator writing route observations into `registry`.
    pub fn new(
        registry: Arc<ChainRegistry>,
        layout: StorageLayout,
        prober: Arc<dyn RouteProber>,
    ) -> Self {
        Self {
            registry,
            layout,
            prober,
            sampler: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Also sample host metrics with `sampler`.
    pub fn with_sampler(mut self, sampler: HostSampler) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Set the deadline for each probe task.
    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    pub fn registry(&self) -> &Arc<ChainRegistry> {
        &self.registry
    }

    /// Run one collection cycle for a single route.
    ///
    /// The probe runs in its own task bounded by the probe timeout. On
    /// expiry the task is aborted, which drops any in-flight response, and a
    /// failure observation is recorded instead.
    pub async fn run_route_cycle(&self, route: Route) -> CycleReport {
        let (tx, rx) = oneshot::channel();
        let prober = self.prober.clone();
        let task_route = route.clone();
        let task = tokio::spawn(async move {
            let response = dispatch(prober.as_ref(), &task_route).await;
            let _ = tx.send(response);
        });

        let response = match timeout(self.probe_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                warn!(url = %route.url, "probe task ended without an observation");
                RouteResponse::failed()
            }
            Err(_) => {
                task.abort();
                warn!(url = %route.url, timeout = ?self.probe_timeout, "route probe timed out");
                RouteResponse::failed()
            }
        };

        let observation = Observation::Route(response);
        let paths = MetricKind::ROUTE
            .iter()
            .map(|kind| (*kind, self.layout.route_chain(&route.url, *kind)))
            .collect();
        let writes = self.write(observation, paths).await;

        debug!(
            url = %route.url,
            delay_ms = response.delay_ms,
            status = response.status_code,
            "route cycle finished"
        );
        CycleReport {
            target: route.url,
            metric: None,
            observation: Some(observation),
            error: None,
            writes,
        }
    }

    /// Run one cycle for every route concurrently and wait for all of them.
    ///
    /// Each cycle reports exactly once, even if its task panics, so the
    /// returned batch is always complete.
    pub async fn run_batch(&self, routes: &[Route]) -> BatchReport {
        let handles: Vec<_> = routes
            .iter()
            .cloned()
            .map(|route| {
                let url = route.url.clone();
                let this = self.clone();
                (url, tokio::spawn(async move { this.run_route_cycle(route).await }))
            })
            .collect();

        let mut batch = BatchReport::new(handles.len());
        for (url, handle) in handles {
            let cycle = match handle.await {
                Ok(cycle) => cycle,
                Err(e) => {
                    warn!(url = %url, error = %e, "route cycle task failed");
                    CycleReport::unavailable(url, e.to_string())
                }
            };
            batch.cycles.push(cycle);
        }

        info!(
            routes = batch.launched,
            successful = batch.successful_cycles(),
            sentinel = batch.sentinel_records(),
            failed_writes = batch.failed_writes(),
            missing = batch.missing(),
            "route batch complete"
        );
        batch
    }

    /// Sample CPU, memory and disk concurrently and record each result.
    ///
    /// Returns an empty list when no sampler is configured. A sampler that
    /// fails is logged and skipped for this cycle.
    pub async fn run_host_cycle(&self) -> Vec<CycleReport> {
        let Some(sampler) = self.sampler.clone() else {
            return Vec::new();
        };

        let pending: Vec<_> = MetricKind::HOST
            .iter()
            .map(|kind| {
                let kind = *kind;
                let (tx, rx) = oneshot::channel();
                let sampler = sampler.clone();
                let task = tokio::spawn(async move {
                    let _ = tx.send(sampler.sample(kind).await);
                });
                (kind, task, rx)
            })
            .collect();

        let mut reports = Vec::with_capacity(pending.len());
        for (kind, task, rx) in pending {
            let deadline = self.probe_timeout + sampler.window(kind);
            let observation = match timeout(deadline, rx).await {
                Ok(Ok(Ok(observation))) => observation,
                Ok(Ok(Err(e))) => {
                    warn!(metric = %kind, error = %e, "host metric unavailable, skipping");
                    reports.push(CycleReport::host_unavailable(kind, e.to_string()));
                    continue;
                }
                Ok(Err(_)) => {
                    warn!(metric = %kind, "sampler task ended without an observation");
                    reports.push(CycleReport::host_unavailable(kind, "sampler task failed"));
                    continue;
                }
                Err(_) => {
                    task.abort();
                    warn!(metric = %kind, "sampler timed out");
                    reports.push(CycleReport::host_unavailable(kind, "sampler timed out"));
                    continue;
                }
            };

            let writes = self
                .write(observation, vec![(kind, self.layout.host_chain(kind))])
                .await;
            reports.push(CycleReport {
                target: HOST_TARGET.to_string(),
                metric: Some(kind),
                observation: Some(observation),
                error: None,
                writes,
            });
        }
        reports
    }

    /// Run the route batch and the host cycle for one interval.
    pub async fn collect(&self, routes: &[Route]) -> CollectionReport {
        let (routes, host) = tokio::join!(self.run_batch(routes), self.run_host_cycle());
        CollectionReport { routes, host }
    }

    /// Run a collection every `interval` until `shutdown` resolves.
    ///
    /// `shutdown` is polled for the whole run, including while a collection
    /// is in flight; an interrupted collection is dropped. Returns the number
    /// of collections that finished.
    pub async fn run_until<F>(&self, routes: &[Route], interval: Duration, shutdown: F) -> usize
    where
        F: Future,
    {
        let mut interval_timer = tokio::time::interval(interval);
        interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut finished = 0;
        loop {
            tokio::select! {
                _ = interval_timer.tick() => {}
                _ = &mut shutdown => break,
            }

            // The next tick is only awaited once every cycle has reported.
            let report = tokio::select! {
                report = self.collect(routes) => report,
                _ = &mut shutdown => {
                    warn!("interrupted during a collection interval");
                    break;
                }
            };
            finished += 1;

            if !report.routes.is_complete() {
                error!(
                    launched = report.routes.launched,
                    completed = report.routes.completed(),
                    "route batch did not complete"
                );
            }
            if report.routes.failed_writes() > 0 {
                warn!(failed = report.routes.failed_writes(), "some chain writes failed");
            }
        }

        info!(
            collections = finished,
            misses = self.registry.misses(),
            "collection loop stopped"
        );
        finished
    }

    /// Record `observation` into each (kind, path) chain.
    ///
    /// Chain files are written on the blocking pool. Each write locks only
    /// its own chain.
    async fn write(
        &self,
        observation: Observation,
        targets: Vec<(MetricKind, PathBuf)>,
    ) -> Vec<WriteReport> {
        let payload = observation.encode();
        let registry = self.registry.clone();
        let fallback = targets.clone();

        let result = tokio::task::spawn_blocking(move || {
            targets
                .into_iter()
                .map(|(kind, path)| {
                    let outcome = WriteOutcome::from(registry.record(kind, &path, &payload));
                    if let WriteOutcome::Failed(e) = &outcome {
                        warn!(metric = %kind, error = %e, "chain write failed");
                    }
                    WriteReport {
                        kind,
                        path,
                        outcome,
                    }
                })
                .collect()
        })
        .await;

        match result {
            Ok(writes) => writes,
            Err(e) => fallback
                .into_iter()
                .map(|(kind, path)| WriteReport {
                    kind,
                    outcome: WriteOutcome::Failed(ChainError::Storage {
                        path: path.clone(),
                        source: io::Error::other(e.to_string()),
                    }),
                    path,
                })
                .collect(),
        }
    }
}

impl CollectionReport {
    /// Host samples that were written to every chain.
    pub fn host_successes(&self) -> usize {
        self.host.iter().filter(|c| c.is_success()).count()
    }
}
