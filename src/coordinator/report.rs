//! Results of collection cycles and batches.

use std::path::PathBuf;

use routewatch_tsdb::ChainError;
use routewatch_types::{MetricKind, Observation};

/// What happened to one chain write.
#[derive(Debug)]
pub enum WriteOutcome {
    /// The block was appended and the chain saved.
    Written,
    /// No chain is registered for the path; nothing was written.
    Missing,
    /// Building, appending or saving the block failed.
    Failed(ChainError),
}

impl WriteOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, WriteOutcome::Written)
    }
}

impl From<Result<(), ChainError>> for WriteOutcome {
    fn from(result: Result<(), ChainError>) -> Self {
        match result {
            Ok(()) => WriteOutcome::Written,
            Err(ChainError::NotFound { .. }) => WriteOutcome::Missing,
            Err(e) => WriteOutcome::Failed(e),
        }
    }
}

/// One attempted chain write.
#[derive(Debug)]
pub struct WriteReport {
    pub kind: MetricKind,
    pub path: PathBuf,
    pub outcome: WriteOutcome,
}

/// Result of one collection cycle for one target.
#[derive(Debug)]
pub struct CycleReport {
    /// Route URL, or `host` for host samplers.
    pub target: String,
    /// The host metric sampled; `None` for route cycles.
    pub metric: Option<MetricKind>,
    /// The observation written, if one was produced.
    pub observation: Option<Observation>,
    /// Why no observation was produced.
    pub error: Option<String>,
    pub writes: Vec<WriteReport>,
}

impl CycleReport {
    /// A cycle whose task produced nothing to write.
    pub fn unavailable(target: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            metric: None,
            observation: None,
            error: Some(error.into()),
            writes: Vec::new(),
        }
    }

    /// A host sampler that produced nothing to write.
    pub fn host_unavailable(metric: MetricKind, error: impl Into<String>) -> Self {
        Self {
            metric: Some(metric),
            ..Self::unavailable(super::HOST_TARGET, error)
        }
    }

    /// Returns true if the probe failed or produced no observation.
    pub fn is_failure(&self) -> bool {
        match &self.observation {
            Some(Observation::Route(r)) => r.is_failure(),
            Some(_) => false,
            None => true,
        }
    }

    /// Returns true if a sentinel route observation was recorded.
    pub fn is_sentinel(&self) -> bool {
        matches!(&self.observation, Some(Observation::Route(r)) if r.is_sentinel())
    }

    /// Returns true if a real observation was written to every chain.
    pub fn is_success(&self) -> bool {
        !self.is_failure()
            && !self.is_sentinel()
            && !self.writes.is_empty()
            && self.writes.iter().all(|w| w.outcome.is_written())
    }
}

/// Result of one batch of cycles.
///
/// A batch is complete once every launched cycle has reported back,
/// whether it succeeded or not.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub launched: usize,
    pub cycles: Vec<CycleReport>,
}

impl BatchReport {
    pub fn new(launched: usize) -> Self {
        Self {
            launched,
            cycles: Vec::with_capacity(launched),
        }
    }

    /// Number of cycles that have reported.
    pub fn completed(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_complete(&self) -> bool {
        self.completed() == self.launched
    }

    /// Cycles that wrote a real observation to every chain.
    pub fn successful_cycles(&self) -> usize {
        self.cycles.iter().filter(|c| c.is_success()).count()
    }

    /// Cycles that recorded a sentinel (unsupported or failed) observation.
    pub fn sentinel_records(&self) -> usize {
        self.cycles.iter().filter(|c| c.is_sentinel()).count()
    }

    /// Cycles whose probe failed or produced nothing.
    pub fn failed_probes(&self) -> usize {
        self.cycles.iter().filter(|c| c.is_failure()).count()
    }

    fn writes(&self) -> impl Iterator<Item = &WriteReport> {
        self.cycles.iter().flat_map(|c| c.writes.iter())
    }

    /// Chain writes that landed.
    pub fn written(&self) -> usize {
        self.writes().filter(|w| w.outcome.is_written()).count()
    }

    /// Chain writes skipped because no chain matched.
    pub fn missing(&self) -> usize {
        self.writes()
            .filter(|w| matches!(w.outcome, WriteOutcome::Missing))
            .count()
    }

    /// Chain writes that failed.
    pub fn failed_writes(&self) -> usize {
        self.writes()
            .filter(|w| matches!(w.outcome, WriteOutcome::Failed(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routewatch_types::{CpuUsage, RouteResponse};

    fn cycle(observation: Option<Observation>, outcomes: Vec<WriteOutcome>) -> CycleReport {
        CycleReport {
            target: "t".to_string(),
            metric: None,
            observation,
            error: None,
            writes: outcomes
                .into_iter()
                .map(|outcome| WriteReport {
                    kind: MetricKind::Delay,
                    path: PathBuf::from("p"),
                    outcome,
                })
                .collect(),
        }
    }

    #[test]
    fn test_cycle_classification() {
        let ok = cycle(
            Some(Observation::Route(RouteResponse::measured(5, 1, 200))),
            vec![WriteOutcome::Written],
        );
        assert!(ok.is_success());

        let sentinel = cycle(
            Some(Observation::Route(RouteResponse::unsupported())),
            vec![WriteOutcome::Written],
        );
        assert!(sentinel.is_sentinel());
        assert!(!sentinel.is_failure());
        assert!(!sentinel.is_success());

        let failed = cycle(
            Some(Observation::Route(RouteResponse::failed())),
            vec![WriteOutcome::Written],
        );
        assert!(failed.is_failure());

        let missing = cycle(
            Some(Observation::Cpu(CpuUsage { percent: 1.0 })),
            vec![WriteOutcome::Written, WriteOutcome::Missing],
        );
        assert!(!missing.is_success());

        assert!(CycleReport::unavailable("host", "boom").is_failure());

        let host = CycleReport::host_unavailable(MetricKind::Disk, "boom");
        assert!(host.is_failure());
        assert_eq!(host.metric, Some(MetricKind::Disk));
        assert_eq!(host.target, "host");
    }

    #[test]
    fn test_not_found_maps_to_missing() {
        let outcome = WriteOutcome::from(Err(ChainError::NotFound {
            kind: MetricKind::Status,
            path: PathBuf::from("x"),
        }));
        assert!(matches!(outcome, WriteOutcome::Missing));
    }

    #[test]
    fn test_batch_counts() {
        let mut batch = BatchReport::new(3);
        batch.cycles.push(cycle(
            Some(Observation::Route(RouteResponse::measured(5, 1, 200))),
            vec![WriteOutcome::Written, WriteOutcome::Written],
        ));
        batch.cycles.push(cycle(
            Some(Observation::Route(RouteResponse::failed())),
            vec![WriteOutcome::Written, WriteOutcome::Missing],
        ));
        assert!(!batch.is_complete());

        batch.cycles.push(CycleReport::unavailable("r3", "task panicked"));
        assert!(batch.is_complete());
        assert_eq!(batch.successful_cycles(), 1);
        assert_eq!(batch.sentinel_records(), 1);
        assert_eq!(batch.failed_probes(), 2);
        assert_eq!(batch.written(), 3);
        assert_eq!(batch.missing(), 1);
        assert_eq!(batch.failed_writes(), 0);
    }
}
