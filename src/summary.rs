//! JSON summaries of persisted chains and collection results.

use routewatch_tsdb::Chain;
use serde_json::{json, Value};

use crate::coordinator::CollectionReport;

/// Summarize a chain for `--inspect`.
pub fn chain_summary(chain: &Chain) -> Value {
    let datapoints: Vec<f32> = chain.blocks().iter().map(|b| b.datapoint).collect();
    let min = datapoints.iter().copied().fold(None, |acc: Option<f32>, v| {
        Some(acc.map_or(v, |a| a.min(v)))
    });
    let max = datapoints.iter().copied().fold(None, |acc: Option<f32>, v| {
        Some(acc.map_or(v, |a| a.max(v)))
    });

    json!({
        "path": chain.path().display().to_string(),
        "blocks": chain.len(),
        "first_timestamp_ms": chain.first().map(|b| b.timestamp_ms),
        "last_timestamp_ms": chain.tail().map(|b| b.timestamp_ms),
        "span_seconds": chain.tail().map(|b| b.normalized_time),
        "last_datapoint": chain.tail().map(|b| b.datapoint),
        "last_payload": chain.tail().map(|b| b.payload.clone()),
        "min_datapoint": min,
        "max_datapoint": max,
    })
}

/// Summarize one collection interval for `--once`.
pub fn collection_summary(report: &CollectionReport) -> Value {
    let routes = &report.routes;
    json!({
        "routes": {
            "launched": routes.launched,
            "completed": routes.completed(),
            "successful": routes.successful_cycles(),
            "sentinel": routes.sentinel_records(),
            "written": routes.written(),
            "missing": routes.missing(),
            "failed_writes": routes.failed_writes(),
        },
        "host": report.host.iter().map(|c| {
            json!({
                "metric": c.metric.map(|kind| kind.to_string()),
                "observation": c.observation.map(|o| o.encode()),
                "error": c.error,
                "written": c.writes.iter().filter(|w| w.outcome.is_written()).count(),
            })
        }).collect::<Vec<_>>(),
    })
}
