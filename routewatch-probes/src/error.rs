//! Error types for probes and samplers.

use routewatch_types::MetricKind;
use thiserror::Error;

/// Errors that can occur when probing a route.
///
/// These never leave the probe task: the task turns them into a failure
/// observation, see [`crate::dispatch`].
#[derive(Debug, Error)]
pub enum ProbeFailure {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The response body could not be read to the end.
    #[error("Failed to read response body: {0}")]
    Body(String),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for ProbeFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProbeFailure::Timeout
        } else if err.is_connect() {
            ProbeFailure::Connection(err.to_string())
        } else if err.is_body() || err.is_decode() {
            ProbeFailure::Body(err.to_string())
        } else {
            ProbeFailure::Http(err.to_string())
        }
    }
}

/// An OS counter query failed.
#[derive(Debug, Error)]
#[error("{metric} metric unavailable: {reason}")]
pub struct MetricUnavailable {
    pub metric: MetricKind,
    pub reason: String,
}

impl MetricUnavailable {
    pub fn new(metric: MetricKind, reason: impl Into<String>) -> Self {
        Self {
            metric,
            reason: reason.into(),
        }
    }
}
