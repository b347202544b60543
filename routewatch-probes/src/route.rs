//! Route latency probes.
//!
//! A route probe issues one request and measures the wall time until the
//! response body has been received, along with the response's
//! `Content-Length` and status code.
//!
//! ## Example
//!
//! ```rust,no_run
//! use routewatch_probes::{dispatch, HttpProber, Route};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let prober = HttpProber::builder().build()?;
//!     let route = Route::get("https://example.com/health");
//!
//!     let response = dispatch(&prober, &route).await;
//!     println!("{}ms, status {}", response.delay_ms, response.status_code);
//!     Ok(())
//! }
//! ```

use std::fmt::Debug;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use routewatch_types::RouteResponse;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ProbeFailure;

/// A monitored route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".to_string()
}

impl Route {
    pub fn new(url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
        }
    }

    /// A GET route.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url, default_method())
    }

    /// Returns true if this route is actually probed.
    ///
    /// Method tokens are case-sensitive: only `GET` is probed, `get` is not.
    pub fn is_probed(&self) -> bool {
        self.method == "GET"
    }
}

/// Something that can measure a GET route.
#[async_trait]
pub trait RouteProber: Send + Sync + Debug {
    /// Issue the request and measure it.
    async fn probe(&self, route: &Route) -> Result<RouteResponse, ProbeFailure>;
}

/// Probe a route, recovering every failure into an observation.
///
/// Routes whose method is not GET are never requested and yield the
/// unsupported sentinel. Transport failures yield the failure sentinel.
pub async fn dispatch(prober: &dyn RouteProber, route: &Route) -> RouteResponse {
    if !route.is_probed() {
        debug!(url = %route.url, method = %route.method, "method not probed, recording sentinel");
        return RouteResponse::unsupported();
    }

    match prober.probe(route).await {
        Ok(response) => response,
        Err(e) => {
            warn!(url = %route.url, error = %e, "route probe failed");
            RouteResponse::failed()
        }
    }
}

/// Route prober backed by a reqwest client.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    /// Create a new builder for configuring the prober.
    pub fn builder() -> HttpProberBuilder {
        HttpProberBuilder::default()
    }
}

#[async_trait]
impl RouteProber for HttpProber {
    async fn probe(&self, route: &Route) -> Result<RouteResponse, ProbeFailure> {
        let start = Instant::now();
        let response = self.client.get(&route.url).send().await?;

        let status_code = response.status().as_u16();
        let response_length = response.content_length().map_or(-1, |len| len as i64);

        // Consuming the body releases the connection on every return path.
        response.bytes().await?;
        let delay_ms = start.elapsed().as_millis() as i64;

        debug!(url = %route.url, delay_ms, status_code, "route probed");
        Ok(RouteResponse::measured(delay_ms, response_length, status_code))
    }
}

/// Builder for HttpProber.
#[derive(Debug, Default)]
pub struct HttpProberBuilder {
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl HttpProberBuilder {
    /// Set the per-request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the User-Agent header sent with each probe.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build the prober.
    pub fn build(self) -> Result<HttpProber, ProbeFailure> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| concat!("routewatch/", env!("CARGO_PKG_VERSION")).to_string());

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ProbeFailure::Client(e.to_string()))?;

        Ok(HttpProber { client })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routewatch_types::{SENTINEL_DELAY_MS, UNSUPPORTED_STATUS};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response after `delay`.
    async fn serve_once(body_len: usize, status: &'static str, delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            tokio::time::sleep(delay).await;
            let body = "x".repeat(body_len);
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status, body_len, body
            );
            let _ = socket.write_all(response.as_bytes()).await;
        });

        format!("http://{}/health", addr)
    }

    #[derive(Debug)]
    struct PanicProber;

    #[async_trait]
    impl RouteProber for PanicProber {
        async fn probe(&self, _route: &Route) -> Result<RouteResponse, ProbeFailure> {
            panic!("non-GET routes must not be probed");
        }
    }

    #[derive(Debug)]
    struct FailingProber;

    #[async_trait]
    impl RouteProber for FailingProber {
        async fn probe(&self, _route: &Route) -> Result<RouteResponse, ProbeFailure> {
            Err(ProbeFailure::Timeout)
        }
    }

    #[test]
    fn test_route_method() {
        assert!(Route::get("http://a").is_probed());
        assert!(Route::new("http://a", "GET").is_probed());
        assert!(!Route::new("http://a", "get").is_probed());
        assert!(!Route::new("http://a", "Get").is_probed());
        assert!(!Route::new("http://a", "POST").is_probed());
    }

    #[tokio::test]
    async fn test_non_get_yields_sentinel() {
        for method in ["POST", "PUT", "DELETE", "get", ""] {
            let response = dispatch(&PanicProber, &Route::new("http://a", method)).await;
            assert_eq!(response.delay_ms, SENTINEL_DELAY_MS);
            assert_eq!(response.status_code, UNSUPPORTED_STATUS);
        }
    }

    #[tokio::test]
    async fn test_failure_is_recovered() {
        let response = dispatch(&FailingProber, &Route::get("http://a")).await;
        assert!(response.is_failure());
    }

    #[tokio::test]
    async fn test_http_probe_measures_response() {
        let url = serve_once(512, "200 OK", Duration::from_millis(120)).await;
        let prober = HttpProber::builder().build().unwrap();

        let response = prober.probe(&Route::get(url)).await.unwrap();
        assert!(response.delay_ms >= 120, "delay was {}", response.delay_ms);
        assert_eq!(response.response_length, 512);
        assert_eq!(response.status_code, 200);
    }

    #[tokio::test]
    async fn test_http_probe_keeps_error_status() {
        let url = serve_once(0, "503 Service Unavailable", Duration::ZERO).await;
        let prober = HttpProber::builder().build().unwrap();

        let response = prober.probe(&Route::get(url)).await.unwrap();
        assert_eq!(response.status_code, 503);
        assert_eq!(response.response_length, 0);
    }

    #[tokio::test]
    async fn test_http_probe_connection_refused() {
        // Bind then drop to get a port nothing listens on.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let prober = HttpProber::builder().build().unwrap();

        let result = prober.probe(&Route::get(format!("http://{}/", addr))).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_http_probe_timeout() {
        let url = serve_once(1, "200 OK", Duration::from_secs(5)).await;
        let prober = HttpProber::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();

        let result = prober.probe(&Route::get(url)).await;
        assert!(matches!(result, Err(ProbeFailure::Timeout)));
    }
}
