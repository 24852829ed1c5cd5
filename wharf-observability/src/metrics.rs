//! Prometheus-backed metrics, grounded on the teacher's
//! `ando-observability/src/metrics.rs`. Registered as an ordinary built-in
//! `Application` so a deployment mounts it at whatever path it likes
//! (typically `/metrics`) the same way it mounts `StaticFileApp`, rather
//! than requiring a separate admin HTTP surface.

use std::sync::Arc;

use async_trait::async_trait;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry};

use wharf_component::{Application, Component, ComponentBase};
use wharf_core::{full_body, Dispatch, Result, WharfError, WharfRequest, WharfResponse};

pub struct MetricsRegistry {
    base: ComponentBase,
    registry: Registry,
    pub http_requests_total: IntCounterVec,
    pub http_request_duration: HistogramVec,
    pub active_connections: IntGauge,
}

impl MetricsRegistry {
    pub fn new(_params: &serde_json::Map<String, serde_json::Value>) -> Result<Arc<Self>> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("wharf_http_requests_total", "Total HTTP requests").namespace("wharf"),
            &["host", "status"],
        )
        .map_err(metrics_err)?;
        let http_request_duration = HistogramVec::new(
            HistogramOpts::new("wharf_http_request_duration_seconds", "Request latency")
                .namespace("wharf")
                .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["host"],
        )
        .map_err(metrics_err)?;
        let active_connections =
            IntGauge::new("wharf_active_connections", "Active connections across all endpoints").map_err(metrics_err)?;

        registry.register(Box::new(http_requests_total.clone())).map_err(metrics_err)?;
        registry.register(Box::new(http_request_duration.clone())).map_err(metrics_err)?;
        registry.register(Box::new(active_connections.clone())).map_err(metrics_err)?;

        Ok(Arc::new(Self {
            base: ComponentBase::new(),
            registry,
            http_requests_total,
            http_request_duration,
            active_connections,
        }))
    }

    pub fn record_request(&self, host: &str, status: u16, duration_secs: f64) {
        self.http_requests_total.with_label_values(&[host, &status.to_string()]).inc();
        self.http_request_duration.with_label_values(&[host]).observe(duration_secs);
    }

    pub fn gather_text(&self) -> String {
        crate::prometheus_exporter::render_metrics(&self.registry)
    }
}

fn metrics_err(e: prometheus::Error) -> WharfError {
    WharfError::Internal(format!("metrics registration failed: {e}"))
}

#[async_trait]
impl Component for MetricsRegistry {
    fn class_stem(&self) -> &'static str {
        "metrics"
    }

    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn as_application(self: Arc<Self>) -> Option<Arc<dyn Application>> {
        Some(self)
    }
}

#[async_trait]
impl Application for MetricsRegistry {
    async fn handle_request(&self, request: &mut WharfRequest, _dispatch: &Dispatch) -> Result<Option<WharfResponse>> {
        if request.method != http::Method::GET {
            return Ok(None);
        }
        let body = self.gather_text();
        let response = http::Response::builder()
            .status(200)
            .header(http::header::CONTENT_TYPE, "text/plain; version=0.0.4")
            .body(full_body(body))
            .map_err(|e| WharfError::Internal(format!("failed to build metrics response: {e}")))?;
        Ok(Some(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wharf_core::{Dispatch as D, PathKey, Protocol};

    fn get_request() -> WharfRequest {
        WharfRequest {
            id: String::new(),
            endpoint_addr: "127.0.0.1:9000".parse().unwrap(),
            origin_addr: "127.0.0.1:9001".parse().unwrap(),
            protocol: Protocol::Http1,
            method: http::Method::GET,
            uri: "/metrics".parse().unwrap(),
            headers: http::HeaderMap::new(),
            host: PathKey::parse_host("a.test"),
            body: None,
        }
    }

    #[tokio::test]
    async fn gather_text_includes_recorded_counters() {
        let collector = MetricsRegistry::new(&serde_json::Map::new()).unwrap();
        collector.record_request("a.test", 200, 0.01);
        let text = collector.gather_text();
        assert!(text.contains("wharf_http_requests_total"));
    }

    #[tokio::test]
    async fn handle_request_serves_exposition_text() {
        let collector = MetricsRegistry::new(&serde_json::Map::new()).unwrap();
        collector.record_request("a.test", 200, 0.01);
        let dispatch = D::new(PathKey::universal(), Vec::new());
        let mut req = get_request();
        let resp = collector.handle_request(&mut req, &dispatch).await.unwrap().unwrap();
        assert_eq!(resp.status(), 200);
    }
}
