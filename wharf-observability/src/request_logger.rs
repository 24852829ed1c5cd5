//! The default `RequestLoggerService`: records `requestStarted`/
//! `requestEnded` pairs as structured access-log events through the
//! component's own `Logger`, grounded on the teacher's `AccessLogEntry`
//! shape (`ando-observability/src/access_log.rs`) and mounted the way the
//! teacher's plugins are — as a `services[]` entry an endpoint's
//! `services.requestLogger` names.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;

use wharf_component::{Component, ComponentBase, ControlContext, Logger, RequestLoggerService, Service};
use wharf_core::{Result, WharfRequest};

use crate::access_log::AccessLogEntry;

struct Pending {
    started: Instant,
    method: String,
    uri: String,
    host: String,
}

pub struct AccessLogService {
    base: ComponentBase,
    logger: OnceLock<Arc<dyn Logger>>,
    pending: DashMap<String, Pending>,
}

impl AccessLogService {
    pub fn new(_params: &serde_json::Map<String, serde_json::Value>) -> Result<Arc<Self>> {
        Ok(Arc::new(Self { base: ComponentBase::new(), logger: OnceLock::new(), pending: DashMap::new() }))
    }
}

#[async_trait]
impl Component for AccessLogService {
    fn class_stem(&self) -> &'static str {
        "accessLog"
    }

    fn base(&self) -> &ComponentBase {
        &self.base
    }

    async fn impl_init(&self, ctx: &Arc<ControlContext>) -> Result<()> {
        self.logger.set(ctx.logger()).ok();
        Ok(())
    }

    fn as_service(self: Arc<Self>) -> Option<Arc<dyn Service>> {
        Some(self)
    }
}

impl Service for AccessLogService {
    fn as_request_logger(self: Arc<Self>) -> Option<Arc<dyn RequestLoggerService>> {
        Some(self)
    }
}

#[async_trait]
impl RequestLoggerService for AccessLogService {
    async fn request_started(&self, request_id: &str, request: &WharfRequest) {
        self.pending.insert(
            request_id.to_string(),
            Pending {
                started: Instant::now(),
                method: request.method.to_string(),
                uri: request.path_string(),
                host: request.authority().unwrap_or_default(),
            },
        );
        if let Some(logger) = self.logger.get() {
            logger.event("requestStarted", serde_json::json!({"id": request_id}));
        }
    }

    async fn request_ended(&self, request_id: &str, status: Option<u16>, error_codes: Vec<String>) {
        let Some((_, pending)) = self.pending.remove(request_id) else {
            return;
        };
        let latency_ms = pending.started.elapsed().as_secs_f64() * 1000.0;
        let entry = AccessLogEntry {
            request_id,
            method: &pending.method,
            uri: &pending.uri,
            host: &pending.host,
            status,
            latency_ms,
            error_codes: &error_codes,
        };
        if let Some(logger) = self.logger.get() {
            logger.event("accessLog", serde_json::to_value(&entry).unwrap_or_default());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wharf_core::{PathKey, Protocol};

    fn sample_request() -> WharfRequest {
        let mut headers = http::HeaderMap::new();
        headers.insert(http::header::HOST, "a.test".parse().unwrap());
        WharfRequest {
            id: String::new(),
            endpoint_addr: "127.0.0.1:8080".parse().unwrap(),
            origin_addr: "127.0.0.1:9000".parse().unwrap(),
            protocol: Protocol::Http1,
            method: http::Method::GET,
            uri: "/a".parse().unwrap(),
            headers,
            host: PathKey::parse_host("a.test"),
            body: None,
        }
    }

    #[tokio::test]
    async fn request_ended_without_started_is_a_noop() {
        let svc = AccessLogService::new(&serde_json::Map::new()).unwrap();
        svc.request_ended("missing", Some(200), Vec::new()).await;
    }

    #[tokio::test]
    async fn started_then_ended_clears_pending_entry() {
        let svc = AccessLogService::new(&serde_json::Map::new()).unwrap();
        svc.request_started("r1", &sample_request()).await;
        assert!(svc.pending.contains_key("r1"));
        svc.request_ended("r1", Some(200), Vec::new()).await;
        assert!(!svc.pending.contains_key("r1"));
    }
}
