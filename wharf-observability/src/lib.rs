//! Tracing-backed `Logger`, the default `RequestLoggerService`
//! (`AccessLogService`), and Prometheus metrics (`MetricsRegistry`) — the
//! ambient observability stack the teacher's `ando-observability` crate
//! provided, reshaped around Wharf's `Logger`/`Service` contracts.

pub mod access_log;
pub mod metrics;
pub mod prometheus_exporter;
pub mod request_logger;
pub mod tracing_logger;

pub use access_log::AccessLogEntry;
pub use metrics::MetricsRegistry;
pub use request_logger::AccessLogService;
pub use tracing_logger::TracingLogger;

use std::sync::Arc;
use wharf_component::{Component, ComponentRegistry};

/// Register the built-in observability classes under their config-file
/// `class` names, mirroring `wharf_apps::register_all`.
pub fn register_all(registry: &ComponentRegistry) {
    registry.register(
        "access_log",
        Arc::new(|params| Ok(AccessLogService::new(params)? as Arc<dyn Component>)),
    );
    registry.register(
        "metrics",
        Arc::new(|params| Ok(MetricsRegistry::new(params)? as Arc<dyn Component>)),
    );
}
