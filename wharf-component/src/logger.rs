//! The `Logger` interface from Design Notes §9: the source's proxy-based
//! property dispatch (a logger that also acts as a sub-logger factory when
//! accessed as a property) becomes an explicit trait with `with`/`event`/
//! `new_id` methods; the property-chain idiom becomes method chaining.
//!
//! The default, tracing-backed implementation lives in `wharf-observability`
//! (kept out of this crate to avoid every `Application`/`Service` impl
//! pulling in `tracing-subscriber`'s formatting machinery); this crate only
//! fixes the contract `ControlContext` is built around.

use serde_json::Value;
use std::sync::Arc;

/// A structured event logger, scoped to a point in the component hierarchy.
/// `with(context)` returns a child logger carrying an extended context (a
/// component name, a connection id, a request id, ...), mirroring how the
/// source's logger gained sub-loggers by property access.
pub trait Logger: Send + Sync {
    fn with(&self, context: &str) -> Arc<dyn Logger>;
    fn event(&self, event_type: &str, fields: Value);
    /// Allocate a request id scoped to this logger (typically a per-endpoint
    /// logger wrapping a `wharf_core::RequestIdAllocator`).
    fn new_id(&self) -> String;
}

/// A logger that discards everything. Used as the root context's logger
/// when no collaborator is wired in (unit tests, `--dry-run`).
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn with(&self, _context: &str) -> Arc<dyn Logger> {
        Arc::new(NoopLogger)
    }

    fn event(&self, _event_type: &str, _fields: Value) {}

    fn new_id(&self) -> String {
        "00_00000_0000".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_logger_with_returns_another_noop() {
        let logger: Arc<dyn Logger> = Arc::new(NoopLogger);
        let child = logger.with("endpoint1");
        child.event("requestStarted", serde_json::json!({"id": "x"}));
    }
}
