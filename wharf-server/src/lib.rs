//! The Warehouse / root component (`spec.md` §4/§9), plus the reference
//! driver's ambient CLI and signal wiring (`SPEC_FULL.md` §6). Config file
//! loading and the logging backend itself stay out of scope per `spec.md`
//! §1 — this crate only wires the teacher's crates (`clap`, `tokio::signal`,
//! `tracing-subscriber`) around them the way a complete binary needs to.

pub mod cli;
pub mod signals;
pub mod warehouse;

pub use cli::{Cli, UsageError};
pub use signals::{ControlEvent, SignalListener};
pub use warehouse::{Warehouse, WarehouseOptions};

use std::sync::Arc;

use wharf_component::{ComponentRegistry, Logger};

/// Every built-in application/service class, registered once at startup —
/// mirrors the teacher's `ando_plugins::register_all` call in `main`.
pub fn builtin_registry() -> Arc<ComponentRegistry> {
    let registry = Arc::new(ComponentRegistry::new());
    wharf_apps::register_all(&registry);
    wharf_observability::register_all(&registry);
    registry
}

/// The default `Logger`: `tracing`-backed unless the caller is running a
/// `--dry-run` probe that never logs structured events.
pub fn default_logger(tag_index: u32) -> Arc<dyn Logger> {
    wharf_observability::TracingLogger::root(tag_index)
}
