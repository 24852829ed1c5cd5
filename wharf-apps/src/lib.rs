//! Built-in routing applications and services: `spec.md` §4.6's
//! `HostRouter`, `SerialRouter`, `Redirector`, plus the default
//! `RateLimiterService` (`TokenRateLimiter`) and the `StaticFileApp`
//! supplement.

pub mod host_router;
pub mod rate_limiter;
pub mod redirector;
pub mod serial_router;
pub mod static_file;

pub use host_router::HostRouter;
pub use rate_limiter::TokenRateLimiter;
pub use redirector::Redirector;
pub use serial_router::SerialRouter;
pub use static_file::StaticFileApp;

use std::sync::Arc;
use wharf_component::{Component, ComponentRegistry};

/// Register every built-in application/service class under its config-file
/// `class` name, mirroring the teacher's `ando_plugins::register_all`.
pub fn register_all(registry: &ComponentRegistry) {
    registry.register(
        "host_router",
        Arc::new(|params| Ok(HostRouter::new(params)? as Arc<dyn Component>)),
    );
    registry.register(
        "serial_router",
        Arc::new(|params| Ok(SerialRouter::new(params)? as Arc<dyn Component>)),
    );
    registry.register(
        "redirector",
        Arc::new(|params| Ok(Redirector::new(params)? as Arc<dyn Component>)),
    );
    registry.register(
        "rate_limiter",
        Arc::new(|params| Ok(TokenRateLimiter::new(params)? as Arc<dyn Component>)),
    );
    registry.register(
        "static_file",
        Arc::new(|params| Ok(StaticFileApp::new(params)? as Arc<dyn Component>)),
    );
}
