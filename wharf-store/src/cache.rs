//! The active `GatewayConfig` held across a reload, grounded on the
//! teacher's `ConfigCache` (in-memory state populated at startup and kept
//! current rather than re-read on every lookup) — reshaped from APISIX's
//! per-resource `DashMap`s to a single `ArcSwap<GatewayConfig>`, since
//! Wharf reloads its whole document atomically on `SIGHUP` rather than
//! patching individual routes.

use std::sync::Arc;

use arc_swap::ArcSwap;

use wharf_core::config::GatewayConfig;

pub struct ConfigCache {
    current: ArcSwap<GatewayConfig>,
}

impl ConfigCache {
    pub fn new(config: GatewayConfig) -> Self {
        Self { current: ArcSwap::from_pointee(config) }
    }

    pub fn current(&self) -> Arc<GatewayConfig> {
        self.current.load_full()
    }

    /// Install a freshly loaded document, returning the one it replaced —
    /// called by the `SIGHUP` reload path once the new tree has started.
    pub fn swap(&self, config: GatewayConfig) -> Arc<GatewayConfig> {
        self.current.swap(Arc::new(config))
    }
}
