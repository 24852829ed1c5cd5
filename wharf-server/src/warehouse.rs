//! `Warehouse`: the `spec.md` §4/§9 root component. Constructs the host
//! manager, service manager, application manager, and endpoint manager from
//! a `GatewayConfig` and starts/stops them in the declared phase order
//! (services -> applications -> endpoints, `SPEC_FULL.md` §5), rather than
//! via the generic `Component::children()` concurrent-start the framework
//! gives ordinary nodes — `Warehouse::children()` stays empty so the
//! framework's own `start_tree`/`stop_tree` never double-drives the phases
//! this module orchestrates by hand.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;

use wharf_component::{
    init_child, start_tree, stop_tree, Component, ComponentBase, ComponentRegistry, ControlContext,
};
use wharf_core::config::GatewayConfig;
use wharf_core::{Result, WharfError};
use wharf_endpoint::Endpoint;
use wharf_tls::HostManager;

/// How far the `Warehouse` is willing to let endpoint-stop and
/// application-stop overlap before it initiates service-stop regardless,
/// per `spec.md` §5's bounded 250 ms grace period.
const ENDPOINT_APP_STOP_GRACE: Duration = Duration::from_millis(250);

/// `--early-errors`: when set, a failure constructing or wiring any single
/// service/application aborts the whole warehouse start (surfacing the
/// error as soon as it's seen). Unset (the default), `spec.md` §7's "fatal
/// to the owning subtree" reading is taken literally: the failing entry is
/// logged and skipped, and its siblings still start.
#[derive(Debug, Clone, Copy)]
pub struct WarehouseOptions {
    pub early_errors: bool,
}

impl Default for WarehouseOptions {
    fn default() -> Self {
        Self { early_errors: false }
    }
}

pub struct Warehouse {
    base: ComponentBase,
    config: GatewayConfig,
    registry: Arc<ComponentRegistry>,
    options: WarehouseOptions,
    host_manager: OnceLock<Option<Arc<HostManager>>>,
    services: OnceLock<Vec<Arc<dyn Component>>>,
    applications: OnceLock<Vec<Arc<dyn Component>>>,
    endpoints: OnceLock<Vec<Arc<dyn Component>>>,
}

impl Warehouse {
    pub fn new(
        config: GatewayConfig,
        registry: Arc<ComponentRegistry>,
        options: WarehouseOptions,
    ) -> Arc<Self> {
        Arc::new(Self {
            base: ComponentBase::new(),
            config,
            registry,
            options,
            host_manager: OnceLock::new(),
            services: OnceLock::new(),
            applications: OnceLock::new(),
            endpoints: OnceLock::new(),
        })
    }

    fn handle_wiring_error(&self, phase: &str, class: &str, err: WharfError) -> Result<()> {
        if self.options.early_errors {
            return Err(err);
        }
        tracing::warn!(phase, class, error = %err, "skipping component that failed to wire; continuing");
        Ok(())
    }

    pub fn dump_tree(&self) -> Vec<String> {
        self.context().dump_tree()
    }
}

#[async_trait]
impl Component for Warehouse {
    fn class_stem(&self) -> &'static str {
        "warehouse"
    }

    fn base(&self) -> &ComponentBase {
        &self.base
    }

    async fn impl_init(&self, ctx: &Arc<ControlContext>) -> Result<()> {
        let host_manager = match &self.config.host_manager {
            Some(node) => {
                let hm = HostManager::new(&node.params)?;
                init_child(ctx, node.name.as_deref(), hm.clone() as Arc<dyn Component>).await?;
                Some(hm)
            }
            None => None,
        };
        self.host_manager
            .set(host_manager.clone())
            .map_err(|_| WharfError::Internal("warehouse initialized twice".into()))?;

        let services = self.build_phase(ctx, &self.config.services, "services").await?;
        self.services
            .set(services)
            .map_err(|_| WharfError::Internal("warehouse services initialized twice".into()))?;

        let applications = self.build_phase(ctx, &self.config.applications, "applications").await?;
        self.applications
            .set(applications)
            .map_err(|_| WharfError::Internal("warehouse applications initialized twice".into()))?;

        let mut endpoints: Vec<Arc<dyn Component>> = Vec::with_capacity(self.config.endpoints.len());
        for node in &self.config.endpoints {
            match Endpoint::new(&node.params, host_manager.clone()) {
                Ok(endpoint) => {
                    let endpoint_dyn = endpoint.clone() as Arc<dyn Component>;
                    match init_child(ctx, node.name.as_deref(), endpoint_dyn.clone()).await {
                        Ok(_) => endpoints.push(endpoint_dyn),
                        Err(e) => self.handle_wiring_error("endpoints", &node.class, e)?,
                    }
                }
                Err(e) => self.handle_wiring_error("endpoints", &node.class, e)?,
            }
        }
        self.endpoints
            .set(endpoints)
            .map_err(|_| WharfError::Internal("warehouse endpoints initialized twice".into()))?;

        Ok(())
    }

    async fn impl_start(&self, is_reload: bool) -> Result<()> {
        if let Some(hm) = self.host_manager.get().cloned().flatten() {
            let hm_dyn: Arc<dyn Component> = hm;
            start_tree(&hm_dyn, is_reload).await?;
        }

        start_phase(self.services.get().map(Vec::as_slice).unwrap_or_default(), is_reload).await?;
        start_phase(self.applications.get().map(Vec::as_slice).unwrap_or_default(), is_reload).await?;
        start_phase(self.endpoints.get().map(Vec::as_slice).unwrap_or_default(), is_reload).await?;
        Ok(())
    }

    async fn impl_stop(&self, will_reload: bool) -> Result<()> {
        let endpoints = self.endpoints.get().cloned().unwrap_or_default();
        let applications = self.applications.get().cloned().unwrap_or_default();
        let services = self.services.get().cloned().unwrap_or_default();
        let host_manager = self.host_manager.get().cloned().flatten();

        // Endpoint-stop and application-stop may overlap within a bounded
        // grace period, per `spec.md` §5; after it elapses, service-stop
        // begins regardless of whether they have finished.
        let overlapping: Vec<Arc<dyn Component>> =
            endpoints.into_iter().chain(applications.into_iter()).collect();
        let handles: Vec<_> = overlapping
            .into_iter()
            .map(|c| tokio::spawn(async move { stop_tree(&c, will_reload).await }))
            .collect();
        let drained = tokio::time::timeout(ENDPOINT_APP_STOP_GRACE, join_all_logged(handles)).await;
        if drained.is_err() {
            tracing::warn!("endpoint/application stop exceeded its grace period; stopping services regardless");
        }

        let service_handles: Vec<_> = services
            .into_iter()
            .map(|c| tokio::spawn(async move { stop_tree(&c, will_reload).await }))
            .collect();
        join_all_logged(service_handles).await;

        if let Some(hm) = host_manager {
            let hm_dyn: Arc<dyn Component> = hm;
            if let Err(e) = stop_tree(&hm_dyn, will_reload).await {
                tracing::warn!(error = %e, "host manager stop failed; continuing");
            }
        }

        Ok(())
    }
}

impl Warehouse {
    async fn build_phase(
        &self,
        ctx: &Arc<ControlContext>,
        nodes: &[wharf_core::config::ComponentConfig],
        phase: &str,
    ) -> Result<Vec<Arc<dyn Component>>> {
        let mut built = Vec::with_capacity(nodes.len());
        for node in nodes {
            match self.registry.construct(&node.class, &node.params) {
                Ok(component) => match init_child(ctx, node.name.as_deref(), component.clone()).await {
                    Ok(_) => built.push(component),
                    Err(e) => self.handle_wiring_error(phase, &node.class, e)?,
                },
                Err(e) => self.handle_wiring_error(phase, &node.class, e)?,
            }
        }
        Ok(built)
    }
}

/// Starts every sibling in `components` concurrently (matching the generic
/// framework's own children-start discipline) and waits for the whole
/// phase before the caller moves to the next one.
async fn start_phase(components: &[Arc<dyn Component>], is_reload: bool) -> Result<()> {
    let mut handles = Vec::with_capacity(components.len());
    for component in components.iter().cloned() {
        handles.push(tokio::spawn(async move { start_tree(&component, is_reload).await }));
    }
    for handle in handles {
        handle
            .await
            .map_err(|e| WharfError::Internal(format!("phase start task panicked: {e}")))??;
    }
    Ok(())
}

async fn join_all_logged(handles: Vec<tokio::task::JoinHandle<Result<()>>>) {
    for handle in handles {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "component stop failed; continuing"),
            Err(e) => tracing::warn!(error = %e, "component stop task panicked; continuing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wharf_component::{init_root, ComponentRegistry, NoopLogger};
    use wharf_core::config::ComponentConfig;

    fn registry() -> Arc<ComponentRegistry> {
        let registry = Arc::new(ComponentRegistry::new());
        wharf_apps::register_all(&registry);
        wharf_observability::register_all(&registry);
        registry
    }

    fn node(class: &str, name: &str, params: serde_json::Value) -> ComponentConfig {
        ComponentConfig {
            class: class.to_string(),
            name: Some(name.to_string()),
            children: Vec::new(),
            params: match params {
                serde_json::Value::Object(map) => map,
                _ => serde_json::Map::new(),
            },
        }
    }

    #[tokio::test]
    async fn empty_config_starts_and_stops_cleanly() {
        let config = GatewayConfig::default();
        let warehouse = Warehouse::new(config, registry(), WarehouseOptions::default());
        let root_ctx = ControlContext::root(Arc::new(NoopLogger));
        let warehouse_dyn = warehouse.clone() as Arc<dyn Component>;
        init_root(&root_ctx, warehouse_dyn.clone()).await.unwrap();
        start_tree(&warehouse_dyn, false).await.unwrap();
        stop_tree(&warehouse_dyn, false).await.unwrap();
    }

    #[tokio::test]
    async fn redirector_mounted_under_an_endpoint_is_wired_and_started() {
        let mut config = GatewayConfig::default();
        config.applications.push(node(
            "redirector",
            "redirect1",
            serde_json::json!({"target": "https://new.test/base/"}),
        ));
        config.endpoints.push(node(
            "endpoint",
            "web1",
            serde_json::json!({
                "protocol": "http",
                "interface": "127.0.0.1",
                "port": 0,
                "hostnames": ["*"],
                "mounts": [{"application": "redirect1", "at": "//*/"}],
            }),
        ));
        let warehouse = Warehouse::new(config, registry(), WarehouseOptions::default());
        let root_ctx = ControlContext::root(Arc::new(NoopLogger));
        let warehouse_dyn = warehouse.clone() as Arc<dyn Component>;
        init_root(&root_ctx, warehouse_dyn.clone()).await.unwrap();
        start_tree(&warehouse_dyn, false).await.unwrap();
        assert!(warehouse.dump_tree().iter().any(|p| p == "redirect1"));
        assert!(warehouse.dump_tree().iter().any(|p| p == "web1"));
        stop_tree(&warehouse_dyn, false).await.unwrap();
    }

    #[tokio::test]
    async fn early_errors_makes_a_bad_endpoint_mount_fatal() {
        let mut config = GatewayConfig::default();
        config.endpoints.push(node(
            "endpoint",
            "web1",
            serde_json::json!({
                "protocol": "http",
                "interface": "127.0.0.1",
                "port": 0,
                "hostnames": ["*"],
                "mounts": [{"application": "does-not-exist", "at": "//*/"}],
            }),
        ));
        let warehouse = Warehouse::new(config, registry(), WarehouseOptions { early_errors: true });
        let root_ctx = ControlContext::root(Arc::new(NoopLogger));
        let warehouse_dyn = warehouse.clone() as Arc<dyn Component>;
        let err = init_root(&root_ctx, warehouse_dyn).await.unwrap_err();
        assert!(matches!(err, WharfError::NotFound(_)));
    }

    #[tokio::test]
    async fn without_early_errors_a_bad_endpoint_is_skipped_not_fatal() {
        let mut config = GatewayConfig::default();
        config.endpoints.push(node(
            "endpoint",
            "web1",
            serde_json::json!({
                "protocol": "http",
                "interface": "127.0.0.1",
                "port": 0,
                "hostnames": ["*"],
                "mounts": [{"application": "does-not-exist", "at": "//*/"}],
            }),
        ));
        let warehouse = Warehouse::new(config, registry(), WarehouseOptions::default());
        let root_ctx = ControlContext::root(Arc::new(NoopLogger));
        let warehouse_dyn = warehouse.clone() as Arc<dyn Component>;
        init_root(&root_ctx, warehouse_dyn.clone()).await.unwrap();
        start_tree(&warehouse_dyn, false).await.unwrap();
        // The endpoint's own name got registered by `add_child` before its
        // `impl_init` failed wiring the mount, but it never joined the
        // warehouse's own endpoint list, so the phased start/stop below
        // never touches it and the warehouse itself starts and stops clean.
        assert!(warehouse.dump_tree().iter().any(|p| p == "web1"));
        stop_tree(&warehouse_dyn, false).await.unwrap();
    }
}
