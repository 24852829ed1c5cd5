//! `HostRouter`: `spec.md` §4.6's "configuration `hosts: { "host-pattern":
//! "app-name", … }`. On start, resolves each app name via the root component
//! context to obtain the live Application. On request, uses an internal
//! hostname PathMap to select the application for the request's parsed host;
//! `null` return ⇒ 404."

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde::Deserialize;

use wharf_component::{Application, Component, ComponentBase, ControlContext};
use wharf_core::{Dispatch, PathKey, PathMap, Result, WharfError, WharfRequest, WharfResponse};

#[derive(Debug, Clone, Deserialize)]
struct HostRouterConfig {
    hosts: HashMap<String, String>,
}

pub struct HostRouter {
    base: ComponentBase,
    config: HostRouterConfig,
    routes: OnceLock<PathMap<Arc<dyn Application>>>,
}

impl HostRouter {
    pub fn new(params: &serde_json::Map<String, serde_json::Value>) -> Result<Arc<Self>> {
        let config: HostRouterConfig = serde_json::from_value(serde_json::Value::Object(params.clone()))?;
        Ok(Arc::new(Self { base: ComponentBase::new(), config, routes: OnceLock::new() }))
    }
}

#[async_trait]
impl Component for HostRouter {
    fn class_stem(&self) -> &'static str {
        "hostRouter"
    }

    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn as_application(self: Arc<Self>) -> Option<Arc<dyn Application>> {
        Some(self)
    }

    async fn impl_init(&self, ctx: &Arc<ControlContext>) -> Result<()> {
        let mut routes = PathMap::new();
        for (pattern, app_name) in &self.config.hosts {
            let app = ctx.get_application(app_name)?;
            routes
                .add(PathKey::parse_host(pattern), app)
                .map_err(|_| WharfError::AlreadyBound(pattern.clone()))?;
        }
        self.routes.set(routes).map_err(|_| WharfError::Internal("HostRouter initialized twice".into()))
    }
}

#[async_trait]
impl Application for HostRouter {
    async fn handle_request(
        &self,
        request: &mut WharfRequest,
        dispatch: &Dispatch,
    ) -> Result<Option<WharfResponse>> {
        let routes = self.routes.get().ok_or_else(|| WharfError::Internal("HostRouter used before init".into()))?;
        match routes.find(&request.host) {
            Some(found) => found.value.clone().handle_request(request, dispatch).await,
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wharf_component::{init_child, NoopLogger};
    use wharf_core::{full_body, Protocol};

    struct Stub(ComponentBase, &'static str);

    #[async_trait]
    impl Component for Stub {
        fn class_stem(&self) -> &'static str {
            "stub"
        }
        fn base(&self) -> &ComponentBase {
            &self.0
        }
        fn as_application(self: Arc<Self>) -> Option<Arc<dyn Application>> {
            Some(self)
        }
    }

    #[async_trait]
    impl Application for Stub {
        async fn handle_request(
            &self,
            _request: &mut WharfRequest,
            _dispatch: &Dispatch,
        ) -> Result<Option<WharfResponse>> {
            Ok(Some(http::Response::builder().status(200).body(full_body(self.1)).unwrap()))
        }
    }

    fn request(host: &str) -> WharfRequest {
        WharfRequest {
            id: String::new(),
            endpoint_addr: "127.0.0.1:8080".parse().unwrap(),
            origin_addr: "127.0.0.1:9000".parse().unwrap(),
            protocol: Protocol::Http1,
            method: http::Method::GET,
            uri: "/".parse().unwrap(),
            headers: http::HeaderMap::new(),
            host: PathKey::parse_host(host),
            body: None,
        }
    }

    #[tokio::test]
    async fn routes_exact_and_wildcard_hosts_and_404s_otherwise() {
        let root = ControlContext::root(Arc::new(NoopLogger));
        init_child(&root, Some("a"), Arc::new(Stub(ComponentBase::new(), "A")) as Arc<dyn wharf_component::Component>)
            .await
            .unwrap();
        init_child(&root, Some("b"), Arc::new(Stub(ComponentBase::new(), "B")) as Arc<dyn wharf_component::Component>)
            .await
            .unwrap();

        let mut hosts = HashMap::new();
        hosts.insert("a.test".to_string(), "a".to_string());
        hosts.insert("*.b.test".to_string(), "b".to_string());
        let router = Arc::new(HostRouter { base: ComponentBase::new(), config: HostRouterConfig { hosts }, routes: OnceLock::new() });
        router.impl_init(&root).await.unwrap();

        let mut req = request("a.test");
        let dispatch = Dispatch::new(PathKey::universal(), Vec::new());
        let resp = router.handle_request(&mut req, &dispatch).await.unwrap();
        assert!(resp.is_some());

        let mut req = request("x.b.test");
        let resp = router.handle_request(&mut req, &dispatch).await.unwrap();
        assert!(resp.is_some());

        let mut req = request("c.test");
        let resp = router.handle_request(&mut req, &dispatch).await.unwrap();
        assert!(resp.is_none());
    }
}
