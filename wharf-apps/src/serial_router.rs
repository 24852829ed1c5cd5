//! `SerialRouter`: `spec.md` §4.6's "configuration `applications:
//! ["app1","app2",…]`. Resolves each name. On request, invokes each in
//! order; returns the first non-null result. If all return null, returns
//! null."

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde::Deserialize;

use wharf_component::{Application, Component, ComponentBase, ControlContext};
use wharf_core::{Dispatch, Result, WharfError, WharfRequest, WharfResponse};

#[derive(Debug, Clone, Deserialize)]
struct SerialRouterConfig {
    applications: Vec<String>,
}

pub struct SerialRouter {
    base: ComponentBase,
    config: SerialRouterConfig,
    chain: OnceLock<Vec<Arc<dyn Application>>>,
}

impl SerialRouter {
    pub fn new(params: &serde_json::Map<String, serde_json::Value>) -> Result<Arc<Self>> {
        let config: SerialRouterConfig = serde_json::from_value(serde_json::Value::Object(params.clone()))?;
        Ok(Arc::new(Self { base: ComponentBase::new(), config, chain: OnceLock::new() }))
    }
}

#[async_trait]
impl Component for SerialRouter {
    fn class_stem(&self) -> &'static str {
        "serialRouter"
    }

    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn as_application(self: Arc<Self>) -> Option<Arc<dyn Application>> {
        Some(self)
    }

    async fn impl_init(&self, ctx: &Arc<ControlContext>) -> Result<()> {
        let chain = self
            .config
            .applications
            .iter()
            .map(|name| ctx.get_application(name))
            .collect::<Result<Vec<_>>>()?;
        self.chain.set(chain).map_err(|_| WharfError::Internal("SerialRouter initialized twice".into()))
    }
}

#[async_trait]
impl Application for SerialRouter {
    async fn handle_request(
        &self,
        request: &mut WharfRequest,
        dispatch: &Dispatch,
    ) -> Result<Option<WharfResponse>> {
        let chain = self.chain.get().ok_or_else(|| WharfError::Internal("SerialRouter used before init".into()))?;
        for app in chain {
            if let Some(response) = app.handle_request(request, dispatch).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}
