//! `Redirector`: `spec.md` §4.6's "configuration `{target, statusCode ∈
//! [300,399] default 301, cacheControl?}`. Builds `<target><dispatch.extra
//! path-string>` (with a single slash between); emits a redirect response
//! with the configured status and optional `Cache-Control`. Default accepted
//! methods include `GET, HEAD, POST, PUT, DELETE, PATCH`."

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use wharf_component::{Application, Component, ComponentBase};
use wharf_core::{empty_body, Dispatch, Result, WharfError, WharfRequest, WharfResponse};

fn default_status_code() -> u16 {
    301
}

fn default_methods() -> Vec<String> {
    ["GET", "HEAD", "POST", "PUT", "DELETE", "PATCH"].into_iter().map(String::from).collect()
}

#[derive(Debug, Clone, Deserialize)]
struct RedirectorConfig {
    target: String,
    #[serde(default = "default_status_code", rename = "statusCode")]
    status_code: u16,
    #[serde(default, rename = "cacheControl")]
    cache_control: Option<String>,
    #[serde(default = "default_methods")]
    methods: Vec<String>,
}

impl RedirectorConfig {
    fn validate(&self) -> Result<()> {
        if !(300..=399).contains(&self.status_code) {
            return Err(WharfError::Configuration(format!(
                "redirector statusCode {} must be in [300, 399]",
                self.status_code
            )));
        }
        Ok(())
    }
}

pub struct Redirector {
    base: ComponentBase,
    config: RedirectorConfig,
}

impl Redirector {
    pub fn new(params: &serde_json::Map<String, serde_json::Value>) -> Result<Arc<Self>> {
        let config: RedirectorConfig = serde_json::from_value(serde_json::Value::Object(params.clone()))?;
        config.validate()?;
        Ok(Arc::new(Self { base: ComponentBase::new(), config }))
    }
}

#[async_trait]
impl Component for Redirector {
    fn class_stem(&self) -> &'static str {
        "redirector"
    }

    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn as_application(self: Arc<Self>) -> Option<Arc<dyn Application>> {
        Some(self)
    }
}

#[async_trait]
impl Application for Redirector {
    async fn handle_request(
        &self,
        request: &mut WharfRequest,
        dispatch: &Dispatch,
    ) -> Result<Option<WharfResponse>> {
        let method = request.method.as_str();
        if !self.config.methods.iter().any(|m| m.eq_ignore_ascii_case(method)) {
            return Ok(None);
        }

        let target = self.config.target.trim_end_matches('/');
        let extra = dispatch.extra_path();
        let location = if extra == "/" { format!("{target}/") } else { format!("{target}{extra}") };

        let mut builder = http::Response::builder()
            .status(self.config.status_code)
            .header(http::header::LOCATION, location);
        if let Some(cache_control) = &self.config.cache_control {
            builder = builder.header(http::header::CACHE_CONTROL, cache_control.as_str());
        }
        let response = builder
            .body(empty_body())
            .map_err(|e| WharfError::Internal(format!("failed to build redirect response: {e}")))?;
        Ok(Some(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wharf_core::{PathKey, Protocol};

    fn request(method: http::Method) -> WharfRequest {
        WharfRequest {
            id: String::new(),
            endpoint_addr: "127.0.0.1:8080".parse().unwrap(),
            origin_addr: "127.0.0.1:9000".parse().unwrap(),
            protocol: Protocol::Http1,
            method,
            uri: "/old/a/b".parse().unwrap(),
            headers: http::HeaderMap::new(),
            host: PathKey::parse_host("localhost"),
            body: None,
        }
    }

    #[tokio::test]
    async fn concatenates_target_and_extra_path() {
        let redirector = Redirector::new(&serde_json::from_value(serde_json::json!({"target": "https://new/base/"})).unwrap()).unwrap();
        let dispatch = Dispatch::new(PathKey::parse_path("/old/"), vec!["a".into(), "b".into()]);
        let mut req = request(http::Method::GET);
        let resp = redirector.handle_request(&mut req, &dispatch).await.unwrap().unwrap();
        assert_eq!(resp.status(), 301);
        assert_eq!(resp.headers().get(http::header::LOCATION).unwrap(), "https://new/base/a/b");
    }

    #[tokio::test]
    async fn rejects_invalid_status_code() {
        let err = Redirector::new(&serde_json::from_value(serde_json::json!({"target": "https://new/", "statusCode": 200})).unwrap())
            .unwrap_err();
        assert!(matches!(err, WharfError::Configuration(_)));
    }

    #[tokio::test]
    async fn unsupported_method_returns_none() {
        let redirector = Redirector::new(&serde_json::from_value(serde_json::json!({
            "target": "https://new/",
            "methods": ["GET"],
        })).unwrap())
        .unwrap();
        let dispatch = Dispatch::new(PathKey::parse_path("/old/"), Vec::new());
        let mut req = request(http::Method::OPTIONS);
        assert!(redirector.handle_request(&mut req, &dispatch).await.unwrap().is_none());
    }
}
