//! `HostManager`: the `spec.md` §4.4 component. Resolves a requested
//! hostname to a TLS context (SNI or `host`/`:authority` fallback) and
//! exposes a `rustls::ServerConfig` endpoints can bind their listeners to.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use rustls::ServerConfig;
use serde::Deserialize;

use wharf_component::{Component, ComponentBase, ControlContext};
use wharf_core::{PathKey, PathMap, Result, WharfError};

use crate::host_item::{CertSource, HostItem};
use crate::self_sign::{RcgenIssuer, SelfSignIssuer};

/// One `hosts[]` entry from the config schema in `spec.md` §6:
/// `{ hostnames:[str,…], certificate?:PEM, privateKey?:PEM, selfSigned?:bool }`.
#[derive(Debug, Clone, Deserialize)]
pub struct HostEntryConfig {
    pub hostnames: Vec<String>,
    #[serde(default)]
    pub certificate: Option<String>,
    #[serde(default, rename = "privateKey")]
    pub private_key: Option<String>,
    #[serde(default, rename = "selfSigned")]
    pub self_signed: bool,
}

#[derive(Debug, Default, Deserialize)]
struct HostManagerConfig {
    #[serde(default)]
    hosts: Vec<HostEntryConfig>,
}

impl HostEntryConfig {
    fn into_source(self) -> Result<(Vec<String>, CertSource)> {
        let source = if self.self_signed {
            CertSource::SelfSigned
        } else {
            match (self.certificate, self.private_key) {
                (Some(cert_pem), Some(key_pem)) => CertSource::Pem { cert_pem, key_pem },
                _ => {
                    return Err(WharfError::Configuration(
                        "host entry needs either selfSigned=true or both certificate and privateKey"
                            .into(),
                    ))
                }
            }
        };
        Ok((self.hostnames, source))
    }
}

pub struct HostManager {
    base: ComponentBase,
    raw_config: HostManagerConfig,
    issuer: Arc<dyn SelfSignIssuer>,
    items: OnceLock<PathMap<Arc<HostItem>>>,
    resolver: OnceLock<Arc<SniResolver>>,
}

impl HostManager {
    pub fn new(params: &serde_json::Map<String, serde_json::Value>) -> Result<Arc<Self>> {
        let raw_config: HostManagerConfig = serde_json::from_value(serde_json::Value::Object(params.clone()))?;
        Ok(Arc::new(Self {
            base: ComponentBase::new(),
            raw_config,
            issuer: Arc::new(RcgenIssuer),
            items: OnceLock::new(),
            resolver: OnceLock::new(),
        }))
    }

    /// `findContext(name)` from `spec.md` §4.4: PathMap best-match over the
    /// *resolved* certificates, populated eagerly during `start`.
    pub fn find_context(&self, name: &str) -> Option<Arc<CertifiedKey>> {
        let resolver = self.resolver.get()?;
        resolver.find(name)
    }

    /// The `rustls::ServerConfig` HTTPS/HTTP2 endpoints bind to; this is the
    /// `getSecureServerOptions` collaborator from `spec.md` §4.5.
    pub fn server_config(&self) -> Result<Arc<ServerConfig>> {
        let resolver = self
            .resolver
            .get()
            .ok_or_else(|| WharfError::Internal("host manager not started".into()))?
            .clone();
        let mut config = ServerConfig::builder()
            .with_no_client_auth()
            .with_cert_resolver(resolver);
        config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
        Ok(Arc::new(config))
    }

    fn items(&self) -> &PathMap<Arc<HostItem>> {
        self.items.get().expect("host manager not initialized")
    }
}

#[async_trait]
impl Component for HostManager {
    fn class_stem(&self) -> &'static str {
        "host_manager"
    }

    fn base(&self) -> &ComponentBase {
        &self.base
    }

    async fn impl_init(&self, _ctx: &Arc<ControlContext>) -> Result<()> {
        let mut map = PathMap::new();
        for entry in self.raw_config.hosts.clone() {
            let (hostnames, source) = entry.into_source()?;
            if hostnames.is_empty() {
                return Err(WharfError::Configuration("host entry has no hostnames".into()));
            }
            let item = Arc::new(HostItem::new(hostnames.clone(), source));
            for hostname in &hostnames {
                map.add(PathKey::parse_host(hostname), item.clone())
                    .map_err(|_| WharfError::AlreadyBound(hostname.clone()))?;
            }
        }
        self.items.set(map).map_err(|_| WharfError::Internal("host manager initialized twice".into()))
    }

    /// Resolves every configured host item's certificate eagerly, off the
    /// accept path, per `spec.md` §4.5's "TLS self-sign is the only
    /// non-trivial CPU work and must run off the accept path" — the
    /// DESIGN.md-recorded tradeoff against `rustls`'s synchronous
    /// `ResolvesServerCert::resolve`.
    async fn impl_start(&self, _is_reload: bool) -> Result<()> {
        let mut resolved = PathMap::new();
        for (key, item) in self.items().iter() {
            let certified = item.resolve(self.issuer.as_ref()).await?;
            resolved
                .add(key, certified)
                .map_err(|e| WharfError::Internal(format!("duplicate resolved host key: {e}")))?;
        }
        self.resolver
            .set(Arc::new(SniResolver { resolved }))
            .map_err(|_| WharfError::AlreadyStarted("host manager already started".into()))
    }
}

/// The `rustls::server::ResolvesServerCert` implementation served to every
/// TLS listener. Built once, immutably, at `HostManager::impl_start`.
struct SniResolver {
    resolved: PathMap<Arc<CertifiedKey>>,
}

impl SniResolver {
    fn find(&self, name: &str) -> Option<Arc<CertifiedKey>> {
        let key = PathKey::parse_host(name);
        self.resolved.find(&key).map(|r| r.value.clone())
    }
}

impl std::fmt::Debug for SniResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SniResolver").field("hosts", &self.resolved.len()).finish()
    }
}

impl ResolvesServerCert for SniResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        let name = client_hello.server_name()?;
        self.find(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wharf_component::{init_root, Logger, NoopLogger};

    fn params(hosts: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        let mut m = serde_json::Map::new();
        m.insert("hosts".to_string(), hosts);
        m
    }

    async fn init_started(manager: Arc<HostManager>) -> Arc<HostManager> {
        let root_ctx = ControlContext::root(Arc::new(NoopLogger) as Arc<dyn Logger>);
        init_root(&root_ctx, manager.clone()).await.unwrap();
        manager.impl_start(false).await.unwrap();
        manager
    }

    #[tokio::test]
    async fn self_signed_host_resolves_via_find_context() {
        let manager = HostManager::new(&params(json!([
            { "hostnames": ["localhost"], "selfSigned": true }
        ])))
        .unwrap();
        let manager = init_started(manager).await;
        assert!(manager.find_context("localhost").is_some());
        assert!(manager.find_context("unknown.test").is_none());
    }

    #[tokio::test]
    async fn wildcard_host_entry_matches_subdomains() {
        let manager = HostManager::new(&params(json!([
            { "hostnames": ["*.example.test"], "selfSigned": true }
        ])))
        .unwrap();
        let manager = init_started(manager).await;
        assert!(manager.find_context("api.example.test").is_some());
        assert!(manager.find_context("example.test").is_none());
    }

    #[tokio::test]
    async fn duplicate_hostname_fails_init_with_already_bound() {
        let manager = HostManager::new(&params(json!([
            { "hostnames": ["dup.test"], "selfSigned": true },
            { "hostnames": ["dup.test"], "selfSigned": true }
        ])))
        .unwrap();
        let root_ctx = ControlContext::root(Arc::new(NoopLogger) as Arc<dyn Logger>);
        let err = init_root(&root_ctx, manager).await.unwrap_err();
        assert!(matches!(err, WharfError::AlreadyBound(_)));
    }

    #[tokio::test]
    async fn host_entry_without_material_is_a_configuration_error() {
        let manager = HostManager::new(&params(json!([{ "hostnames": ["bare.test"] }]))).unwrap();
        let root_ctx = ControlContext::root(Arc::new(NoopLogger) as Arc<dyn Logger>);
        let err = init_root(&root_ctx, manager).await.unwrap_err();
        assert!(matches!(err, WharfError::Configuration(_)));
    }

    #[tokio::test]
    async fn server_config_carries_h2_and_http11_alpn() {
        let manager = HostManager::new(&params(json!([
            { "hostnames": ["localhost"], "selfSigned": true }
        ])))
        .unwrap();
        let manager = init_started(manager).await;
        let config = manager.server_config().unwrap();
        assert_eq!(config.alpn_protocols, vec![b"h2".to_vec(), b"http/1.1".to_vec()]);
    }
}
