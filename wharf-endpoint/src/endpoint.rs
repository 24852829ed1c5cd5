//! `Endpoint`: the `spec.md` §4.5 component tying together the hostname
//! allowlist, mount table, connection bookkeeping, and wrangler accept loop
//! for one `{protocol, interface, port}` listener.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use wharf_component::{Component, ComponentBase, ControlContext, RateLimiterService, RequestLoggerService};
use wharf_core::{RequestIdAllocator, Result, WharfError};
use wharf_tls::HostManager;

use crate::connections::ConnectionTracker;
use crate::mounts::{parse_at, HostAllowlist, MountEntry, MountTable};
use crate::pipeline::Dispatcher;
use crate::wrangler::{accept_loop, ProtocolMode};

#[derive(Debug, Clone, Deserialize)]
pub struct MountConfig {
    pub application: String,
    pub at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServicesConfig {
    #[serde(default, rename = "rateLimiter")]
    pub rate_limiter: Option<String>,
    #[serde(default, rename = "requestLogger")]
    pub request_logger: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub protocol: String,
    pub interface: String,
    pub port: u16,
    #[serde(default)]
    pub hostnames: Vec<String>,
    #[serde(default)]
    pub mounts: Vec<MountConfig>,
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default = "default_grace_period_ms", rename = "gracePeriodMs")]
    pub grace_period_ms: u64,
}

fn default_grace_period_ms() -> u64 {
    5_000
}

impl EndpointConfig {
    fn protocol_mode(&self) -> Result<(ProtocolMode, bool)> {
        match self.protocol.as_str() {
            "http" => Ok((ProtocolMode::Http1Only, false)),
            "http2" => Ok((ProtocolMode::Http2Only, false)),
            "https" => Ok((ProtocolMode::Auto, true)),
            other => Err(WharfError::Configuration(format!("unknown endpoint protocol '{other}'"))),
        }
    }
}

static TAG_COUNTER: AtomicU32 = AtomicU32::new(0);

pub struct Endpoint {
    base: ComponentBase,
    config: EndpointConfig,
    host_manager: Option<Arc<HostManager>>,
    dispatcher: OnceLock<Arc<Dispatcher>>,
    tracker: OnceLock<Arc<ConnectionTracker>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Endpoint {
    pub fn new(
        params: &serde_json::Map<String, serde_json::Value>,
        host_manager: Option<Arc<HostManager>>,
    ) -> Result<Arc<Self>> {
        let config: EndpointConfig = serde_json::from_value(serde_json::Value::Object(params.clone()))?;
        Ok(Arc::new(Self {
            base: ComponentBase::new(),
            config,
            host_manager,
            dispatcher: OnceLock::new(),
            tracker: OnceLock::new(),
            task: Mutex::new(None),
        }))
    }
}

#[async_trait]
impl Component for Endpoint {
    fn class_stem(&self) -> &'static str {
        "endpoint"
    }

    fn base(&self) -> &ComponentBase {
        &self.base
    }

    async fn impl_init(&self, ctx: &Arc<ControlContext>) -> Result<()> {
        let mut entries = Vec::with_capacity(self.config.mounts.len());
        for mount in &self.config.mounts {
            let (host, path) = parse_at(&mount.at)?;
            let application = ctx.get_application(&mount.application)?;
            entries.push(MountEntry { host, path, application });
        }

        let rate_limiter: Option<Arc<dyn RateLimiterService>> = match &self.config.services.rate_limiter {
            Some(name) => Some(ctx.get_service(name)?.as_rate_limiter().ok_or_else(|| WharfError::WrongClass {
                name: name.clone(),
                expected: "RateLimiterService",
                found: "Service",
            })?),
            None => None,
        };
        let request_logger: Option<Arc<dyn RequestLoggerService>> = match &self.config.services.request_logger {
            Some(name) => {
                Some(ctx.get_service(name)?.as_request_logger().ok_or_else(|| WharfError::WrongClass {
                    name: name.clone(),
                    expected: "RequestLoggerService",
                    found: "Service",
                })?)
            }
            None => None,
        };

        let tag_index = TAG_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dispatcher = Dispatcher {
            host_allowlist: HostAllowlist::build(&self.config.hostnames)?,
            mounts: MountTable::build(entries)?,
            request_ids: RequestIdAllocator::new(tag_index),
            rate_limiter,
            request_logger,
        };
        self.dispatcher
            .set(Arc::new(dispatcher))
            .map_err(|_| WharfError::Internal("endpoint initialized twice".into()))
    }

    async fn impl_start(&self, _is_reload: bool) -> Result<()> {
        let (mode, needs_tls) = self.config.protocol_mode()?;
        let tls_acceptor = if needs_tls {
            let host_manager = self
                .host_manager
                .as_ref()
                .ok_or_else(|| WharfError::Configuration("https endpoint requires a host manager".into()))?;
            Some(tokio_rustls::TlsAcceptor::from(host_manager.server_config()?))
        } else {
            None
        };

        let addr: SocketAddr = format!("{}:{}", self.config.interface, self.config.port)
            .parse()
            .map_err(|e| WharfError::Configuration(format!("invalid interface/port: {e}")))?;
        let listener = TcpListener::bind(addr).await?;

        let dispatcher = self
            .dispatcher
            .get()
            .ok_or_else(|| WharfError::Internal("endpoint started before init".into()))?
            .clone();
        let tracker = ConnectionTracker::new();

        let handle = tokio::spawn(accept_loop(listener, tls_acceptor, mode, dispatcher, tracker.clone(), addr));

        self.tracker
            .set(tracker)
            .map_err(|_| WharfError::AlreadyStarted("endpoint already started".into()))?;
        *self.task.lock().await = Some(handle);
        Ok(())
    }

    async fn impl_stop(&self, _will_reload: bool) -> Result<()> {
        let grace_period = Duration::from_millis(self.config.grace_period_ms);
        if let Some(tracker) = self.tracker.get() {
            tracker.stop(grace_period).await;
        }

        if let Some(handle) = self.task.lock().await.take() {
            match tokio::time::timeout(Duration::from_secs(1), handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "endpoint accept task panicked"),
                Err(_) => {
                    return Err(WharfError::StopTimeout(
                        self.context().dotted_name(),
                    ))
                }
            }
        }
        Ok(())
    }
}
