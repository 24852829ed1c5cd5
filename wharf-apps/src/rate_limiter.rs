//! The built-in `RateLimiterService`: `spec.md` §4.5's connection/request
//! rate-limiting hook, backed by `wharf_core::TokenBucket`. Per Design
//! Notes' open question, the connection bucket and request bucket are two
//! independent `TokenBucket`s unless both configured to the same underlying
//! rate on purpose — this implementation never fuses them.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use wharf_component::{Component, ComponentBase, RateLimiterService, Service};
use wharf_core::{GrantOptions, Result, TokenBucket, WharfRequest};

fn default_max_queue_time() -> Option<f64> {
    None
}

fn default_max_queue_size() -> Option<usize> {
    None
}

#[derive(Debug, Clone, Deserialize)]
struct BucketConfig {
    #[serde(rename = "flowRate")]
    flow_rate: f64,
    #[serde(rename = "maxBurst")]
    max_burst: f64,
    #[serde(default = "default_max_queue_time", rename = "maxQueueTime")]
    max_queue_time: Option<f64>,
    #[serde(default = "default_max_queue_size", rename = "maxQueueSize")]
    max_queue_size: Option<usize>,
}

impl BucketConfig {
    fn grant_options(&self) -> GrantOptions {
        GrantOptions { max_wait_time: self.max_queue_time, max_queue_size: self.max_queue_size, min_grant_fraction: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TokenRateLimiterConfig {
    #[serde(default)]
    connection: Option<BucketConfig>,
    #[serde(default)]
    request: Option<BucketConfig>,
}

/// Mounted as a `services[]` entry and referenced by an endpoint's
/// `services.rateLimiter`, per `spec.md` §6's config schema.
pub struct TokenRateLimiter {
    base: ComponentBase,
    config: TokenRateLimiterConfig,
    connection_bucket: Option<TokenBucket>,
    request_bucket: Option<TokenBucket>,
}

impl TokenRateLimiter {
    pub fn new(params: &serde_json::Map<String, serde_json::Value>) -> Result<Arc<Self>> {
        let config: TokenRateLimiterConfig = serde_json::from_value(serde_json::Value::Object(params.clone()))?;
        let connection_bucket = config.connection.as_ref().map(|c| TokenBucket::new(c.max_burst, c.flow_rate));
        let request_bucket = config.request.as_ref().map(|c| TokenBucket::new(c.max_burst, c.flow_rate));
        Ok(Arc::new(Self { base: ComponentBase::new(), config, connection_bucket, request_bucket }))
    }
}

#[async_trait]
impl Component for TokenRateLimiter {
    fn class_stem(&self) -> &'static str {
        "rateLimiter"
    }

    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn as_service(self: Arc<Self>) -> Option<Arc<dyn Service>> {
        Some(self)
    }
}

impl Service for TokenRateLimiter {
    fn as_rate_limiter(self: Arc<Self>) -> Option<Arc<dyn RateLimiterService>> {
        Some(self)
    }
}

#[async_trait]
impl RateLimiterService for TokenRateLimiter {
    async fn new_connection(&self, _origin: SocketAddr) -> bool {
        let (Some(bucket), Some(cfg)) = (&self.connection_bucket, &self.config.connection) else {
            return true;
        };
        bucket.request_grant(1.0, cfg.grant_options()).await.is_ok()
    }

    async fn new_request(&self, _request: &WharfRequest) -> bool {
        let (Some(bucket), Some(cfg)) = (&self.request_bucket, &self.config.request) else {
            return true;
        };
        bucket.request_grant(1.0, cfg.grant_options()).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(connection: serde_json::Value) -> Arc<TokenRateLimiter> {
        TokenRateLimiter::new(
            &serde_json::from_value(serde_json::json!({"connection": connection})).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn no_configured_bucket_always_allows() {
        let config: TokenRateLimiterConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        let limiter = Arc::new(TokenRateLimiter { base: ComponentBase::new(), config, connection_bucket: None, request_bucket: None });
        assert!(limiter.new_connection("127.0.0.1:1".parse().unwrap()).await);
    }

    #[tokio::test]
    async fn exhausted_burst_with_zero_queue_rejects_immediately() {
        let limiter = limiter(serde_json::json!({
            "flowRate": 1.0, "maxBurst": 1.0, "maxQueueSize": 0,
        }));
        assert!(limiter.new_connection("127.0.0.1:1".parse().unwrap()).await);
        assert!(!limiter.new_connection("127.0.0.1:1".parse().unwrap()).await);
    }
}
