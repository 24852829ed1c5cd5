//! `Service`: an ancillary worker (rate limiter, request logger) attached to
//! one or more endpoints, plus the two external-collaborator contracts
//! `spec.md` §4.5/§4.6 name explicitly — `RateLimiterService` and
//! `RequestLoggerService`.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::component::Component;
use wharf_core::WharfRequest;

/// Marker supertrait for ancillary workers. `as_rate_limiter`/
/// `as_request_logger` mirror `Component::as_application` — a
/// downcast-by-coercion hook rather than an `Any`-based registry, letting
/// `EndpointManager` resolve a configured service name to the specific
/// capability it needs without knowing the concrete type.
pub trait Service: Component {
    fn as_rate_limiter(self: Arc<Self>) -> Option<Arc<dyn RateLimiterService>> {
        None
    }

    fn as_request_logger(self: Arc<Self>) -> Option<Arc<dyn RequestLoggerService>> {
        None
    }
}

/// A connection/request/byte rate limiter attached to an endpoint, per
/// `spec.md` §4.5. Per Design Notes' open question, `new_connection` and
/// `new_request` are independent limiters unless a concrete implementation
/// explicitly fuses them — this trait does not assume either way.
#[async_trait]
pub trait RateLimiterService: Service {
    /// Called once per accepted connection, before handoff to the protocol
    /// server. `false` ⇒ reject (the endpoint closes the connection).
    async fn new_connection(&self, origin: SocketAddr) -> bool;

    /// Called once per request after headers are parsed. `false` ⇒ reject
    /// (429 or 503, at the endpoint's configuration discretion).
    async fn new_request(&self, request: &WharfRequest) -> bool;

    /// Wrap an outgoing response body so its bytes flow through a byte-rate
    /// token bucket. The default passes the body through unmodified; a
    /// byte-rate-limiting implementation overrides this.
    fn wrap_body(&self, body: wharf_core::WharfBody) -> wharf_core::WharfBody {
        body
    }
}

/// The request-logger external collaborator from `spec.md` §4 "Rate /
/// request logger service interfaces": `request_started` is always
/// delivered before the matching `request_ended`, and `request_ended` fires
/// exactly once per request even on connection abort (`spec.md` §5).
#[async_trait]
pub trait RequestLoggerService: Service {
    async fn request_started(&self, request_id: &str, request: &WharfRequest);

    async fn request_ended(&self, request_id: &str, status: Option<u16>, error_codes: Vec<String>);
}
