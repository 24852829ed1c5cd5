//! The endpoint/wrangler crate: `spec.md` §4.5's per-listener component
//! (hostname allowlist, mount table, TLS handoff, HTTP/1-or-2 protocol
//! negotiation, connection bookkeeping) and §4.6's request dispatch
//! pipeline.

pub mod connections;
pub mod endpoint;
pub mod mounts;
pub mod pipeline;
pub mod request;
pub mod wrangler;

pub use connections::ConnectionTracker;
pub use endpoint::{Endpoint, EndpointConfig, MountConfig, ServicesConfig};
pub use mounts::{parse_at, HostAllowlist, MountEntry, MountTable};
pub use pipeline::Dispatcher;
pub use request::into_wharf_request;
pub use wrangler::{accept_loop, ProtocolMode};
