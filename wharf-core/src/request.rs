//! Request/Dispatch types and the request-id allocator.

use crate::error::WharfError;
use crate::path::PathKey;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};

/// The wire protocol a request arrived on, per `spec.md` §3 (`http-1.1`,
/// `http-2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http1,
    Http2,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http1 => "http-1.1",
            Protocol::Http2 => "http-2",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A boxed, type-erased HTTP body used across every Wharf crate so that
/// `wharf-endpoint`'s hyper/h2-backed bodies and `wharf-apps`' in-memory
/// bodies (static files, redirects, synthesized error pages) share one
/// handler-facing type.
pub type WharfBody = BoxBody<Bytes, WharfError>;

pub fn empty_body() -> WharfBody {
    Empty::new().map_err(|never| match never {}).boxed()
}

pub fn full_body(bytes: impl Into<Bytes>) -> WharfBody {
    Full::new(bytes.into()).map_err(|never| match never {}).boxed()
}

pub type WharfResponse = http::Response<WharfBody>;

/// An immutable view over a parsed HTTP request, per `spec.md` §3. HTTP/2's
/// `:method`/`:path`/`:scheme`/`:authority` pseudo-headers are not stored
/// separately — `http::Request`'s `method`/`uri` already carry that
/// information for both protocols; `authority()` below is the `:authority`
/// equivalent (falling back to the `Host` header on HTTP/1.1).
pub struct WharfRequest {
    pub id: String,
    pub endpoint_addr: SocketAddr,
    pub origin_addr: SocketAddr,
    pub protocol: Protocol,
    pub method: http::Method,
    pub uri: http::Uri,
    pub headers: http::HeaderMap,
    /// The request's hostname, parsed into a reversed-label `PathKey` for
    /// host-tree lookup (SNI / mount resolution).
    pub host: PathKey,
    pub body: Option<WharfBody>,
}

impl WharfRequest {
    /// The `:authority` pseudo-header's value, or the `Host` header for
    /// HTTP/1.1 requests that lack one.
    pub fn authority(&self) -> Option<String> {
        if let Some(auth) = self.uri.authority() {
            return Some(auth.as_str().to_string());
        }
        self.headers
            .get(http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }

    pub fn path_string(&self) -> String {
        self.uri.path().to_string()
    }

    /// Take the body, leaving `None` behind — a handler that doesn't read
    /// the body (the overwhelming majority: routers, redirects) never calls
    /// this, so later handlers in a chain still see it.
    pub fn take_body(&mut self) -> Option<WharfBody> {
        self.body.take()
    }
}

/// A mount-tree lookup split into the matched mount's key and the unmatched
/// suffix, handed to an `Application` so it can route on what's left.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub base: PathKey,
    pub extra: Vec<String>,
}

impl Dispatch {
    pub fn new(base: PathKey, extra: Vec<String>) -> Self {
        Self { base, extra }
    }

    pub fn extra_path(&self) -> String {
        if self.extra.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", self.extra.join("/"))
        }
    }
}

/// Allocates request ids in the `XX_MMMMM_NNNN` form per `spec.md` §6:
/// `XX` is two lowercase letters derived from the current minute and
/// within-minute sequence, `MMMMM` is five lowercase-hex digits of the
/// current minute (`floor(unix_seconds/60) mod 2^20`), and `NNNN` is the
/// within-minute sequence in lowercase hex, restarting at `0` on each new
/// minute. `tag_index` additionally salts `XX` so that ids allocated by
/// different endpoints/wranglers in the same minute remain distinguishable.
pub struct RequestIdAllocator {
    tag_index: u32,
    last_minute: AtomicU32,
    sequence: AtomicU32,
}

const LETTERS: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";

impl RequestIdAllocator {
    pub fn new(tag_index: u32) -> Self {
        Self {
            tag_index,
            last_minute: AtomicU32::new(u32::MAX),
            sequence: AtomicU32::new(0),
        }
    }

    fn current_minute() -> u32 {
        let secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        ((secs / 60) % (1u64 << 20)) as u32
    }

    /// Allocate the next id, resetting the sequence counter to `0` whenever
    /// the current minute differs from the last id allocated.
    pub fn next(&self) -> String {
        let minute = Self::current_minute();
        let seq = if self.last_minute.swap(minute, Ordering::AcqRel) == minute {
            self.sequence.fetch_add(1, Ordering::AcqRel) + 1
        } else {
            self.sequence.store(0, Ordering::Release);
            0
        };

        let a = LETTERS[((minute.wrapping_add(self.tag_index)) % 26) as usize];
        let b = LETTERS[((seq.wrapping_add(self.tag_index)) % 26) as usize];

        format!("{}{}_{:05x}_{:04x}", a as char, b as char, minute, seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_follow_the_xx_mmmmm_nnnn_shape() {
        let alloc = RequestIdAllocator::new(5);
        let id = alloc.next();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 2);
        assert_eq!(parts[1].len(), 5);
        assert_eq!(parts[2].len(), 4);
    }

    #[test]
    fn sequence_increments_within_the_same_second() {
        let alloc = RequestIdAllocator::new(0);
        let a = alloc.next();
        let b = alloc.next();
        assert_ne!(a, b);
        let seq_a: u32 = a.split('_').nth(2).unwrap().parse().unwrap();
        let seq_b: u32 = b.split('_').nth(2).unwrap().parse().unwrap();
        assert_eq!(seq_b, seq_a + 1);
    }

    #[test]
    fn dispatch_extra_path_renders_root_when_empty() {
        let d = Dispatch::new(PathKey::exact(vec!["a".into()]), Vec::new());
        assert_eq!(d.extra_path(), "/");
    }

    #[test]
    fn dispatch_extra_path_renders_remaining_components() {
        let d = Dispatch::new(PathKey::exact(vec!["a".into()]), vec!["b".into(), "c".into()]);
        assert_eq!(d.extra_path(), "/b/c");
    }

    fn sample_request(host_header: Option<&str>) -> WharfRequest {
        let mut headers = http::HeaderMap::new();
        if let Some(h) = host_header {
            headers.insert(http::header::HOST, h.parse().unwrap());
        }
        WharfRequest {
            id: "aa_00000_0000".into(),
            endpoint_addr: "127.0.0.1:8080".parse().unwrap(),
            origin_addr: "127.0.0.1:9000".parse().unwrap(),
            protocol: Protocol::Http1,
            method: http::Method::GET,
            uri: "/a/b".parse().unwrap(),
            headers,
            host: PathKey::parse_host(host_header.unwrap_or("example.com")),
            body: Some(full_body("hi")),
        }
    }

    #[test]
    fn authority_falls_back_to_host_header_when_uri_has_none() {
        let req = sample_request(Some("example.com"));
        assert_eq!(req.authority().as_deref(), Some("example.com"));
    }

    #[test]
    fn take_body_leaves_none_behind() {
        let mut req = sample_request(None);
        assert!(req.take_body().is_some());
        assert!(req.body.is_none());
    }
}
