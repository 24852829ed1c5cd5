//! Converts a parsed `hyper::Request<Incoming>` into a `WharfRequest`, per
//! `spec.md` §4.6's "A Request is built from the parsed low-level request,
//! its connection context, and an allocated request id" (the id itself is
//! assigned later, by the `Dispatcher`).

use std::net::SocketAddr;

use http_body_util::BodyExt;

use wharf_core::{PathKey, Protocol, WharfError, WharfRequest};

pub fn into_wharf_request(
    req: http::Request<hyper::body::Incoming>,
    endpoint_addr: SocketAddr,
    origin_addr: SocketAddr,
) -> WharfRequest {
    let protocol = match req.version() {
        http::Version::HTTP_2 => Protocol::Http2,
        _ => Protocol::Http1,
    };

    let (parts, body) = req.into_parts();

    let host = parts
        .uri
        .host()
        .map(|h| h.to_string())
        .or_else(|| {
            parts
                .headers
                .get(http::header::HOST)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.split(':').next().unwrap_or(s).to_string())
        })
        .unwrap_or_default();

    WharfRequest {
        id: String::new(),
        endpoint_addr,
        origin_addr,
        protocol,
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        host: PathKey::parse_host(&host),
        body: Some(body.map_err(|e| WharfError::Transport(e.to_string())).boxed()),
    }
}
