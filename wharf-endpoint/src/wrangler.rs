//! The wrangler: `spec.md` §4.5's TCP accept loop, TLS handshake, and
//! HTTP/1-or-2 protocol negotiation. Grounded on
//! `jizhuozhi-hermes/gateway/src/server/mod.rs::run_proxy_server`'s
//! `TcpListener` + `hyper_util::server::conn::auto::Builder` pattern.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::connections::ConnectionTracker;
use crate::pipeline::Dispatcher;
use crate::request::into_wharf_request;

/// Which protocol(s) the endpoint's `auto::Builder` negotiates, mirroring
/// `spec.md` §4.5's `protocol ∈ {http, http2, https}`: plaintext `http` is
/// HTTP/1.1 only; plaintext `http2` is h2c only; `https` negotiates either
/// over TLS via ALPN.
#[derive(Debug, Clone, Copy)]
pub enum ProtocolMode {
    Http1Only,
    Http2Only,
    Auto,
}

fn builder_for(mode: ProtocolMode) -> auto::Builder<TokioExecutor> {
    let mut builder = auto::Builder::new(TokioExecutor::new());
    match mode {
        ProtocolMode::Http1Only => {
            builder.http1().keep_alive(true);
        }
        ProtocolMode::Http2Only => {
            builder.http2().keep_alive_interval(Some(Duration::from_secs(20)));
        }
        ProtocolMode::Auto => {
            builder.http1().keep_alive(true);
            builder.http2().keep_alive_interval(Some(Duration::from_secs(20)));
        }
    }
    builder
}

/// Runs the accept loop until `shutdown` fires. Each accepted connection is
/// handed its own task; `tracker` records it so `Endpoint::impl_stop` can
/// drain (or force-close) them later.
pub async fn accept_loop(
    listener: TcpListener,
    tls_acceptor: Option<tokio_rustls::TlsAcceptor>,
    mode: ProtocolMode,
    dispatcher: Arc<Dispatcher>,
    tracker: Arc<ConnectionTracker>,
    endpoint_addr: SocketAddr,
) {
    let mut shutdown = tracker.stopping_receiver();
    loop {
        let accepted = tokio::select! {
            result = listener.accept() => result,
            _ = shutdown.changed() => break,
        };

        let (stream, origin_addr) = match accepted {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(endpoint = %endpoint_addr, error = %e, "accept failed");
                continue;
            }
        };

        // A connection arriving once we're already stopping is closed
        // immediately, per `spec.md` §4.5's connection bookkeeping.
        if tracker.is_stopping() {
            drop(stream);
            continue;
        }

        if let Some(limiter) = &dispatcher.rate_limiter {
            if !limiter.new_connection(origin_addr).await {
                drop(stream);
                continue;
            }
        }

        let dispatcher = dispatcher.clone();
        let tls_acceptor = tls_acceptor.clone();
        let stopping = tracker.stopping_receiver();

        let handle = tokio::spawn(async move {
            if let Some(acceptor) = tls_acceptor {
                match acceptor.accept(stream).await {
                    Ok(tls_stream) => {
                        serve_connection(tls_stream, mode, dispatcher, endpoint_addr, origin_addr, stopping)
                            .await
                    }
                    Err(e) => {
                        tracing::debug!(origin = %origin_addr, error = %e, "TLS handshake failed");
                    }
                }
            } else {
                serve_connection(stream, mode, dispatcher, endpoint_addr, origin_addr, stopping).await
            }
        });

        tracker.register(handle);
    }
}

async fn serve_connection<S>(
    stream: S,
    mode: ProtocolMode,
    dispatcher: Arc<Dispatcher>,
    endpoint_addr: SocketAddr,
    origin_addr: SocketAddr,
    mut stopping: watch::Receiver<bool>,
) where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let io = TokioIo::new(stream);
    let svc = service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
        let dispatcher = dispatcher.clone();
        async move {
            let request = into_wharf_request(req, endpoint_addr, origin_addr);
            let response = dispatcher.dispatch(request).await;
            Ok::<_, std::convert::Infallible>(response)
        }
    });

    let builder = builder_for(mode);
    let conn = builder.serve_connection_with_upgrades(io, svc);
    let mut conn = Box::pin(conn);

    loop {
        tokio::select! {
            res = conn.as_mut() => {
                if let Err(e) = res {
                    if !e.is_incomplete_message() {
                        tracing::debug!(origin = %origin_addr, error = %e, "connection error");
                    }
                }
                break;
            }
            changed = stopping.changed() => {
                if changed.is_ok() && *stopping.borrow() {
                    conn.as_mut().graceful_shutdown();
                }
                // keep polling the connection to completion either way
            }
        }
    }
}
