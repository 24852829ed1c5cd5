//! Request dispatch pipeline: `spec.md` §4.6's mount resolution plus the
//! "Failure semantics" it and §4.5's rate-limiting hook describe. This is
//! the single place a parsed `WharfRequest` becomes a `WharfResponse` —
//! every error kind this module surfaces is caught here, never allowed to
//! tear down the connection's protocol server task.

use std::sync::Arc;

use wharf_component::{Application, RateLimiterService, RequestLoggerService};
use wharf_core::{empty_body, full_body, RequestIdAllocator, Result, WharfError, WharfRequest, WharfResponse};

use crate::mounts::{HostAllowlist, MountTable};

/// Everything the pipeline needs to turn a request into a response, owned
/// by the `Endpoint` and handed to each connection's service closure.
pub struct Dispatcher {
    pub host_allowlist: HostAllowlist,
    pub mounts: MountTable,
    pub request_ids: RequestIdAllocator,
    pub rate_limiter: Option<Arc<dyn RateLimiterService>>,
    pub request_logger: Option<Arc<dyn RequestLoggerService>>,
}

impl Dispatcher {
    pub async fn dispatch(&self, mut request: WharfRequest) -> WharfResponse {
        request.id = self.request_ids.next();

        if let Some(logger) = &self.request_logger {
            logger.request_started(&request.id, &request).await;
        }

        let response = self.dispatch_inner(&mut request).await;
        let (response, status, error_codes) = match response {
            Ok(response) => {
                let status = response.status().as_u16();
                (response, status, Vec::new())
            }
            Err(e) => {
                let status = e.status_code();
                (error_response(status, &e.to_string()), status, vec![error_kind(&e)])
            }
        };

        if let Some(logger) = &self.request_logger {
            logger.request_ended(&request.id, Some(status), error_codes).await;
        }

        match &self.rate_limiter {
            Some(limiter) => {
                let (parts, body) = response.into_parts();
                http::Response::from_parts(parts, limiter.wrap_body(body))
            }
            None => response,
        }
    }

    async fn dispatch_inner(&self, request: &mut WharfRequest) -> Result<WharfResponse> {
        let authority = request.authority().unwrap_or_default();
        let host = authority.split(':').next().unwrap_or(&authority).to_string();

        if !self.host_allowlist.allows(&host) {
            return Err(WharfError::UnknownHost(host));
        }

        if let Some(limiter) = &self.rate_limiter {
            if !limiter.new_request(request).await {
                return Err(WharfError::RateLimitExceeded);
            }
        }

        let path = request.path_string();
        let Some((dispatch, app)) = self.mounts.dispatch(&host, &path) else {
            return Ok(error_response(404, "not found"));
        };

        match app.handle_request(request, &dispatch).await {
            Ok(Some(response)) => Ok(response),
            Ok(None) => Ok(error_response(404, "not found")),
            Err(e) => {
                tracing::warn!(request_id = %request.id, error = %e, "handler error");
                Err(e)
            }
        }
    }
}

fn error_response(status: u16, message: &str) -> WharfResponse {
    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(full_body(message.to_string()))
        .unwrap_or_else(|_| {
            let mut response = http::Response::new(empty_body());
            *response.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
            response
        })
}

fn error_kind(e: &WharfError) -> String {
    match e {
        WharfError::Configuration(_) => "Configuration",
        WharfError::NotFound(_) => "NotFound",
        WharfError::WrongClass { .. } => "WrongClass",
        WharfError::AlreadyBound(_) => "AlreadyBound",
        WharfError::AlreadyStarted(_) => "AlreadyStarted",
        WharfError::ClassMismatch { .. } => "ClassMismatch",
        WharfError::ProtocolError(_) => "ProtocolError",
        WharfError::UnknownHost(_) => "UnknownHost",
        WharfError::RateLimitExceeded => "RateLimitExceeded",
        WharfError::Timeout(_) => "Timeout",
        WharfError::StopTimeout(_) => "StopTimeout",
        WharfError::Transport(_) => "Transport",
        WharfError::Internal(_) => "Internal",
    }
    .to_string()
}
