//! `StaticFileApp`: the minimal, explicitly-partial reference
//! implementation of the "static-file application" `spec.md` calls
//! out-of-scope for *internals* — just enough to exercise §8 scenario 1 (a
//! self-signed HTTP/2 conditional GET) and the conditional-request contract
//! from §6 ("`If-None-Match`/`If-Modified-Since` must produce 304 with only
//! `etag, cache-control, date, accept-ranges` headers retained"). Range
//! requests, directory listings, and compression are out of scope.

use std::path::{Component as PathComponent, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use serde::Deserialize;

use wharf_component::{Application, Component, ComponentBase};
use wharf_core::{empty_body, full_body, Dispatch, Result, WharfError, WharfRequest, WharfResponse};

#[derive(Debug, Clone, Deserialize)]
struct StaticFileConfig {
    root: String,
    #[serde(default)]
    index: Option<String>,
}

pub struct StaticFileApp {
    base: ComponentBase,
    root: PathBuf,
    index: String,
}

impl StaticFileApp {
    pub fn new(params: &serde_json::Map<String, serde_json::Value>) -> Result<Arc<Self>> {
        let config: StaticFileConfig = serde_json::from_value(serde_json::Value::Object(params.clone()))?;
        Ok(Arc::new(Self {
            base: ComponentBase::new(),
            root: PathBuf::from(config.root),
            index: config.index.unwrap_or_else(|| "index.html".to_string()),
        }))
    }

    /// Resolve `dispatch.extra` against `root`, rejecting any `..` component
    /// so a request cannot escape the configured directory.
    fn resolve(&self, dispatch: &Dispatch) -> Option<PathBuf> {
        let mut path = self.root.clone();
        for segment in &dispatch.extra {
            match Path::new(segment).components().next() {
                Some(PathComponent::Normal(_)) => path.push(segment),
                _ => return None,
            }
        }
        if dispatch.extra.is_empty() || dispatch.extra.last().map(|s| s.is_empty()).unwrap_or(true) {
            path.push(&self.index);
        }
        Some(path)
    }

    fn weak_etag(len: u64, mtime: SystemTime) -> String {
        let secs = mtime.duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default().as_secs();
        format!("W/\"{len:x}-{secs:x}\"")
    }

    fn http_date(t: SystemTime) -> String {
        httpdate::fmt_http_date(t)
    }
}

#[async_trait]
impl Component for StaticFileApp {
    fn class_stem(&self) -> &'static str {
        "staticFile"
    }

    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn as_application(self: Arc<Self>) -> Option<Arc<dyn Application>> {
        Some(self)
    }
}

#[async_trait]
impl Application for StaticFileApp {
    async fn handle_request(
        &self,
        request: &mut WharfRequest,
        dispatch: &Dispatch,
    ) -> Result<Option<WharfResponse>> {
        if !matches!(request.method, http::Method::GET | http::Method::HEAD) {
            return Ok(None);
        }

        let Some(path) = self.resolve(dispatch) else {
            return not_found();
        };

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return not_found(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return not_found(),
            Err(e) => return Err(WharfError::Transport(e.to_string())),
        };

        let mtime = metadata.modified().map_err(|e| WharfError::Transport(e.to_string()))?;
        let etag = Self::weak_etag(metadata.len(), mtime);
        let last_modified = Self::http_date(mtime);

        if request_not_modified(request, &etag, mtime) {
            return Ok(Some(not_modified_response(&etag)));
        }

        let bytes = tokio::fs::read(&path).await.map_err(|e| WharfError::Transport(e.to_string()))?;
        let body = if request.method == http::Method::HEAD { empty_body() } else { full_body(bytes) };

        let response = http::Response::builder()
            .status(200)
            .header(http::header::ETAG, etag)
            .header(http::header::LAST_MODIFIED, last_modified)
            .header(http::header::CACHE_CONTROL, "no-cache")
            .header(http::header::ACCEPT_RANGES, "none")
            .body(body)
            .map_err(|e| WharfError::Internal(format!("failed to build static file response: {e}")))?;
        Ok(Some(response))
    }
}

/// `spec.md` §6's conditional-request contract: an `If-None-Match` list
/// (comma-separated, each possibly quoted) containing the resource's etag,
/// or an `If-Modified-Since` at or after the resource's mtime, both yield
/// "not modified" — `If-None-Match` takes precedence when both are present.
fn request_not_modified(request: &WharfRequest, etag: &str, mtime: SystemTime) -> bool {
    if let Some(header) = request.headers.get(http::header::IF_NONE_MATCH).and_then(|v| v.to_str().ok()) {
        return header.split(',').map(str::trim).any(|candidate| candidate == etag || candidate == "*");
    }
    if let Some(header) = request.headers.get(http::header::IF_MODIFIED_SINCE).and_then(|v| v.to_str().ok()) {
        if let Ok(since) = httpdate::parse_http_date(header) {
            return mtime <= since;
        }
    }
    false
}

/// `spec.md` §6: a 304 retains only `etag, cache-control, date, accept-ranges`
/// — `last-modified` (present on the 200 this responds to) is dropped.
fn not_modified_response(etag: &str) -> WharfResponse {
    http::Response::builder()
        .status(304)
        .header(http::header::ETAG, etag)
        .header(http::header::CACHE_CONTROL, "no-cache")
        .header(http::header::DATE, StaticFileApp::http_date(SystemTime::now()))
        .header(http::header::ACCEPT_RANGES, "none")
        .body(empty_body())
        .unwrap_or_else(|_| http::Response::new(empty_body()))
}

fn not_found() -> Result<Option<WharfResponse>> {
    Ok(None)
}
