//! The `Application` trait: a mounted request handler, per `spec.md` §4.6.

use async_trait::async_trait;

use crate::component::Component;
use wharf_core::{Dispatch, Result, WharfRequest, WharfResponse};

/// A mounted request handler. `handle_request` returns one of three things,
/// per `spec.md` §4.6:
///
/// - `Ok(Some(response))` — handled; the endpoint sends it.
/// - `Ok(None)` — "not handled, try next"; only meaningful inside a
///   chaining context (`SerialRouter`); the top-level dispatcher turns a
///   top-level `None` into a 404.
/// - `Err(_)` — a handler throw; the dispatcher logs `handlerError` and
///   attempts a generic 500 (or closes the connection if bytes were already
///   sent).
#[async_trait]
pub trait Application: Component {
    async fn handle_request(
        &self,
        request: &mut WharfRequest,
        dispatch: &Dispatch,
    ) -> Result<Option<WharfResponse>>;
}
