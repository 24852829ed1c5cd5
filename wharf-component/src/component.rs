//! The `Component` trait: every Wharf node (hosts, services, applications,
//! endpoints, the Warehouse itself) implements it. State transitions are
//! driven only by `lifecycle::{init_tree, start_tree, stop_tree}` — never by
//! the component's own code — per `spec.md` §4.3.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::app::Application;
use crate::context::ControlContext;
use crate::service::Service;
use wharf_core::{Result, WharfError};

/// `NEW -> INITIALIZED -> STARTED -> STOPPED`, per `spec.md` §3. A reload is
/// a stop-then-start that revisits `STARTED` with `is_reload = true` passed
/// to `impl_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ComponentState {
    New = 0,
    Initialized = 1,
    Started = 2,
    Stopped = 3,
}

impl ComponentState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ComponentState::New,
            1 => ComponentState::Initialized,
            2 => ComponentState::Started,
            _ => ComponentState::Stopped,
        }
    }
}

/// Lifecycle state storage embedded in every concrete component. Mirrors the
/// source's base class fields (`ControlContext`, state enum) that the
/// framework — not user code — mutates.
pub struct ComponentBase {
    state: AtomicU8,
    context: std::sync::OnceLock<Arc<ControlContext>>,
}

impl Default for ComponentBase {
    fn default() -> Self {
        Self { state: AtomicU8::new(ComponentState::New as u8), context: std::sync::OnceLock::new() }
    }
}

impl ComponentBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ComponentState {
        ComponentState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, s: ComponentState) {
        self.state.store(s as u8, Ordering::Release);
    }

    pub fn context(&self) -> Arc<ControlContext> {
        self.context
            .get()
            .cloned()
            .expect("ComponentBase::context() called before init")
    }

    pub(crate) fn set_context(&self, ctx: Arc<ControlContext>) {
        // `init` runs exactly once per lifecycle per spec's monotonicity
        // invariant; a second call is a framework bug, not a user error.
        self.context.set(ctx).ok();
    }
}

/// Every node in the component hierarchy. `class_stem()` names the
/// auto-naming stem (`spec.md` §4.3, "anonymous children are auto-numbered
/// using the class's preferred name stem"); `base()` exposes the lifecycle
/// state the framework drives; `children()` lists this component's current
/// children (empty for leaves); the `impl_*` hooks are the user-overridable
/// lifecycle callbacks, matching the source's `_impl_init`/`_impl_start`/
/// `_impl_stop` naming.
#[async_trait]
pub trait Component: Send + Sync {
    fn class_stem(&self) -> &'static str;

    fn base(&self) -> &ComponentBase;

    fn children(&self) -> Vec<Arc<dyn Component>> {
        Vec::new()
    }

    async fn impl_init(&self, _ctx: &Arc<ControlContext>) -> Result<()> {
        Ok(())
    }

    async fn impl_start(&self, _is_reload: bool) -> Result<()> {
        Ok(())
    }

    async fn impl_stop(&self, _will_reload: bool) -> Result<()> {
        Ok(())
    }

    /// Downcast hook for the `getComponent(namePath, requiredClass)`
    /// contract (`spec.md` §4.3): overridden by `Application`/`Service`
    /// impls to hand back a typed handle without a general `Any`-based
    /// registry. `self: Arc<Self>` is object-safe because `Self` appears
    /// only in the receiver position.
    fn as_application(self: Arc<Self>) -> Option<Arc<dyn Application>> {
        None
    }

    fn as_service(self: Arc<Self>) -> Option<Arc<dyn Service>> {
        None
    }

    fn state(&self) -> ComponentState {
        self.base().state()
    }

    fn context(&self) -> Arc<ControlContext> {
        self.base().context()
    }
}

/// `context.getComponent(namePath, requiredClass?)` — `fails with WrongClass`
/// surfaced as a typed `WharfError`.
pub fn wrong_class(name: &str, expected: &'static str) -> WharfError {
    WharfError::WrongClass { name: name.to_string(), expected, found: "component" }
}
