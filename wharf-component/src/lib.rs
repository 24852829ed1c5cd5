//! The component lifecycle and hierarchy: `spec.md` §4.3's
//! init/start/stop/reload state machine, the `ControlContext` hierarchical
//! name index, and the `Application`/`Service` traits applications and
//! ancillary workers implement.

pub mod app;
pub mod component;
pub mod context;
pub mod lifecycle;
pub mod logger;
pub mod naming;
pub mod registry;
pub mod service;

pub use app::Application;
pub use component::{wrong_class, Component, ComponentBase, ComponentState};
pub use context::ControlContext;
pub use lifecycle::{init_and_start_root, init_child, init_root, init_tree, start_tree, stop_tree};
pub use logger::{Logger, NoopLogger};
pub use registry::{check_class_match, ComponentFactory, ComponentRegistry};
pub use service::{RateLimiterService, RequestLoggerService, Service};

pub use wharf_core::{
    empty_body, full_body, Dispatch, Protocol, Result, WharfBody, WharfError, WharfRequest,
    WharfResponse,
};
