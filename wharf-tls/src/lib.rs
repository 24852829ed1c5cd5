//! The hostname tree map and TLS context resolver: `spec.md` §4.4's Host
//! Manager, plus the self-sign external collaborator it delegates to.

pub mod host_item;
pub mod host_manager;
pub mod self_sign;

pub use host_item::{CertSource, HostItem};
pub use host_manager::{HostEntryConfig, HostManager};
pub use self_sign::{RcgenIssuer, SelfSignIssuer};
