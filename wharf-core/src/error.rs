//! The error taxonomy shared by every Wharf crate.

use thiserror::Error;

/// Every failure mode surfaced by the component framework, the dispatch
/// pipeline, and the ambient collaborators (config, TLS, rate limiting).
#[derive(Debug, Error)]
pub enum WharfError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("component not found: {0}")]
    NotFound(String),

    #[error("component '{name}' is not of the expected class: expected {expected}, found {found}")]
    WrongClass {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("'{0}' is already bound")]
    AlreadyBound(String),

    #[error("component '{0}' is already started")]
    AlreadyStarted(String),

    #[error("'{expected}' and '{found}' are different classes of component")]
    ClassMismatch { expected: String, found: String },

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("unknown host: {0}")]
    UnknownHost(String),

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("component '{0}' did not stop within its grace period")]
    StopTimeout(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl WharfError {
    /// The HTTP status code a `WharfError` surfaced at the dispatch boundary
    /// should produce, mirroring the teacher's `AndoError::status_code`.
    pub fn status_code(&self) -> u16 {
        match self {
            WharfError::NotFound(_) => 404,
            WharfError::RateLimitExceeded => 429,
            WharfError::Timeout(_) => 504,
            WharfError::ProtocolError(_) | WharfError::UnknownHost(_) => 400,
            WharfError::Configuration(_)
            | WharfError::WrongClass { .. }
            | WharfError::AlreadyBound(_)
            | WharfError::AlreadyStarted(_)
            | WharfError::ClassMismatch { .. }
            | WharfError::StopTimeout(_)
            | WharfError::Transport(_)
            | WharfError::Internal(_) => 500,
        }
    }
}

impl From<std::io::Error> for WharfError {
    fn from(e: std::io::Error) -> Self {
        WharfError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for WharfError {
    fn from(e: serde_json::Error) -> Self {
        WharfError::Configuration(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WharfError>;
