//! Shared data types for Wharf: path maps, the configuration schema,
//! request/dispatch plumbing, the token bucket, and the error taxonomy.
//!
//! Wire-level requests and responses are represented with the `http` crate's
//! `Request`/`Response` types directly (bodies as `bytes::Bytes` or a
//! streaming body alias) rather than a bespoke wrapper, matching the rest of
//! the Rust HTTP ecosystem.

pub mod config;
pub mod error;
pub mod path;
pub mod ratelimit;
pub mod request;

pub use error::{Result, WharfError};
pub use path::{FindResult, PathKey, PathMap, PathMapError};
pub use ratelimit::{Clock, Grant, GrantOptions, TokenBucket, TokioClock};
pub use request::{
    empty_body, full_body, Dispatch, Protocol, RequestIdAllocator, WharfBody, WharfRequest,
    WharfResponse,
};
