//! Config loading: the `--config`/`--config-url`/etcd external
//! collaborators `spec.md` §6 names, plus the active-config cache a
//! `SIGHUP` reload swaps.

pub mod cache;
pub mod config_source;

#[cfg(feature = "etcd")]
pub mod etcd;

pub use cache::ConfigCache;
pub use config_source::ConfigSource;
