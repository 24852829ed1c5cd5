//! The endpoint's mount table: `spec.md` §4.6's hostname-then-path
//! `PathMap<Application>`, plus the coarse `hostnames` allowlist §4.5 checks
//! before dispatch is attempted at all.
//!
//! Built as two nested `PathMap`s (host, then path) rather than one flat map
//! over concatenated host+path components: a host pattern's own wildcard
//! flag only has meaning while matching host labels, and collapses
//! incorrectly once path components are appended to the same component list
//! (a `*.b.test` mount joined with a path suffix stops matching any host
//! past the registered depth). Resolving the host first, the way
//! `wharf-tls`'s `HostManager` already does, keeps each `PathMap`'s wildcard
//! semantics meaningful on its own axis. Recorded in `DESIGN.md`.

use std::collections::HashMap;
use std::sync::Arc;

use wharf_component::Application;
use wharf_core::{Dispatch, PathKey, PathMap, Result, WharfError};

/// One `mounts[]` entry: `at = "//<host-pattern>/<path…>/"` parsed into its
/// host and path components, bound to a live application.
pub struct MountEntry {
    pub host: PathKey,
    pub path: PathKey,
    pub application: Arc<dyn Application>,
}

/// Parse a mount's `at` string (`//<host-pattern>/<path…>/`) into its host
/// and path `PathKey`s, per `spec.md` §6.
pub fn parse_at(at: &str) -> Result<(PathKey, PathKey)> {
    let rest = at
        .strip_prefix("//")
        .ok_or_else(|| WharfError::Configuration(format!("mount 'at' must start with '//': {at}")))?;
    let (host_part, path_part) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, "/"),
    };
    if host_part.is_empty() {
        return Err(WharfError::Configuration(format!("mount 'at' is missing a host pattern: {at}")));
    }
    Ok((PathKey::parse_host(host_part), PathKey::parse_path(path_part)))
}

/// The coarse hostname allowlist from `spec.md` §4.5: "a client-supplied
/// hostname is matched against the endpoint's hostnames PathMap; no match
/// fails with UnknownHost (400)" — distinct from mount/path matching, which
/// 404s on a miss instead.
pub struct HostAllowlist {
    hosts: PathMap<()>,
}

impl HostAllowlist {
    pub fn build(hostnames: &[String]) -> Result<Self> {
        let mut hosts = PathMap::new();
        for hostname in hostnames {
            hosts
                .add(PathKey::parse_host(hostname), ())
                .map_err(|_| WharfError::AlreadyBound(hostname.clone()))?;
        }
        Ok(Self { hosts })
    }

    pub fn allows(&self, host: &str) -> bool {
        self.hosts.find(&PathKey::parse_host(host)).is_some()
    }
}

/// The hostname-then-path mount table. Immutable after `start`, matching
/// `spec.md` §5's "each endpoint's mount PathMap are immutable after
/// `start`; readers need no locks".
pub struct MountTable {
    by_host: PathMap<PathMap<Arc<dyn Application>>>,
}

impl MountTable {
    pub fn build(entries: Vec<MountEntry>) -> Result<Self> {
        let mut grouped: HashMap<PathKey, PathMap<Arc<dyn Application>>> = HashMap::new();
        for entry in entries {
            let bucket = grouped.entry(entry.host.clone()).or_insert_with(PathMap::new);
            bucket
                .add(entry.path.clone(), entry.application)
                .map_err(|_| WharfError::AlreadyBound(format!("mount already bound at {:?}", entry.path)))?;
        }

        let mut by_host = PathMap::new();
        for (host, bucket) in grouped {
            by_host
                .add(host.clone(), bucket)
                .map_err(|_| WharfError::AlreadyBound(format!("duplicate host mount {:?}", host)))?;
        }
        Ok(Self { by_host })
    }

    /// Resolve `(host, path)` to its matching application and `Dispatch`, per
    /// `spec.md` §4.6 steps 1-2. Returns `None` if no application is mounted
    /// under this host at all, or under the requested path within it — the
    /// dispatcher materializes either as 404 once the coarse `UnknownHost`
    /// check (via `HostAllowlist`) has already passed.
    pub fn dispatch(&self, host: &str, path: &str) -> Option<(Dispatch, Arc<dyn Application>)> {
        let host_match = self.by_host.find(&PathKey::parse_host(host))?;
        let path_match = host_match.value.find(&PathKey::parse_path(path))?;
        let dispatch = Dispatch::new(path_match.key, path_match.extra);
        Some((dispatch, path_match.value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use wharf_component::{Component, ComponentBase};
    use wharf_core::{Result as WResult, WharfRequest, WharfResponse};

    struct Stub(ComponentBase, &'static str);

    #[async_trait]
    impl Component for Stub {
        fn class_stem(&self) -> &'static str {
            "stub"
        }
        fn base(&self) -> &ComponentBase {
            &self.0
        }
    }

    #[async_trait]
    impl Application for Stub {
        async fn handle_request(
            &self,
            _request: &mut WharfRequest,
            _dispatch: &Dispatch,
        ) -> WResult<Option<WharfResponse>> {
            Ok(None)
        }
    }

    fn stub(name: &'static str) -> Arc<dyn Application> {
        Arc::new(Stub(ComponentBase::new(), name))
    }

    #[test]
    fn parses_at_into_host_and_path_keys() {
        let (host, path) = parse_at("//*.b.test/old/").unwrap();
        assert_eq!(host.components(), &["test", "b"]);
        assert!(host.is_wildcard());
        assert_eq!(path.components(), &["old"]);
        assert!(path.is_wildcard());
    }

    #[test]
    fn dispatch_base_plus_extra_reconstructs_the_request_path() {
        let table = MountTable::build(vec![MountEntry {
            host: PathKey::universal(),
            path: PathKey::parse_path("/old/"),
            application: stub("redirector"),
        }])
        .unwrap();

        let (dispatch, _app) = table.dispatch("localhost", "/old/a/b").unwrap();
        let base = dispatch.base.to_path_string();
        let extra = if dispatch.extra.is_empty() {
            String::new()
        } else {
            format!("/{}", dispatch.extra.join("/"))
        };
        assert_eq!(format!("{base}{extra}"), "/old/a/b");
    }

    #[test]
    fn subdomain_wildcard_host_matches_any_depth_below_it() {
        let table = MountTable::build(vec![MountEntry {
            host: PathKey::parse_host("*.b.test"),
            path: PathKey::universal(),
            application: stub("b"),
        }])
        .unwrap();
        assert!(table.dispatch("x.b.test", "/").is_some());
        assert!(table.dispatch("y.z.b.test", "/").is_some());
        assert!(table.dispatch("b.test", "/").is_none());
    }

    #[test]
    fn host_allowlist_rejects_unconfigured_hosts() {
        let allow = HostAllowlist::build(&["a.test".to_string(), "*.b.test".to_string()]).unwrap();
        assert!(allow.allows("a.test"));
        assert!(allow.allows("x.b.test"));
        assert!(!allow.allows("c.test"));
    }
}
