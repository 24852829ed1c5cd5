//! `PathKey` / `PathMap` — an ordered, wildcard-aware trie keyed by path
//! components. Used both for hostname routing (reversed DNS labels, TLD
//! first) and for URL-path routing (forward components).

use std::collections::BTreeMap;
use thiserror::Error;

/// An ordered sequence of path components plus a wildcard flag.
///
/// `wildcard = true` means "this prefix and anything below"; `wildcard =
/// false` means an exact match only. The empty path with `wildcard = true`
/// is the universal key (matches everything).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathKey {
    components: Vec<String>,
    wildcard: bool,
}

impl PathKey {
    pub fn new(components: Vec<String>, wildcard: bool) -> Self {
        Self { components, wildcard }
    }

    pub fn exact(components: Vec<String>) -> Self {
        Self::new(components, false)
    }

    pub fn wildcard(components: Vec<String>) -> Self {
        Self::new(components, true)
    }

    /// The universal wildcard key (`*`): matches any path.
    pub fn universal() -> Self {
        Self::new(Vec::new(), true)
    }

    /// Parse a `/`-separated URL path into a forward-ordered PathKey.
    /// A trailing empty component after a trailing `/` is dropped; a
    /// trailing `*` component marks the key as wildcard.
    pub fn parse_path(path: &str) -> Self {
        let trimmed = path.trim_start_matches('/');
        if trimmed.is_empty() {
            return Self::wildcard(Vec::new());
        }
        let mut parts: Vec<String> = trimmed
            .trim_end_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        let wildcard = match parts.last().map(|s| s.as_str()) {
            Some("*") => {
                parts.pop();
                true
            }
            // A path ending in `/` (and thus no trailing literal component
            // distinct from its parent) designates a wildcard prefix mount.
            _ => path.ends_with('/'),
        };
        Self::new(parts, wildcard)
    }

    /// Parse a hostname into a reversed-label PathKey (TLD first), so that
    /// `*.example.com` becomes components `["com", "example"]` wildcard, and
    /// `www.example.com` becomes `["com", "example", "www"]` exact.
    pub fn parse_host(host: &str) -> Self {
        let host = host.split(':').next().unwrap_or(host);
        if host == "*" || host.is_empty() {
            return Self::universal();
        }
        let mut labels: Vec<&str> = host.split('.').collect();
        let wildcard = if labels.first() == Some(&"*") {
            labels.remove(0);
            true
        } else {
            false
        };
        let components: Vec<String> = labels.iter().rev().map(|s| s.to_lowercase()).collect();
        Self::new(components, wildcard)
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Render back to a `/`-prefixed path string.
    pub fn to_path_string(&self) -> String {
        if self.components.is_empty() {
            return "/".to_string();
        }
        format!("/{}", self.components.join("/"))
    }

    /// Concatenate this key's components with `other`'s, producing a single
    /// key whose wildcard flag is `other`'s (used to build mount keys:
    /// `<hostname-key><path-key>`).
    pub fn join(&self, other: &PathKey) -> PathKey {
        let mut components = self.components.clone();
        components.extend(other.components.iter().cloned());
        PathKey::new(components, other.wildcard)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathMapError {
    #[error("key already bound")]
    AlreadyBound,
}

/// The result of a successful `find`: the matched key, its value, and the
/// unmatched suffix of the target (`extra`).
pub struct FindResult<'a, V> {
    pub key: PathKey,
    pub value: &'a V,
    pub extra: Vec<String>,
}

#[derive(Default)]
struct Node<V> {
    exact: Option<V>,
    wildcard: Option<V>,
    children: BTreeMap<String, Node<V>>,
}

impl<V> Node<V> {
    fn new() -> Self {
        Self { exact: None, wildcard: None, children: BTreeMap::new() }
    }
}

/// Maps `PathKey -> V` with best-match (longest-prefix, exact-beats-wildcard)
/// lookup, plus exact-only lookup. Iteration order is deterministic
/// (component-lexicographic), guaranteed by the `BTreeMap` backing each node.
pub struct PathMap<V> {
    root: Node<V>,
    len: usize,
}

impl<V> PathMap<V> {
    pub fn new() -> Self {
        Self { root: Node::new(), len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert `value` under `key`. Fails if an identical `(components,
    /// wildcard)` pair is already bound.
    pub fn add(&mut self, key: PathKey, value: V) -> Result<(), PathMapError> {
        let mut node = &mut self.root;
        for comp in &key.components {
            node = node.children.entry(comp.clone()).or_insert_with(Node::new);
        }
        if key.wildcard {
            if node.wildcard.is_some() {
                return Err(PathMapError::AlreadyBound);
            }
            node.wildcard = Some(value);
        } else {
            if node.exact.is_some() {
                return Err(PathMapError::AlreadyBound);
            }
            node.exact = Some(value);
        }
        self.len += 1;
        Ok(())
    }

    /// Exact match only: same components, `wildcard=false` binding.
    pub fn find_exact(&self, target: &PathKey) -> Option<&V> {
        if target.wildcard {
            return None;
        }
        let mut node = &self.root;
        for comp in &target.components {
            node = node.children.get(comp)?;
        }
        node.exact.as_ref()
    }

    /// Best match per spec §4.1: walk the target's components; an exact
    /// terminal match (non-wildcard target with nothing remaining) wins
    /// outright; otherwise the deepest ancestor holding a wildcard value
    /// wins, with `extra` set to the unmatched suffix.
    pub fn find(&self, target: &PathKey) -> Option<FindResult<'_, V>> {
        let mut node = &self.root;
        let mut best: Option<(usize, &V)> = None;
        if let Some(v) = node.wildcard.as_ref() {
            best = Some((0, v));
        }

        let mut depth = 0usize;
        for comp in &target.components {
            match node.children.get(comp) {
                Some(child) => {
                    node = child;
                    depth += 1;
                    if let Some(v) = node.wildcard.as_ref() {
                        best = Some((depth, v));
                    }
                }
                None => {
                    // No further exact path; fall back to deepest wildcard found.
                    return best.map(|(d, v)| FindResult {
                        key: PathKey::wildcard(target.components[..d].to_vec()),
                        value: v,
                        extra: target.components[d..].to_vec(),
                    });
                }
            }
        }

        // Walked the full target. An exact (non-wildcard target) match at
        // the terminal node always beats any wildcard.
        if !target.wildcard {
            if let Some(v) = node.exact.as_ref() {
                return Some(FindResult {
                    key: PathKey::exact(target.components.clone()),
                    value: v,
                    extra: Vec::new(),
                });
            }
        }

        best.map(|(d, v)| FindResult {
            key: PathKey::wildcard(target.components[..d].to_vec()),
            value: v,
            extra: target.components[d..].to_vec(),
        })
    }

    /// Deterministic, component-lexicographic iteration over all bound
    /// `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (PathKey, &V)> {
        let mut out = Vec::new();
        Self::collect(&self.root, &mut Vec::new(), &mut out);
        out.into_iter()
    }

    fn collect<'a>(node: &'a Node<V>, prefix: &mut Vec<String>, out: &mut Vec<(PathKey, &'a V)>) {
        if let Some(v) = node.exact.as_ref() {
            out.push((PathKey::exact(prefix.clone()), v));
        }
        if let Some(v) = node.wildcard.as_ref() {
            out.push((PathKey::wildcard(prefix.clone()), v));
        }
        for (comp, child) in &node.children {
            prefix.push(comp.clone());
            Self::collect(child, prefix, out);
            prefix.pop();
        }
    }
}

impl<V> Default for PathMap<V> {
    fn default() -> Self {
        Self::new()
    }
}
