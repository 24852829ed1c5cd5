//! A typed registry of `{name -> constructor-fn(configRecord) ->
//! Component}`, replacing the source's runtime class-name-keyed registries
//! (`ApplicationFactory.register(class)`), per Design Notes §9.

use dashmap::DashMap;
use std::sync::Arc;

use crate::component::Component;
use wharf_core::{Result, WharfError};

/// Constructs a component instance from its raw config parameters. Schema
/// evaluation (defaults, per-field validators) happens inside the factory,
/// matching "A raw config object is evaluated against the target class's
/// config schema" (`spec.md` §4.3).
pub type ComponentFactory =
    Arc<dyn Fn(&serde_json::Map<String, serde_json::Value>) -> Result<Arc<dyn Component>> + Send + Sync>;

/// Maps a config-file `class` string to the Rust type that implements it.
/// Built once at startup (`wharf-store`'s bootstrap registers every built-in
/// class: `host_router`, `serial_router`, `redirector`, `static_file`,
/// `rate_limiter`, ...) and never mutated again.
#[derive(Default)]
pub struct ComponentRegistry {
    factories: DashMap<String, ComponentFactory>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, class: impl Into<String>, factory: ComponentFactory) {
        self.factories.insert(class.into(), factory);
    }

    pub fn construct(
        &self,
        class: &str,
        params: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Arc<dyn Component>> {
        let factory = self
            .factories
            .get(class)
            .ok_or_else(|| WharfError::Configuration(format!("unknown component class '{class}'")))?;
        factory(params)
    }

    pub fn classes(&self) -> Vec<String> {
        self.factories.iter().map(|e| e.key().clone()).collect()
    }
}

/// If a config node names an explicit `class` that disagrees with the class
/// the caller is about to construct, `fails with ClassMismatch` rather than
/// silently honoring either — per `spec.md` §4.3, "cross-class construction
/// fails with ClassMismatch".
pub fn check_class_match(declared: Option<&str>, target: &str) -> Result<()> {
    match declared {
        Some(d) if d != target => {
            Err(WharfError::ClassMismatch { expected: target.to_string(), found: d.to_string() })
        }
        _ => Ok(()),
    }
}
