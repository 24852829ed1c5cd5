//! `ControlContext`: per-component record of parent, logger, and
//! hierarchical name path (`spec.md` §3), plus the root's descendant index
//! used by `getComponent(namePath, requiredClass?)`.

use dashmap::DashMap;
use std::sync::{Arc, Mutex};

use crate::app::Application;
use crate::component::Component;
use crate::logger::Logger;
use crate::service::Service;
use wharf_core::{Result, WharfError};

struct RootIndex {
    contexts: DashMap<Vec<String>, Arc<ControlContext>>,
    components: DashMap<Vec<String>, Arc<dyn Component>>,
}

/// Each live component has a context recording its parent (`None` for the
/// root), its logger, and its hierarchical name path. The root additionally
/// maintains the name-path index every descendant is registered under —
/// `ControlContext` itself holds an `Arc` to that shared index rather than
/// distinguishing a separate "RootContext" type, since every context (root
/// or not) needs to resolve lookups against the same index.
pub struct ControlContext {
    parent: Option<Arc<ControlContext>>,
    logger: Arc<dyn Logger>,
    name_path: Vec<String>,
    root: Arc<RootIndex>,
    children_names: Mutex<Vec<String>>,
}

impl ControlContext {
    pub fn root(logger: Arc<dyn Logger>) -> Arc<Self> {
        Arc::new(Self {
            parent: None,
            logger,
            name_path: Vec::new(),
            root: Arc::new(RootIndex { contexts: DashMap::new(), components: DashMap::new() }),
            children_names: Mutex::new(Vec::new()),
        })
    }

    pub fn logger(&self) -> Arc<dyn Logger> {
        self.logger.clone()
    }

    pub fn name_path(&self) -> &[String] {
        &self.name_path
    }

    pub fn dotted_name(&self) -> String {
        self.name_path.join(".")
    }

    pub fn parent(&self) -> Option<Arc<ControlContext>> {
        self.parent.clone()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Attach `component` as a named child of this context. `explicit_name`
    /// is validated against `spec.md` §3's name pattern; absent, a name is
    /// auto-assigned from `stem` per §4.3. `fails with AlreadyBound` if the
    /// name collides with an existing sibling.
    pub fn add_child(
        self: &Arc<Self>,
        stem: &str,
        explicit_name: Option<&str>,
        component: Arc<dyn Component>,
    ) -> Result<Arc<ControlContext>> {
        let name = {
            let mut names = self.children_names.lock().unwrap();
            let name = match explicit_name {
                Some(n) => {
                    wharf_core::config::validate_name(n)
                        .map_err(|_| WharfError::Configuration(format!("invalid name '{n}'")))?;
                    n.to_string()
                }
                None => crate::naming::next_free_name(&names, stem),
            };
            if names.iter().any(|existing| existing == &name) {
                return Err(WharfError::AlreadyBound(name));
            }
            names.push(name.clone());
            name
        };

        let mut path = self.name_path.clone();
        path.push(name);

        if self.root.contexts.contains_key(&path) {
            return Err(WharfError::AlreadyBound(path.join(".")));
        }

        let child_logger = self.logger.with(path.last().unwrap());
        let ctx = Arc::new(ControlContext {
            parent: Some(self.clone()),
            logger: child_logger,
            name_path: path.clone(),
            root: self.root.clone(),
            children_names: Mutex::new(Vec::new()),
        });

        self.root.contexts.insert(path.clone(), ctx.clone());
        self.root.components.insert(path, component);
        Ok(ctx)
    }

    /// `context.getComponent(namePath)`, per `spec.md` §4.3.
    pub fn get_component(&self, dotted_path: &str) -> Result<Arc<dyn Component>> {
        let path: Vec<String> = dotted_path.split('.').map(str::to_string).collect();
        self.root
            .components
            .get(&path)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| WharfError::NotFound(dotted_path.to_string()))
    }

    /// `context.getComponent(namePath, Application)` — `fails with
    /// WrongClass` if the named component is not an `Application`.
    pub fn get_application(&self, dotted_path: &str) -> Result<Arc<dyn Application>> {
        let component = self.get_component(dotted_path)?;
        component.as_application().ok_or_else(|| WharfError::WrongClass {
            name: dotted_path.to_string(),
            expected: "Application",
            found: "other",
        })
    }

    pub fn get_service(&self, dotted_path: &str) -> Result<Arc<dyn Service>> {
        let component = self.get_component(dotted_path)?;
        component.as_service().ok_or_else(|| WharfError::WrongClass {
            name: dotted_path.to_string(),
            expected: "Service",
            found: "other",
        })
    }

    /// All descendant name paths, dotted and sorted — used by the
    /// `SIGUSR2` component-tree dump.
    pub fn dump_tree(&self) -> Vec<String> {
        let mut paths: Vec<String> =
            self.root.contexts.iter().map(|entry| entry.key().join(".")).collect();
        paths.sort();
        paths
    }

    pub fn descendant_count(&self) -> usize {
        self.root.contexts.len()
    }
}
