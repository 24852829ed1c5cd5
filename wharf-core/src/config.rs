//! Configuration node schema shared by every component. Loading (file vs.
//! URL vs. etcd) is an ambient collaborator that lives in `wharf-store`;
//! this module only defines the wire shape and the `name` validation rule
//! from `spec.md` §3.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::{Result, WharfError};

fn name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-_.A-Za-z0-9]+$").unwrap())
}

/// Validate a user-supplied component name: non-empty, drawn from
/// `[-_.A-Za-z0-9]`, and not starting or ending with `-` or `.`.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(WharfError::Configuration("name must not be empty".into()));
    }
    let first = name.as_bytes()[0] as char;
    let last = name.as_bytes()[name.len() - 1] as char;
    if matches!(first, '-' | '.') || matches!(last, '-' | '.') {
        return Err(WharfError::Configuration(format!(
            "'{name}' must not start or end with '-' or '.'"
        )));
    }
    if !name_pattern().is_match(name) {
        return Err(WharfError::Configuration(format!(
            "'{name}' contains characters outside [-_.A-Za-z0-9]"
        )));
    }
    Ok(())
}

/// A single node in the configuration tree: a `class` naming the component
/// implementation to instantiate, an optional explicit `name` (auto-assigned
/// as `{stem}{n}` when absent, per spec's naming rule), an optional list of
/// nested children, and a free-form `params` bag interpreted by the named
/// class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentConfig {
    pub class: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub children: Vec<ComponentConfig>,
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl ComponentConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        for child in &self.children {
            child.validate()?;
        }
        Ok(())
    }
}

fn default_max_run_time() -> Option<u64> {
    None
}

/// The top-level document Wharf loads at startup: the host manager, the set
/// of services (rate limiters, etc.), the mounted applications, and the
/// endpoints that bind them to sockets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub host_manager: Option<ComponentConfig>,
    #[serde(default)]
    pub services: Vec<ComponentConfig>,
    #[serde(default)]
    pub applications: Vec<ComponentConfig>,
    #[serde(default)]
    pub endpoints: Vec<ComponentConfig>,
    #[serde(default = "default_max_run_time")]
    pub max_run_time_sec: Option<u64>,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(hm) = &self.host_manager {
            hm.validate()?;
        }
        for section in [&self.services, &self.applications, &self.endpoints] {
            for node in section {
                node.validate()?;
            }
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host_manager: None,
            services: Vec::new(),
            applications: Vec::new(),
            endpoints: Vec::new(),
            max_run_time_sec: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_names() {
        assert!(validate_name("web1").is_ok());
        assert!(validate_name("host_router.main").is_ok());
    }

    #[test]
    fn rejects_empty_names() {
        assert!(validate_name("").is_err());
    }

    #[test]
    fn rejects_leading_or_trailing_dash_or_dot() {
        assert!(validate_name("-web").is_err());
        assert!(validate_name("web-").is_err());
        assert!(validate_name(".web").is_err());
        assert!(validate_name("web.").is_err());
    }

    #[test]
    fn rejects_disallowed_characters() {
        assert!(validate_name("web/1").is_err());
        assert!(validate_name("web 1").is_err());
    }

    #[test]
    fn gateway_config_validates_nested_nodes() {
        let mut cfg = GatewayConfig::default();
        cfg.applications.push(ComponentConfig {
            class: "host_router".into(),
            name: Some("bad name".into()),
            children: Vec::new(),
            params: serde_json::Map::new(),
        });
        assert!(cfg.validate().is_err());
    }
}
