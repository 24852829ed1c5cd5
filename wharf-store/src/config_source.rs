//! Config loading: `spec.md` §6's `--config=<file>` / `--config-url=<url>`
//! collaborators, grounded on the teacher's `ando-core::config` figment
//! setup plus `ando-store`'s etcd backend (reshaped around Wharf's single
//! monolithic `GatewayConfig` document rather than APISIX's per-resource
//! key layout).

use figment::providers::{Env, Format, Yaml};
use figment::Figment;

use wharf_core::config::GatewayConfig;
use wharf_core::{Result, WharfError};

/// Where the top-level `GatewayConfig` document comes from, mirroring the
/// reference CLI's `--config`/`--config-url` flags plus the optional
/// `etcd` feature's remote source.
pub enum ConfigSource {
    File(String),
    Url(String),
    #[cfg(feature = "etcd")]
    Etcd { endpoints: Vec<String>, key: String },
}

impl ConfigSource {
    pub async fn load(&self) -> Result<GatewayConfig> {
        match self {
            ConfigSource::File(path) => {
                let text = std::fs::read_to_string(path)?;
                load_from_text(&text)
            }
            ConfigSource::Url(url) => {
                let body = reqwest::get(url)
                    .await
                    .map_err(|e| WharfError::Configuration(format!("fetching {url}: {e}")))?
                    .text()
                    .await
                    .map_err(|e| WharfError::Configuration(format!("reading {url}: {e}")))?;
                load_from_text(&body)
            }
            #[cfg(feature = "etcd")]
            ConfigSource::Etcd { endpoints, key } => crate::etcd::fetch_config(endpoints, key).await,
        }
    }
}

/// Shared by the file and URL sources: both hand over YAML text, merged
/// with a `WHARF_`-prefixed environment overlay per `SPEC_FULL.md` §3.
fn load_from_text(text: &str) -> Result<GatewayConfig> {
    let config: GatewayConfig = Figment::new()
        .merge(Yaml::string(text))
        .merge(Env::prefixed("WHARF_"))
        .extract()
        .map_err(|e| WharfError::Configuration(e.to_string()))?;
    config.validate()?;
    Ok(config)
}
