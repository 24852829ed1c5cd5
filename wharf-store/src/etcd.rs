//! Optional etcd-backed config source: an enterprise-style collaborator,
//! grounded on the teacher's `ando-store::etcd::EtcdStore`, reshaped to
//! fetch Wharf's single monolithic `GatewayConfig` document from one key
//! rather than APISIX's per-resource key layout.

use wharf_core::config::GatewayConfig;
use wharf_core::{Result, WharfError};

pub async fn fetch_config(endpoints: &[String], key: &str) -> Result<GatewayConfig> {
    let mut client = etcd_client::Client::connect(endpoints, None)
        .await
        .map_err(|e| WharfError::Configuration(format!("connecting to etcd: {e}")))?;
    let resp = client
        .get(key.as_bytes(), None)
        .await
        .map_err(|e| WharfError::Configuration(format!("fetching '{key}' from etcd: {e}")))?;
    let kv = resp
        .kvs()
        .first()
        .ok_or_else(|| WharfError::Configuration(format!("no value at etcd key '{key}'")))?;
    let text = std::str::from_utf8(kv.value())
        .map_err(|e| WharfError::Configuration(format!("etcd value at '{key}' is not UTF-8: {e}")))?;
    let config: GatewayConfig = serde_yaml::from_str(text).map_err(|e| WharfError::Configuration(e.to_string()))?;
    config.validate()?;
    Ok(config)
}
