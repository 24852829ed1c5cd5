//! `HostItem`: a configured hostname group plus its TLS material, per
//! `spec.md` §4.4. Grounded on `ando-core/src/ssl.rs`'s `SslCertificate`,
//! generalized to also cover the self-sign path.

use std::sync::Arc;
use tokio::sync::OnceCell;

use rustls::sign::CertifiedKey;
use wharf_core::{Result, WharfError};

use crate::self_sign::SelfSignIssuer;

/// Where a host item's certificate material comes from.
#[derive(Debug, Clone)]
pub enum CertSource {
    /// A PEM certificate chain and private key supplied directly in config.
    Pem { cert_pem: String, key_pem: String },
    /// Synthesize a self-signed certificate for this host's names.
    SelfSigned,
}

/// `(hostnames, tlsContext | "selfSigned")` from `spec.md` §4.4. Resolution
/// to a `CertifiedKey` is memoized in a `OnceCell` so concurrent resolvers
/// (and repeated SNI lookups) share one generation, "cached for the lifetime
/// of the HostItem; concurrent lookups during generation share the same
/// promise".
pub struct HostItem {
    hostnames: Vec<String>,
    source: CertSource,
    resolved: OnceCell<Arc<CertifiedKey>>,
}

impl HostItem {
    pub fn new(hostnames: Vec<String>, source: CertSource) -> Self {
        Self { hostnames, source, resolved: OnceCell::new() }
    }

    pub fn hostnames(&self) -> &[String] {
        &self.hostnames
    }

    /// Resolve (generating or parsing as needed, exactly once) this host
    /// item's `CertifiedKey`.
    pub async fn resolve(&self, issuer: &dyn SelfSignIssuer) -> Result<Arc<CertifiedKey>> {
        self.resolved
            .get_or_try_init(|| async {
                let (cert_pem, key_pem) = match &self.source {
                    CertSource::Pem { cert_pem, key_pem } => (cert_pem.clone(), key_pem.clone()),
                    CertSource::SelfSigned => {
                        let primary = self
                            .hostnames
                            .first()
                            .ok_or_else(|| {
                                WharfError::Configuration("host item has no hostnames".into())
                            })?
                            .clone();
                        let alt_names = self.hostnames[1..].to_vec();
                        issuer.generate(&primary, &alt_names).await?
                    }
                };
                certified_key_from_pem(&cert_pem, &key_pem).map(Arc::new)
            })
            .await
            .cloned()
    }
}

fn certified_key_from_pem(cert_pem: &str, key_pem: &str) -> Result<CertifiedKey> {
    let certs = rustls_pemfile::certs(&mut cert_pem.as_bytes())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| WharfError::Configuration(format!("invalid certificate PEM: {e}")))?;
    if certs.is_empty() {
        return Err(WharfError::Configuration("no certificates found in PEM".into()));
    }

    let key = rustls_pemfile::private_key(&mut key_pem.as_bytes())
        .map_err(|e| WharfError::Configuration(format!("invalid private key PEM: {e}")))?
        .ok_or_else(|| WharfError::Configuration("no private key found in PEM".into()))?;

    let signing_key = rustls::crypto::ring::sign::any_supported_type(&key)
        .map_err(|e| WharfError::Configuration(format!("unsupported private key: {e}")))?;

    Ok(CertifiedKey::new(certs, signing_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::self_sign::RcgenIssuer;

    #[tokio::test]
    async fn self_signed_host_item_resolves_and_caches() {
        let item = HostItem::new(vec!["localhost".to_string()], CertSource::SelfSigned);
        let issuer = RcgenIssuer;
        let first = item.resolve(&issuer).await.unwrap();
        let second = item.resolve(&issuer).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn pem_host_item_rejects_garbage_pem() {
        let item = HostItem::new(
            vec!["example.test".to_string()],
            CertSource::Pem { cert_pem: "not pem".into(), key_pem: "not pem".into() },
        );
        let issuer = RcgenIssuer;
        let err = item.resolve(&issuer).await.unwrap_err();
        assert!(matches!(err, WharfError::Configuration(_)));
    }
}
