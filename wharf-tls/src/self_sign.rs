//! `SelfSignIssuer`: the external PEM-producing collaborator `spec.md` §4.4
//! names for self-signed host entries. `RcgenIssuer` is the default
//! implementation, grounded on `ando-core/src/ssl.rs`'s certificate
//! generation but swapping in `rcgen` for the teacher's own issuance path.

use async_trait::async_trait;
use std::net::IpAddr;

use wharf_core::{Result, WharfError};

/// Produces a `(cert_pem, key_pem)` pair for a primary hostname plus its
/// alternate names. Implementations must not block the accept path; `spec.md`
/// §4.5 "TLS self-sign is the only non-trivial CPU work and must run off the
/// accept path".
#[async_trait]
pub trait SelfSignIssuer: Send + Sync {
    async fn generate(&self, primary: &str, alt_names: &[String]) -> Result<(String, String)>;
}

/// Generates a self-signed certificate via `rcgen`, partitioning the
/// requested names into DNS and literal-IP subject alternative names per
/// `spec.md` §4.4, and running the (CPU-bound) generation on a blocking
/// thread.
pub struct RcgenIssuer;

#[async_trait]
impl SelfSignIssuer for RcgenIssuer {
    async fn generate(&self, primary: &str, alt_names: &[String]) -> Result<(String, String)> {
        let mut names = Vec::with_capacity(1 + alt_names.len());
        names.push(primary.to_string());
        names.extend(alt_names.iter().cloned());

        tokio::task::spawn_blocking(move || generate_self_signed(&names))
            .await
            .map_err(|e| WharfError::Internal(format!("self-sign task panicked: {e}")))?
    }
}

fn generate_self_signed(names: &[String]) -> Result<(String, String)> {
    let mut sans = Vec::with_capacity(names.len());
    for name in names {
        let san = if let Ok(ip) = name.parse::<IpAddr>() {
            rcgen::SanType::IpAddress(ip)
        } else {
            let dns = rcgen::Ia5String::try_from(name.as_str())
                .map_err(|e| WharfError::Configuration(format!("invalid hostname '{name}': {e}")))?;
            rcgen::SanType::DnsName(dns)
        };
        sans.push(san);
    }

    let mut params = rcgen::CertificateParams::default();
    params.subject_alt_names = sans;
    params
        .distinguished_name
        .push(rcgen::DnType::CommonName, names[0].as_str());

    let key_pair = rcgen::KeyPair::generate()
        .map_err(|e| WharfError::Internal(format!("key generation failed: {e}")))?;
    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| WharfError::Internal(format!("self-signed cert generation failed: {e}")))?;

    Ok((cert.pem(), key_pair.serialize_pem()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rcgen_issuer_produces_parseable_pem() {
        let issuer = RcgenIssuer;
        let (cert_pem, key_pem) = issuer
            .generate("localhost", &["127.0.0.1".to_string()])
            .await
            .unwrap();
        assert!(cert_pem.contains("BEGIN CERTIFICATE"));
        assert!(key_pem.contains("PRIVATE KEY"));
    }
}
