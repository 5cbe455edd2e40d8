//! TLS configuration for the transport.
//!
//! Builds rustls client configurations from a root certificate source and an
//! optional set of client certificates. Native root certificates are loaded
//! once and cached, since OS certificate store lookups can be slow.

use crate::config::TlsRootConfig;
use crate::error::HttpError;
use crate::settings::ClientCertificate;
use rustls::client::ResolvesClientCert;
use rustls::sign::CertifiedKey;
use rustls::{RootCertStore, SignatureScheme};
use rustls_pki_types::CertificateDer;
use std::sync::{Arc, OnceLock};

/// Cached native root certificates.
/// Always stores Ok; empty vec means no certs found (warned, not errored).
static NATIVE_ROOTS_CACHE: OnceLock<Vec<CertificateDer<'static>>> = OnceLock::new();

/// Counter for test verification that the loader only runs once.
#[cfg(test)]
static LOAD_COUNT: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);

fn load_native_certs_inner() -> Vec<CertificateDer<'static>> {
    #[cfg(test)]
    LOAD_COUNT.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

    let result = rustls_native_certs::load_native_certs();

    for err in &result.errors {
        tracing::warn!(error = %err, "error loading native root certificate");
    }

    if result.certs.is_empty() {
        tracing::warn!("no native root CA certificates found");
    } else {
        tracing::debug!(count = result.certs.len(), "loaded native root certificates");
    }

    result.certs
}

/// Get cached native root certificates (may be empty).
pub fn native_root_certs() -> &'static [CertificateDer<'static>] {
    NATIVE_ROOTS_CACHE
        .get_or_init(load_native_certs_inner)
        .as_slice()
}

/// Get the crypto provider for TLS connections.
///
/// Uses the process-wide default provider when one is installed, otherwise an
/// aws-lc-rs provider that is not installed globally.
pub fn get_crypto_provider() -> Arc<rustls::crypto::CryptoProvider> {
    rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

/// Build the trust anchor store for the given root source.
///
/// # Errors
///
/// Returns `HttpError::Tls` if `Native` is requested and no usable root
/// certificate is found in the OS store.
pub fn root_store(roots: TlsRootConfig) -> Result<RootCertStore, HttpError> {
    match roots {
        TlsRootConfig::WebPki => Ok(RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        }),
        TlsRootConfig::Native => {
            let certs = native_root_certs();
            if certs.is_empty() {
                return Err(HttpError::Tls(
                    "no native root CA certificates found in OS certificate store".into(),
                ));
            }

            let mut store = RootCertStore::empty();
            let (added, ignored) = store.add_parsable_certificates(certs.iter().cloned());
            if ignored > 0 {
                tracing::warn!(
                    added = added,
                    ignored = ignored,
                    "some native root certificates could not be parsed"
                );
            }
            if added == 0 {
                return Err(HttpError::Tls(
                    format!(
                        "no valid native root CA certificates parsed (found {}, all {} failed to parse)",
                        certs.len(),
                        ignored
                    )
                    .into(),
                ));
            }
            Ok(store)
        }
    }
}

/// Build a rustls `ClientConfig` presenting the given client certificates.
///
/// With no certificates the configuration performs no client authentication.
///
/// # Errors
///
/// Returns `HttpError::Tls` if the root store cannot be built, a private key
/// is not supported by the crypto provider, or protocol versions cannot be set.
pub fn client_config(
    roots: TlsRootConfig,
    certificates: &[ClientCertificate],
) -> Result<rustls::ClientConfig, HttpError> {
    let provider = get_crypto_provider();
    let root_store = root_store(roots)?;

    let builder = rustls::ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| HttpError::Tls(Box::new(e)))?
        .with_root_certificates(root_store);

    if certificates.is_empty() {
        return Ok(builder.with_no_client_auth());
    }

    let keys = certificates
        .iter()
        .map(|certificate| {
            let signing_key = provider
                .key_provider
                .load_private_key(certificate.key().clone_key())
                .map_err(|e| HttpError::Tls(Box::new(e)))?;
            Ok(Arc::new(CertifiedKey::new(
                certificate.chain().to_vec(),
                signing_key,
            )))
        })
        .collect::<Result<Vec<_>, HttpError>>()?;

    tracing::debug!(count = keys.len(), "configured client certificates");

    Ok(builder.with_client_cert_resolver(Arc::new(ClientCertResolver { keys })))
}

/// Presents the first configured certificate whose key can sign with a
/// scheme the server offers.
#[derive(Debug)]
struct ClientCertResolver {
    keys: Vec<Arc<CertifiedKey>>,
}

impl ResolvesClientCert for ClientCertResolver {
    fn resolve(
        &self,
        _root_hint_subjects: &[&[u8]],
        sigschemes: &[SignatureScheme],
    ) -> Option<Arc<CertifiedKey>> {
        let chosen = self
            .keys
            .iter()
            .find(|key| key.key.choose_scheme(sigschemes).is_some())
            .cloned();
        if chosen.is_none() {
            tracing::debug!("no client certificate matches the server's signature schemes");
        }
        chosen
    }

    fn has_certs(&self) -> bool {
        !self.keys.is_empty()
    }
}
