//! Per-request settings model.
//!
//! [`RequestSettings`] is a plain owned value: headers, cookies, body,
//! certificates and flags describing one exchange. Validated chainable
//! mutators are provided as inherent methods; the fields are public so
//! callers can also assemble settings directly.

mod fluent;

use crate::error::HttpError;
use bytes::Bytes;
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use std::fmt;
use std::time::Duration;

/// Ordered name/value collection with case-insensitive names
///
/// Inserting a name that is already present (in any letter case) replaces
/// the value in place, keeping the entry's original position and spelling.
/// Iteration yields entries in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderCollection {
    entries: Vec<(String, String)>,
}

impl HeaderCollection {
    /// Create an empty collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`, replacing any existing entry with the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => self.entries[index].1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Look up a value by name, ignoring letter case
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|index| self.entries[index].1.as_str())
    }

    /// Whether an entry with this name exists, ignoring letter case
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Remove an entry by name, returning its value
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name)
            .map(|index| self.entries.remove(index).1)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(name, value)` pairs in insertion order
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        self.into_iter()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))
    }
}

impl<'a> IntoIterator for &'a HeaderCollection {
    type Item = (&'a str, &'a str);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        Iter {
            inner: self.entries.iter(),
        }
    }
}

/// Borrowing iterator over a [`HeaderCollection`]
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    inner: std::slice::Iter<'a, (String, String)>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> FromIterator<(K, V)> for HeaderCollection
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut collection = Self::new();
        for (name, value) in iter {
            collection.insert(name, value);
        }
        collection
    }
}

/// A client certificate presented during the TLS handshake
///
/// Holds the DER-encoded certificate chain (leaf first) and its private key.
pub struct ClientCertificate {
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
}

impl ClientCertificate {
    /// Create from an already decoded certificate chain and private key
    #[must_use]
    pub fn new(chain: Vec<CertificateDer<'static>>, key: PrivateKeyDer<'static>) -> Self {
        Self { chain, key }
    }

    /// Parse a PEM bundle holding the certificate chain and the private key
    ///
    /// Both may live in the same buffer or be passed as separate buffers.
    ///
    /// # Errors
    /// Returns `HttpError::Tls` if no certificate or no private key can be parsed.
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, HttpError> {
        let chain = CertificateDer::pem_slice_iter(cert_pem)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| HttpError::Tls(Box::new(e)))?;
        if chain.is_empty() {
            return Err(HttpError::Tls("no certificate found in PEM input".into()));
        }
        let key = PrivateKeyDer::from_pem_slice(key_pem).map_err(|e| HttpError::Tls(Box::new(e)))?;
        Ok(Self { chain, key })
    }

    /// Certificate chain, leaf first
    #[must_use]
    pub fn chain(&self) -> &[CertificateDer<'static>] {
        &self.chain
    }

    /// Private key matching the leaf certificate
    #[must_use]
    pub fn key(&self) -> &PrivateKeyDer<'static> {
        &self.key
    }
}

impl Clone for ClientCertificate {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            key: self.key.clone_key(),
        }
    }
}

impl PartialEq for ClientCertificate {
    fn eq(&self, other: &Self) -> bool {
        self.chain == other.chain && self.key.secret_der() == other.key.secret_der()
    }
}

impl Eq for ClientCertificate {}

// Never print key material.
impl fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCertificate")
            .field("chain_len", &self.chain.len())
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Everything that describes one outgoing exchange besides method and address
///
/// Settings are owned by the caller and read during execution; they are
/// never modified by the pipeline.
///
/// ```rust,ignore
/// let mut settings = RequestSettings::default();
/// settings
///     .use_bearer_authorization("token")?
///     .set_json_request_body(&payload)?
///     .ensure_success_status_code(true)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)] // independent per-request switches
pub struct RequestSettings {
    /// Request headers, content headers included
    pub headers: HeaderCollection,
    /// Cookies, sent as a single `Cookie` header
    pub cookies: HeaderCollection,
    /// Request body; `None` attaches no body
    pub request_body: Option<Bytes>,
    /// Ask the transport to authenticate with ambient credentials
    pub use_default_credentials: bool,
    /// Check the response status after the exchange (default: false)
    pub ensure_success_status_code: bool,
    /// When checking, fail the call on a non-2xx status (default: true)
    pub throw_on_non_success_status_code: bool,
    /// Certificates presented for mutual TLS
    pub client_certificates: Vec<ClientCertificate>,
    /// Exchange timeout; `None` uses the pipeline default
    pub timeout: Option<Duration>,
    /// Skip the request/response diagnostic events (default: false)
    pub suppress_request_response_logging: bool,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            headers: HeaderCollection::new(),
            cookies: HeaderCollection::new(),
            request_body: None,
            use_default_credentials: false,
            ensure_success_status_code: false,
            throw_on_non_success_status_code: true,
            client_certificates: Vec::new(),
            timeout: None,
            suppress_request_response_logging: false,
        }
    }
}

impl RequestSettings {
    /// Create settings with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request body bytes, empty when no body is set
    #[must_use]
    pub fn body_bytes(&self) -> Bytes {
        self.request_body.clone().unwrap_or_default()
    }

    /// Whether a non-empty body is set
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.request_body.as_ref().is_some_and(|body| !body.is_empty())
    }
}
