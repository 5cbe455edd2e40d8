use crate::config::TransportSecurity;
use crate::error::{HttpError, InvalidUriKind};
use crate::settings::ClientCertificate;
use bytes::Bytes;
use http::{HeaderMap, Method, Request, Uri};
use http_body_util::Full;

/// One outgoing exchange as seen by the transport
///
/// Headers are split in two maps: `headers` is always sent, while
/// `content_headers` describe the body and are only sent together with one.
///
/// ```rust,ignore
/// let mut request = TransportRequest::new(Method::PUT, "https://example.com/a".parse()?);
/// request.body = Some(Bytes::from_static(b"payload"));
/// let response = pipeline.send_request(request).await?;
/// ```
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Request method
    pub method: Method,
    /// Absolute request URI
    pub uri: Uri,
    /// Headers sent with every request
    pub headers: HeaderMap,
    /// Headers sent only when `body` is present
    pub content_headers: HeaderMap,
    /// Request body; `None` sends no content
    pub body: Option<Bytes>,
    /// Certificates offered during the TLS handshake
    pub client_certificates: Vec<ClientCertificate>,
    /// Authenticate with ambient credentials where the transport supports it
    pub use_default_credentials: bool,
}

impl TransportRequest {
    /// Create a body-less request with no headers
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            content_headers: HeaderMap::new(),
            body: None,
            client_certificates: Vec::new(),
            use_default_credentials: false,
        }
    }

    /// Request body bytes, empty when absent
    #[must_use]
    pub fn body_bytes(&self) -> Bytes {
        self.body.clone().unwrap_or_default()
    }

    /// Convert into an `http::Request`
    ///
    /// Content headers are merged in only when a body is present.
    ///
    /// # Errors
    /// Returns `HttpError::RequestBuild` if the request cannot be assembled.
    pub fn into_http_request(self) -> Result<Request<Full<Bytes>>, HttpError> {
        let mut builder = Request::builder().method(self.method).uri(self.uri);

        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers);
            if self.body.is_some() {
                headers.extend(self.content_headers);
            }
        }

        let body = self.body.unwrap_or_default();
        Ok(builder.body(Full::new(body))?)
    }
}

/// Validate an HTTP method token.
///
/// # Errors
/// Returns `HttpError::MissingParameter` for a blank token and
/// `HttpError::InvalidMethod` for a token that is not a valid method.
pub fn parse_method(method: &str) -> Result<Method, HttpError> {
    if method.trim().is_empty() {
        return Err(HttpError::MissingParameter {
            name: "http_method",
        });
    }
    Ok(Method::from_bytes(method.trim().as_bytes())?)
}

/// Validate an address and its scheme against the transport security mode.
///
/// Uses `http::Uri` parsing rather than string prefix matching and returns
/// the parsed URI for request building.
///
/// # Errors
/// Returns `HttpError::MissingParameter` for a blank address,
/// `HttpError::InvalidUri` when it cannot be parsed or lacks scheme or host,
/// and `HttpError::InvalidScheme` when the scheme is not allowed.
pub fn validate_address(address: &str, security: TransportSecurity) -> Result<Uri, HttpError> {
    if address.trim().is_empty() {
        return Err(HttpError::MissingParameter { name: "address" });
    }

    let uri: Uri = address
        .parse()
        .map_err(|e: http::uri::InvalidUri| HttpError::InvalidUri {
            url: address.to_owned(),
            kind: InvalidUriKind::ParseError,
            reason: e.to_string(),
        })?;

    if uri.authority().is_none() {
        return Err(HttpError::InvalidUri {
            url: address.to_owned(),
            kind: InvalidUriKind::MissingAuthority,
            reason: "missing host/authority".to_owned(),
        });
    }

    match uri.scheme_str() {
        Some("https") => Ok(uri),
        Some("http") => match security {
            TransportSecurity::AllowHttp => Ok(uri),
            TransportSecurity::TlsOnly => Err(HttpError::InvalidScheme {
                scheme: "http".to_owned(),
                reason: "HTTPS required (transport security is TlsOnly)".to_owned(),
            }),
        },
        Some(scheme) => Err(HttpError::InvalidScheme {
            scheme: scheme.to_owned(),
            reason: "only http:// and https:// schemes are supported".to_owned(),
        }),
        None => Err(HttpError::InvalidUri {
            url: address.to_owned(),
            kind: InvalidUriKind::MissingScheme,
            reason: "missing scheme".to_owned(),
        }),
    }
}
