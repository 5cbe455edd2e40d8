use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Classification of URL validation failures.
///
/// Provides programmatic matching for different failure modes without
/// relying on unstable error message strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidUriKind {
    /// URL could not be parsed (malformed syntax)
    ParseError,
    /// URL is missing required host/authority component
    MissingAuthority,
    /// URL is missing required scheme (http/https)
    MissingScheme,
}

/// HTTP pipeline error types
///
/// The variants fall into four groups:
/// - invalid configuration (`MissingParameter`, header/method/URI errors), raised
///   before anything is sent
/// - transport failures (`Transport`, `Tls`) and `Timeout`, propagated unchanged
///   from the transport
/// - `HttpStatus`, produced only when the request settings ask for
///   success-status enforcement
/// - body encoding failures (`Json`, `FormEncode`, `FileRead`)
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpError {
    /// A required argument was empty or whitespace-only
    #[error("Missing required parameter: {name}")]
    MissingParameter {
        /// Name of the offending parameter
        name: &'static str,
    },

    /// Request building failed
    #[error("Failed to build request: {0}")]
    RequestBuild(#[from] http::Error),

    /// Invalid header name
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    /// Invalid header value
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    /// Invalid HTTP method token
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(#[from] http::method::InvalidMethod),

    /// The exchange did not complete within the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Transport error (network, connection, etc)
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// TLS error
    #[error("TLS error: {0}")]
    Tls(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Response body exceeded size limit
    #[error("Response body too large: limit {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// Non-success status, raised only when success-status enforcement is enabled
    #[error("Response status code does not indicate success: {} ({reason})", status.as_u16())]
    HttpStatus {
        status: http::StatusCode,
        reason: String,
        body_preview: String,
    },

    /// JSON serialization error
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Form URL encoding error
    #[error("Form encoding failed: {0}")]
    FormEncode(#[from] serde_urlencoded::ser::Error),

    /// A multipart file could not be read
    #[error("Failed to read '{}': {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid URL (failed to parse)
    ///
    /// Use the `kind` field for programmatic matching. The `reason` field contains
    /// a diagnostic message intended for logging only.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUri {
        /// The URL that failed to parse
        url: String,
        /// Structured failure classification for programmatic matching
        kind: InvalidUriKind,
        /// Diagnostic message (unstable format, for logging only)
        reason: String,
    },

    /// Invalid URL scheme for transport security configuration
    #[error("URL scheme '{scheme}' not allowed: {reason}")]
    InvalidScheme {
        /// The URL scheme that was rejected
        scheme: String,
        /// Reason the scheme was rejected
        reason: String,
    },

    /// A blocking call was made from inside an async runtime
    #[error("Blocking HTTP call issued from within an async runtime; use the async API instead")]
    BlockingInAsyncContext,

    /// The runtime backing the blocking API could not be started
    #[error("Failed to start blocking runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl HttpError {
    /// Returns `true` if the exchange was aborted by the configured timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpError::Timeout(_))
    }

    /// Returns the status code for non-success status errors.
    #[must_use]
    pub fn status(&self) -> Option<http::StatusCode> {
        match self {
            HttpError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<hyper_util::client::legacy::Error> for HttpError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        HttpError::Transport(Box::new(err))
    }
}
