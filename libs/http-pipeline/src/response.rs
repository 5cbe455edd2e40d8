use crate::error::HttpError;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};

/// Maximum body preview size carried by status errors (8KB).
///
/// Larger error bodies are truncated so a misbehaving server cannot inflate
/// error values.
pub const ERROR_BODY_PREVIEW_LIMIT: usize = 8 * 1024;

/// A fully buffered HTTP response
///
/// The body is read completely (within the pipeline's `max_body_size`)
/// before the response reaches the caller. `body` is `None` when the
/// response carries no content at all, as for `204 No Content` or `304 Not
/// Modified`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    status: StatusCode,
    reason: String,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl HttpResponse {
    /// Create a response; the reason phrase defaults to the canonical one
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: Option<Bytes>) -> Self {
        Self {
            status,
            reason: status.canonical_reason().unwrap_or_default().to_owned(),
            headers,
            body,
        }
    }

    /// Override the reason phrase with the one the server sent
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Response status code
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Reason phrase, e.g. `Not Found`
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Response headers
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Response body, `None` when the response has no content
    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Whether the status is in the 2xx range
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Consume the response and return the body bytes (empty when absent)
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.body.unwrap_or_default()
    }

    /// Consume the response and decode the body as UTF-8
    ///
    /// Invalid sequences are replaced with U+FFFD.
    #[must_use]
    pub fn into_text(self) -> String {
        decode_text(&self.into_bytes())
    }

    /// Return the response unchanged for 2xx statuses, an error otherwise
    ///
    /// # Errors
    /// Returns `HttpError::HttpStatus` with a body preview if the status is not 2xx.
    pub fn error_for_status(self) -> Result<Self, HttpError> {
        self.error_for_status_ref()?;
        Ok(self)
    }

    /// Borrowing variant of [`error_for_status`](Self::error_for_status)
    ///
    /// # Errors
    /// Returns `HttpError::HttpStatus` with a body preview if the status is not 2xx.
    pub fn error_for_status_ref(&self) -> Result<&Self, HttpError> {
        if self.status.is_success() {
            return Ok(self);
        }

        Err(HttpError::HttpStatus {
            status: self.status,
            reason: self.reason.clone(),
            body_preview: self.body_preview(),
        })
    }

    fn body_preview(&self) -> String {
        let Some(body) = &self.body else {
            return String::new();
        };
        let end = body.len().min(ERROR_BODY_PREVIEW_LIMIT);
        String::from_utf8_lossy(&body[..end]).into_owned()
    }
}

/// Decode bytes as UTF-8, replacing invalid sequences
#[must_use]
pub fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_canonical_reason() {
        let resp = HttpResponse::new(StatusCode::NOT_FOUND, HeaderMap::new(), None);
        assert_eq!(resp.reason(), "Not Found");
        assert!(!resp.is_success());

        let resp = resp.with_reason("Nope");
        assert_eq!(resp.reason(), "Nope");
    }

    #[test]
    fn test_into_text_is_lossy() {
        let resp = HttpResponse::new(
            StatusCode::OK,
            HeaderMap::new(),
            Some(Bytes::from_static(b"ok \xff")),
        );
        assert_eq!(resp.into_text(), "ok \u{fffd}");
    }

    #[test]
    fn test_into_bytes_without_body_is_empty() {
        let resp = HttpResponse::new(StatusCode::NO_CONTENT, HeaderMap::new(), None);
        assert!(resp.body().is_none());
        assert!(resp.into_bytes().is_empty());
    }

    #[test]
    fn test_error_for_status_success() {
        let resp = HttpResponse::new(StatusCode::CREATED, HeaderMap::new(), None);
        assert!(resp.error_for_status().is_ok());
    }

    #[test]
    fn test_error_for_status_carries_preview() {
        let resp = HttpResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            HeaderMap::new(),
            Some(Bytes::from("boom")),
        );
        match resp.error_for_status_ref() {
            Err(HttpError::HttpStatus {
                status,
                reason,
                body_preview,
            }) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(reason, "Internal Server Error");
                assert_eq!(body_preview, "boom");
            }
            other => panic!("expected HttpStatus, got: {other:?}"),
        }
    }

    #[test]
    fn test_error_body_preview_is_truncated() {
        let body = Bytes::from(vec![b'x'; ERROR_BODY_PREVIEW_LIMIT * 2]);
        let resp = HttpResponse::new(StatusCode::BAD_GATEWAY, HeaderMap::new(), Some(body));
        let Err(HttpError::HttpStatus { body_preview, .. }) = resp.error_for_status() else {
            panic!("expected HttpStatus error");
        };
        assert_eq!(body_preview.len(), ERROR_BODY_PREVIEW_LIMIT);
    }
}
