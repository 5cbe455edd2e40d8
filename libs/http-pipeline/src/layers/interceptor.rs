use crate::error::HttpError;
use crate::event_log::{HttpEventKind, HttpEventLog};
use crate::request::TransportRequest;
use crate::response::HttpResponse;
use crate::settings::{HeaderCollection, RequestSettings};
use bytes::Bytes;
use http::header::{COOKIE, HeaderName, HeaderValue};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{SystemTime, UNIX_EPOCH};
use tower::{Layer, Service};
use uuid::Uuid;

/// Width of the separator between status line and body in response diagnostics
const DIAGNOSTIC_RULE_WIDTH: usize = 70;

/// Whether a header describes the request body rather than the request.
///
/// Any name containing `content` (case-insensitive) qualifies, e.g.
/// `Content-Type`, `Content-Length`, `Content-Disposition`.
#[must_use]
pub fn is_content_header(name: &str) -> bool {
    name.to_ascii_lowercase().contains("content")
}

/// Read-only snapshot of the settings the interceptor acts on
#[derive(Debug, Clone, Default)]
pub struct InterceptPolicy {
    headers: HeaderCollection,
    cookies: HeaderCollection,
    ensure_success_status_code: bool,
    throw_on_non_success_status_code: bool,
    suppress_logging: bool,
}

impl InterceptPolicy {
    /// Capture the interception-relevant parts of `settings`
    #[must_use]
    pub fn from_settings(settings: &RequestSettings) -> Self {
        Self {
            headers: settings.headers.clone(),
            cookies: settings.cookies.clone(),
            ensure_success_status_code: settings.ensure_success_status_code,
            throw_on_non_success_status_code: settings.throw_on_non_success_status_code,
            suppress_logging: settings.suppress_request_response_logging,
        }
    }

    /// Write headers and cookies into the outgoing request
    ///
    /// Content headers go to `content_headers` and are only sent with a body.
    /// Cookies are joined into one `Cookie` header as `n1=v1;n2=v2`.
    ///
    /// # Errors
    /// Returns `HttpError::InvalidHeaderName` or `HttpError::InvalidHeaderValue`
    /// if a header or cookie cannot be represented on the wire.
    pub fn apply(&self, request: &mut TransportRequest) -> Result<(), HttpError> {
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())?;
            let header_value = HeaderValue::from_str(value)?;
            if is_content_header(name) {
                request.content_headers.insert(header_name, header_value);
            } else {
                request.headers.insert(header_name, header_value);
            }
        }

        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(";");
            // A Cookie header set directly on the request keeps its pairs
            let cookie = match request.headers.get(COOKIE) {
                Some(existing) => {
                    let mut merged = existing.as_bytes().to_vec();
                    merged.push(b';');
                    merged.extend_from_slice(cookie.as_bytes());
                    HeaderValue::from_bytes(&merged)?
                }
                None => HeaderValue::from_str(&cookie)?,
            };
            request.headers.insert(COOKIE, cookie);
        }

        Ok(())
    }
}

/// Tower layer that applies an [`InterceptPolicy`] around one exchange
///
/// For each call the service:
/// 1. writes the policy's headers and cookies into the request
/// 2. logs a request event (unless suppressed)
/// 3. calls the inner service once; errors propagate unchanged
/// 4. logs a response event with the same correlation id (unless suppressed)
/// 5. enforces the success-status policy
///
/// Each exchange runs in an `outgoing_http` span carrying method, URL
/// (without query string), correlation id and status.
#[derive(Clone)]
pub struct InterceptorLayer {
    policy: Arc<InterceptPolicy>,
    event_log: Arc<dyn HttpEventLog>,
}

impl InterceptorLayer {
    /// Create the layer from a policy snapshot and an event sink
    #[must_use]
    pub fn new(policy: InterceptPolicy, event_log: Arc<dyn HttpEventLog>) -> Self {
        Self {
            policy: Arc::new(policy),
            event_log,
        }
    }
}

impl<S> Layer<S> for InterceptorLayer {
    type Service = InterceptorService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InterceptorService {
            inner,
            policy: Arc::clone(&self.policy),
            event_log: Arc::clone(&self.event_log),
        }
    }
}

/// Service produced by [`InterceptorLayer`]
#[derive(Clone)]
pub struct InterceptorService<S> {
    inner: S,
    policy: Arc<InterceptPolicy>,
    event_log: Arc<dyn HttpEventLog>,
}

impl<S> Service<TransportRequest> for InterceptorService<S>
where
    S: Service<TransportRequest, Response = HttpResponse, Error = HttpError>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    type Response = HttpResponse;
    type Error = HttpError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: TransportRequest) -> Self::Future {
        use tracing::{Instrument, Level};

        // Swap so we call the instance that was poll_ready'd, leaving a fresh clone
        // for the next poll_ready cycle.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let policy = Arc::clone(&self.policy);
        let event_log = Arc::clone(&self.event_log);

        Box::pin(async move {
            policy.apply(&mut request)?;

            let correlation_id = new_correlation_id();
            let summary = format!("{} {}", request.method, request.uri);
            let url = format!(
                "{}://{}{}",
                request.uri.scheme_str().unwrap_or("https"),
                request
                    .uri
                    .authority()
                    .map_or("", http::uri::Authority::as_str),
                request.uri.path()
            );

            let span = tracing::span!(
                Level::INFO, "outgoing_http",
                http.method = %request.method,
                http.url = %url,
                correlation_id = %correlation_id,
                http.status_code = tracing::field::Empty,
                error = tracing::field::Empty,
            );

            if !policy.suppress_logging {
                event_log.log(
                    &correlation_id,
                    HttpEventKind::Request,
                    &summary,
                    &request.body_bytes(),
                );
            }

            let response = match inner.call(request).instrument(span.clone()).await {
                Ok(response) => response,
                Err(err) => {
                    span.record("error", true);
                    return Err(err);
                }
            };

            span.record("http.status_code", response.status().as_u16());
            if !response.is_success() {
                span.record("error", true);
            }

            if !policy.suppress_logging {
                event_log.log(
                    &correlation_id,
                    HttpEventKind::Response,
                    &summary,
                    &response_payload(&response),
                );
            }

            if policy.ensure_success_status_code
                && let Err(err) = response.error_for_status_ref()
            {
                if policy.throw_on_non_success_status_code {
                    return Err(err);
                }
                tracing::debug!(
                    parent: &span,
                    error = %err,
                    "non-success status accepted (throw_on_non_success_status_code=false)"
                );
            }

            Ok(response)
        })
    }
}

/// Unique id shared by the request and response events of one exchange
fn new_correlation_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    format!("{nanos}{}", Uuid::new_v4())
}

/// Payload recorded for the response event
///
/// Successful responses log their body. Non-success responses log
/// `"{reason} ({code})"`, followed by a CRLF, a rule of `=` and the body
/// whenever the response has content, even an empty one.
fn response_payload(response: &HttpResponse) -> Bytes {
    let body = response.body();
    if response.is_success() {
        return body.cloned().unwrap_or_default();
    }

    let status_line = format!("{} ({})", response.reason(), response.status().as_u16());
    match body {
        Some(body) => {
            let mut payload = format!(
                "{status_line}\r\n{}\r\n",
                "=".repeat(DIAGNOSTIC_RULE_WIDTH)
            )
            .into_bytes();
            payload.extend_from_slice(body);
            Bytes::from(payload)
        }
        None => Bytes::from(status_line),
    }
}
