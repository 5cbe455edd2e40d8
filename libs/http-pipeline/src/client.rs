use crate::builder::{BoxedTransport, HttpPipelineBuilder};
use crate::config::TransportSecurity;
use crate::error::HttpError;
use crate::event_log::HttpEventLog;
use crate::layers::{InterceptPolicy, InterceptorLayer, UserAgentLayer};
use crate::request::{TransportRequest, parse_method, validate_address};
use crate::response::HttpResponse;
use crate::settings::RequestSettings;
use bytes::Bytes;
use http::Method;
use std::sync::Arc;
use std::time::Duration;
use tower::timeout::TimeoutLayer;
use tower::{BoxError, ServiceBuilder, ServiceExt};

/// Which part of the settings' body a verb sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyPolicy {
    /// Never attach a body (GET, DELETE)
    Omit,
    /// Attach the body, or an empty one when unset (POST, PUT)
    Always,
    /// Attach the body only when it is non-empty (PATCH, SEND)
    IfNonEmpty,
}

impl BodyPolicy {
    fn select(self, settings: &RequestSettings) -> Option<Bytes> {
        match self {
            Self::Omit => None,
            Self::Always => Some(settings.body_bytes()),
            Self::IfNonEmpty => settings.request_body.clone().filter(|body| !body.is_empty()),
        }
    }
}

/// Configurable HTTP request pipeline
///
/// Every call runs one exchange through
/// `Interceptor → UserAgent → Timeout → transport`. The interceptor applies
/// the call's [`RequestSettings`] (headers, cookies, status policy, event
/// logging); the timeout is the settings' own or the pipeline default.
///
/// Each verb comes in three forms:
/// - `verb_as_bytes(address, &settings)` returns the raw body
/// - `verb(address, &settings)` decodes the body as UTF-8 (lossy)
/// - `verb_with(address, configure)` builds the settings from a closure first
///
/// Bodies are returned whatever the status; a non-2xx status is an error
/// only under [`RequestSettings::ensure_success_status_code`].
///
/// `HttpPipeline` is `Clone + Send + Sync`; clones share the transport.
///
/// # Example
///
/// ```ignore
/// let pipeline = HttpPipeline::new()?;
/// let body = pipeline
///     .post_with("https://api.example.com/users", |s| {
///         s.set_json_request_body(&NewUser { name: "Alice" })?
///             .ensure_success_status_code(true)?;
///         Ok(())
///     })
///     .await?;
/// ```
#[derive(Clone)]
pub struct HttpPipeline {
    pub(crate) transport: BoxedTransport,
    pub(crate) event_log: Arc<dyn HttpEventLog>,
    pub(crate) user_agent: UserAgentLayer,
    pub(crate) default_timeout: Duration,
    pub(crate) transport_security: TransportSecurity,
}

impl HttpPipeline {
    /// Create a pipeline with default configuration
    ///
    /// # Errors
    /// Returns an error if TLS initialization fails
    pub fn new() -> Result<Self, HttpError> {
        HttpPipelineBuilder::new().build()
    }

    /// Create a builder for configuring the pipeline
    #[must_use]
    pub fn builder() -> HttpPipelineBuilder {
        HttpPipelineBuilder::new()
    }

    /// Timeout used when a request does not set its own
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Run one exchange and return the full response
    ///
    /// The request body is attached only when the settings hold a non-empty one.
    ///
    /// # Errors
    /// Returns configuration errors before any I/O, transport, TLS and
    /// timeout errors from the exchange, and `HttpError::HttpStatus` when the
    /// settings ask for non-success statuses to fail.
    pub async fn execute(
        &self,
        method: Method,
        address: &str,
        settings: &RequestSettings,
    ) -> Result<HttpResponse, HttpError> {
        self.dispatch(method, address, settings, BodyPolicy::IfNonEmpty)
            .await
    }

    /// Send a caller-assembled request with default settings
    ///
    /// The request's URI is checked against the transport security mode;
    /// its headers, body and certificates are sent as-is.
    ///
    /// # Errors
    /// Same as [`execute`](Self::execute).
    pub async fn send_request(&self, request: TransportRequest) -> Result<HttpResponse, HttpError> {
        validate_address(&request.uri.to_string(), self.transport_security)?;
        self.exchange(request, &RequestSettings::default()).await
    }

    /// GET `address` and return the body bytes
    ///
    /// # Errors
    /// See [`execute`](Self::execute).
    pub async fn get_as_bytes(
        &self,
        address: &str,
        settings: &RequestSettings,
    ) -> Result<Bytes, HttpError> {
        let response = self
            .dispatch(Method::GET, address, settings, BodyPolicy::Omit)
            .await?;
        Ok(response.into_bytes())
    }

    /// GET `address` and return the body as text
    ///
    /// # Errors
    /// See [`execute`](Self::execute).
    pub async fn get(
        &self,
        address: &str,
        settings: &RequestSettings,
    ) -> Result<String, HttpError> {
        let response = self
            .dispatch(Method::GET, address, settings, BodyPolicy::Omit)
            .await?;
        Ok(response.into_text())
    }

    /// GET `address` with settings built by `configure`
    ///
    /// # Errors
    /// Returns the configurator's error, or see [`execute`](Self::execute).
    pub async fn get_with<F>(&self, address: &str, configure: F) -> Result<String, HttpError>
    where
        F: FnOnce(&mut RequestSettings) -> Result<(), HttpError>,
    {
        let settings = configured(configure)?;
        self.get(address, &settings).await
    }

    /// POST to `address` and return the body bytes
    ///
    /// An unset request body is sent as an empty one.
    ///
    /// # Errors
    /// See [`execute`](Self::execute).
    pub async fn post_as_bytes(
        &self,
        address: &str,
        settings: &RequestSettings,
    ) -> Result<Bytes, HttpError> {
        let response = self
            .dispatch(Method::POST, address, settings, BodyPolicy::Always)
            .await?;
        Ok(response.into_bytes())
    }

    /// POST to `address` and return the body as text
    ///
    /// # Errors
    /// See [`execute`](Self::execute).
    pub async fn post(
        &self,
        address: &str,
        settings: &RequestSettings,
    ) -> Result<String, HttpError> {
        let response = self
            .dispatch(Method::POST, address, settings, BodyPolicy::Always)
            .await?;
        Ok(response.into_text())
    }

    /// POST to `address` with settings built by `configure`
    ///
    /// # Errors
    /// Returns the configurator's error, or see [`execute`](Self::execute).
    pub async fn post_with<F>(&self, address: &str, configure: F) -> Result<String, HttpError>
    where
        F: FnOnce(&mut RequestSettings) -> Result<(), HttpError>,
    {
        let settings = configured(configure)?;
        self.post(address, &settings).await
    }

    /// PUT to `address` and return the body bytes
    ///
    /// An unset request body is sent as an empty one.
    ///
    /// # Errors
    /// See [`execute`](Self::execute).
    pub async fn put_as_bytes(
        &self,
        address: &str,
        settings: &RequestSettings,
    ) -> Result<Bytes, HttpError> {
        let response = self
            .dispatch(Method::PUT, address, settings, BodyPolicy::Always)
            .await?;
        Ok(response.into_bytes())
    }

    /// PUT to `address` and return the body as text
    ///
    /// # Errors
    /// See [`execute`](Self::execute).
    pub async fn put(
        &self,
        address: &str,
        settings: &RequestSettings,
    ) -> Result<String, HttpError> {
        let response = self
            .dispatch(Method::PUT, address, settings, BodyPolicy::Always)
            .await?;
        Ok(response.into_text())
    }

    /// PUT to `address` with settings built by `configure`
    ///
    /// # Errors
    /// Returns the configurator's error, or see [`execute`](Self::execute).
    pub async fn put_with<F>(&self, address: &str, configure: F) -> Result<String, HttpError>
    where
        F: FnOnce(&mut RequestSettings) -> Result<(), HttpError>,
    {
        let settings = configured(configure)?;
        self.put(address, &settings).await
    }

    /// PATCH `address` and return the body bytes
    ///
    /// The request body is attached only when non-empty.
    ///
    /// # Errors
    /// See [`execute`](Self::execute).
    pub async fn patch_as_bytes(
        &self,
        address: &str,
        settings: &RequestSettings,
    ) -> Result<Bytes, HttpError> {
        let response = self
            .dispatch(Method::PATCH, address, settings, BodyPolicy::IfNonEmpty)
            .await?;
        Ok(response.into_bytes())
    }

    /// PATCH `address` and return the body as text
    ///
    /// # Errors
    /// See [`execute`](Self::execute).
    pub async fn patch(
        &self,
        address: &str,
        settings: &RequestSettings,
    ) -> Result<String, HttpError> {
        let response = self
            .dispatch(Method::PATCH, address, settings, BodyPolicy::IfNonEmpty)
            .await?;
        Ok(response.into_text())
    }

    /// PATCH `address` with settings built by `configure`
    ///
    /// # Errors
    /// Returns the configurator's error, or see [`execute`](Self::execute).
    pub async fn patch_with<F>(&self, address: &str, configure: F) -> Result<String, HttpError>
    where
        F: FnOnce(&mut RequestSettings) -> Result<(), HttpError>,
    {
        let settings = configured(configure)?;
        self.patch(address, &settings).await
    }

    /// DELETE `address`, discarding the response body
    ///
    /// # Errors
    /// See [`execute`](Self::execute).
    pub async fn delete(&self, address: &str, settings: &RequestSettings) -> Result<(), HttpError> {
        self.dispatch(Method::DELETE, address, settings, BodyPolicy::Omit)
            .await?;
        Ok(())
    }

    /// DELETE `address` with settings built by `configure`
    ///
    /// # Errors
    /// Returns the configurator's error, or see [`execute`](Self::execute).
    pub async fn delete_with<F>(&self, address: &str, configure: F) -> Result<(), HttpError>
    where
        F: FnOnce(&mut RequestSettings) -> Result<(), HttpError>,
    {
        let settings = configured(configure)?;
        self.delete(address, &settings).await
    }

    /// Send a request with an arbitrary method token and return the body bytes
    ///
    /// The request body is attached only when non-empty.
    ///
    /// # Errors
    /// Returns `HttpError::MissingParameter` for a blank method and
    /// `HttpError::InvalidMethod` for an invalid one, or see [`execute`](Self::execute).
    pub async fn send_as_bytes(
        &self,
        address: &str,
        method: &str,
        settings: &RequestSettings,
    ) -> Result<Bytes, HttpError> {
        let method = parse_method(method)?;
        let response = self
            .dispatch(method, address, settings, BodyPolicy::IfNonEmpty)
            .await?;
        Ok(response.into_bytes())
    }

    /// Send a request with an arbitrary method token and return the body as text
    ///
    /// # Errors
    /// See [`send_as_bytes`](Self::send_as_bytes).
    pub async fn send(
        &self,
        address: &str,
        method: &str,
        settings: &RequestSettings,
    ) -> Result<String, HttpError> {
        let method = parse_method(method)?;
        let response = self
            .dispatch(method, address, settings, BodyPolicy::IfNonEmpty)
            .await?;
        Ok(response.into_text())
    }

    /// Send a request with an arbitrary method token and settings built by `configure`
    ///
    /// # Errors
    /// Returns the configurator's error, or see [`send_as_bytes`](Self::send_as_bytes).
    pub async fn send_with<F>(
        &self,
        address: &str,
        method: &str,
        configure: F,
    ) -> Result<String, HttpError>
    where
        F: FnOnce(&mut RequestSettings) -> Result<(), HttpError>,
    {
        let settings = configured(configure)?;
        self.send(address, method, &settings).await
    }

    async fn dispatch(
        &self,
        method: Method,
        address: &str,
        settings: &RequestSettings,
        body: BodyPolicy,
    ) -> Result<HttpResponse, HttpError> {
        let uri = validate_address(address, self.transport_security)?;

        let mut request = TransportRequest::new(method, uri);
        request.body = body.select(settings);
        request
            .client_certificates
            .clone_from(&settings.client_certificates);
        request.use_default_credentials = settings.use_default_credentials;

        self.exchange(request, settings).await
    }

    /// Run `request` through the per-call layer stack.
    async fn exchange(
        &self,
        request: TransportRequest,
        settings: &RequestSettings,
    ) -> Result<HttpResponse, HttpError> {
        let timeout = settings.timeout.unwrap_or(self.default_timeout);
        let interceptor = InterceptorLayer::new(
            InterceptPolicy::from_settings(settings),
            Arc::clone(&self.event_log),
        );

        // Request flow (outer → inner):
        //   Interceptor → UserAgent → ErrorMapping → Timeout → transport
        let service = ServiceBuilder::new()
            .layer(interceptor)
            .layer(self.user_agent.clone())
            .map_err(move |err: BoxError| map_tower_error(err, timeout))
            .layer(TimeoutLayer::new(timeout))
            .service(self.transport.clone());

        service.oneshot(request).await
    }
}

fn configured<F>(configure: F) -> Result<RequestSettings, HttpError>
where
    F: FnOnce(&mut RequestSettings) -> Result<(), HttpError>,
{
    let mut settings = RequestSettings::new();
    configure(&mut settings)?;
    Ok(settings)
}

/// Map tower errors to `HttpError` with the actual timeout duration
///
/// Errors raised by the transport itself come back boxed and are unwrapped
/// to their original `HttpError`.
fn map_tower_error(err: BoxError, timeout: Duration) -> HttpError {
    if err.is::<tower::timeout::error::Elapsed>() {
        return HttpError::Timeout(timeout);
    }

    match err.downcast::<HttpError>() {
        Ok(http_err) => *http_err,
        Err(other) => HttpError::Transport(other),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::DEFAULT_USER_AGENT;
    use crate::event_log::HttpEventKind;
    use http::header::{CONTENT_TYPE, COOKIE, USER_AGENT};
    use http::{HeaderMap, StatusCode};
    use httpmock::prelude::{Method as MockMethod, MockServer};
    use std::sync::Mutex;

    type Seen = Arc<Mutex<Vec<TransportRequest>>>;

    #[derive(Default)]
    struct RecordingLog {
        events: Mutex<Vec<(String, HttpEventKind, String, Vec<u8>)>>,
    }

    impl HttpEventLog for RecordingLog {
        fn log(&self, correlation_id: &str, kind: HttpEventKind, summary: &str, payload: &[u8]) {
            self.events.lock().unwrap().push((
                correlation_id.to_owned(),
                kind,
                summary.to_owned(),
                payload.to_vec(),
            ));
        }
    }

    /// Pipeline over a transport that records requests and answers with a fixed response.
    fn recording_pipeline(
        status: StatusCode,
        body: Option<&'static str>,
        log: Arc<RecordingLog>,
    ) -> (HttpPipeline, Seen) {
        let seen: Seen = Arc::default();
        let seen_inner = Arc::clone(&seen);
        let transport = tower::service_fn(move |req: TransportRequest| {
            seen_inner.lock().unwrap().push(req);
            async move {
                Ok::<_, HttpError>(HttpResponse::new(
                    status,
                    HeaderMap::new(),
                    body.map(|b| Bytes::from_static(b.as_bytes())),
                ))
            }
        });
        let pipeline = HttpPipeline::builder()
            .event_log(log)
            .build_with_transport(transport)
            .unwrap();
        (pipeline, seen)
    }

    fn ok_pipeline() -> (HttpPipeline, Seen) {
        recording_pipeline(StatusCode::OK, Some("ok"), Arc::default())
    }

    #[test]
    fn test_pipeline_is_send_sync_clone() {
        fn assert_traits<T: Send + Sync + Clone>() {}
        assert_traits::<HttpPipeline>();
    }

    #[test]
    fn test_map_tower_error_preserves_http_error() {
        let boxed: BoxError = Box::new(HttpError::BodyTooLarge { limit: 10 });
        let result = map_tower_error(boxed, Duration::from_secs(30));
        assert!(matches!(result, HttpError::BodyTooLarge { limit: 10 }));
    }

    #[test]
    fn test_map_tower_error_maps_elapsed_to_timeout() {
        let boxed: BoxError = Box::new(tower::timeout::error::Elapsed::new());
        let result = map_tower_error(boxed, Duration::from_secs(7));
        assert!(matches!(result, HttpError::Timeout(d) if d == Duration::from_secs(7)));
    }

    #[test]
    fn test_map_tower_error_wraps_unknown_as_transport() {
        let boxed: BoxError = Box::new(std::io::Error::other("connection refused"));
        let result = map_tower_error(boxed, Duration::from_secs(30));
        assert!(matches!(result, HttpError::Transport(_)));
    }

    #[test]
    fn test_body_policy_select() {
        let empty = RequestSettings::new();
        assert_eq!(BodyPolicy::Omit.select(&empty), None);
        assert_eq!(BodyPolicy::Always.select(&empty), Some(Bytes::new()));
        assert_eq!(BodyPolicy::IfNonEmpty.select(&empty), None);

        let mut with_body = RequestSettings::new();
        with_body.set_request_body("data").unwrap();
        assert_eq!(BodyPolicy::Omit.select(&with_body), None);
        assert_eq!(
            BodyPolicy::IfNonEmpty.select(&with_body),
            Some(Bytes::from_static(b"data"))
        );
    }

    #[tokio::test]
    async fn test_blank_address_fails_before_send() {
        let (pipeline, seen) = ok_pipeline();
        let err = pipeline
            .get("  ", &RequestSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::MissingParameter { name: "address" }));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_validates_method() {
        let (pipeline, seen) = ok_pipeline();
        let settings = RequestSettings::default();

        let err = pipeline
            .send("https://example.com/", "", &settings)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HttpError::MissingParameter {
                name: "http_method"
            }
        ));

        let err = pipeline
            .send("https://example.com/", "NOT VALID", &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::InvalidMethod(_)));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_drops_body_and_content_headers() {
        let (pipeline, seen) = ok_pipeline();
        let mut settings = RequestSettings::new();
        settings.set_json_request_body(&serde_json::json!({"a": 1})).unwrap();

        let text = pipeline.get("https://example.com/", &settings).await.unwrap();
        assert_eq!(text, "ok");

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].method, Method::GET);
        assert!(seen[0].body.is_none());
        let built = seen[0].clone().into_http_request().unwrap();
        assert!(built.headers().get(CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn test_body_rules_per_verb() {
        let (pipeline, seen) = ok_pipeline();
        let empty = RequestSettings::default();
        let address = "https://example.com/r";

        pipeline.post(address, &empty).await.unwrap();
        pipeline.put(address, &empty).await.unwrap();
        pipeline.patch(address, &empty).await.unwrap();
        pipeline.send(address, "OPTIONS", &empty).await.unwrap();
        pipeline.delete(address, &empty).await.unwrap();

        let seen = seen.lock().unwrap();
        let bodies: Vec<_> = seen.iter().map(|r| (r.method.clone(), r.body.clone())).collect();
        assert_eq!(
            bodies,
            vec![
                (Method::POST, Some(Bytes::new())),
                (Method::PUT, Some(Bytes::new())),
                (Method::PATCH, None),
                (Method::OPTIONS, None),
                (Method::DELETE, None),
            ]
        );
    }

    #[tokio::test]
    async fn test_patch_sends_non_empty_body() {
        let (pipeline, seen) = ok_pipeline();
        pipeline
            .patch_with("https://example.com/r", |s| {
                s.set_request_body("{\"op\":\"replace\"}")?
                    .set_content_type("application/json-patch+json")?;
                Ok(())
            })
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            seen[0].body.as_deref(),
            Some(b"{\"op\":\"replace\"}".as_slice())
        );
        assert_eq!(
            seen[0].content_headers[CONTENT_TYPE],
            "application/json-patch+json"
        );
    }

    #[tokio::test]
    async fn test_cookies_and_user_agent_reach_transport() {
        let (pipeline, seen) = ok_pipeline();
        pipeline
            .get_with("https://example.com/", |s| {
                s.append_cookie("a", "1")?.append_cookie("b", "2")?;
                Ok(())
            })
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].headers[COOKIE], "a=1;b=2");
        assert_eq!(seen[0].headers[USER_AGENT], DEFAULT_USER_AGENT);
    }

    #[tokio::test]
    async fn test_configurator_error_aborts_call() {
        let (pipeline, seen) = ok_pipeline();
        let err = pipeline
            .post_with("https://example.com/", |s| {
                s.set_accept(" ")?;
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, HttpError::MissingParameter { .. }));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_not_found_returns_body_without_status_check() {
        let (pipeline, _) = recording_pipeline(StatusCode::NOT_FOUND, Some("gone"), Arc::default());
        let text = pipeline
            .get("https://example.com/", &RequestSettings::default())
            .await
            .unwrap();
        assert_eq!(text, "gone");
    }

    #[tokio::test]
    async fn test_not_found_with_ensure_and_throw_fails() {
        let log = Arc::new(RecordingLog::default());
        let (pipeline, _) = recording_pipeline(StatusCode::NOT_FOUND, Some("gone"), log.clone());
        let err = pipeline
            .get_with("https://example.com/missing", |s| {
                s.ensure_success_status_code(true)?;
                Ok(())
            })
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        let events = log.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1].3,
            format!("Not Found (404)\r\n{}\r\ngone", "=".repeat(70)).into_bytes()
        );
    }

    #[tokio::test]
    async fn test_not_found_with_ensure_without_throw_succeeds() {
        let (pipeline, _) = recording_pipeline(StatusCode::NOT_FOUND, Some("gone"), Arc::default());
        let bytes = pipeline
            .get_as_bytes("https://example.com/missing", &{
                let mut s = RequestSettings::new();
                s.ensure_success_status_code(false).unwrap();
                s
            })
            .await
            .unwrap();
        assert_eq!(bytes, Bytes::from_static(b"gone"));
    }

    #[tokio::test]
    async fn test_events_share_correlation_id_and_summary() {
        let log = Arc::new(RecordingLog::default());
        let (pipeline, _) = recording_pipeline(StatusCode::OK, Some("pong"), log.clone());
        pipeline
            .post_with("https://example.com/ping", |s| {
                s.set_request_body("ping")?;
                Ok(())
            })
            .await
            .unwrap();

        let events = log.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, events[1].0);
        assert_eq!(events[0].2, "POST https://example.com/ping");
        assert_eq!(events[0].3.as_slice(), b"ping");
        assert_eq!(events[1].3.as_slice(), b"pong");
    }

    #[tokio::test]
    async fn test_suppressed_logging_emits_nothing() {
        let log = Arc::new(RecordingLog::default());
        let (pipeline, _) = recording_pipeline(StatusCode::OK, Some("pong"), log.clone());
        pipeline
            .get_with("https://example.com/", |s| {
                s.suppress_logging()?;
                Ok(())
            })
            .await
            .unwrap();
        assert!(log.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_from_settings() {
        let transport = tower::service_fn(|_req: TransportRequest| async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok::<_, HttpError>(HttpResponse::new(StatusCode::OK, HeaderMap::new(), None))
        });
        let pipeline = HttpPipeline::builder()
            .build_with_transport(transport)
            .unwrap();

        let err = pipeline
            .get_with("https://example.com/slow", |s| {
                s.set_timeout(Duration::from_millis(20))?;
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(matches!(err, HttpError::Timeout(d) if d == Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn test_timeout_from_pipeline_default() {
        let transport = tower::service_fn(|_req: TransportRequest| async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok::<_, HttpError>(HttpResponse::new(StatusCode::OK, HeaderMap::new(), None))
        });
        let pipeline = HttpPipeline::builder()
            .timeout(Duration::from_millis(20))
            .build_with_transport(transport)
            .unwrap();

        let err = pipeline
            .delete("https://example.com/slow", &RequestSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Timeout(d) if d == Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let transport = tower::service_fn(|_req: TransportRequest| async {
            Err::<HttpResponse, _>(HttpError::Transport("connection reset".into()))
        });
        let pipeline = HttpPipeline::builder()
            .build_with_transport(transport)
            .unwrap();

        let err = pipeline
            .get("https://example.com/", &RequestSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Transport(_)));
    }

    #[tokio::test]
    async fn test_http_address_accepted_by_default() {
        let (pipeline, seen) = ok_pipeline();
        let text = pipeline
            .get("http://example.com/", &RequestSettings::default())
            .await
            .unwrap();
        assert_eq!(text, "ok");
        assert_eq!(seen.lock().unwrap()[0].uri.scheme_str(), Some("http"));
    }

    #[tokio::test]
    async fn test_tls_only_rejects_http_address() {
        let seen: Seen = Arc::default();
        let seen_inner = Arc::clone(&seen);
        let transport = tower::service_fn(move |req: TransportRequest| {
            seen_inner.lock().unwrap().push(req);
            async { Ok::<_, HttpError>(HttpResponse::new(StatusCode::OK, HeaderMap::new(), None)) }
        });
        let pipeline = HttpPipeline::builder()
            .https_only()
            .build_with_transport(transport)
            .unwrap();

        let err = pipeline
            .get("http://example.com/", &RequestSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::InvalidScheme { .. }));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_request_uses_default_settings() {
        let (pipeline, seen) = ok_pipeline();
        let mut request =
            TransportRequest::new(Method::PUT, "https://example.com/raw".parse().unwrap());
        request.body = Some(Bytes::from_static(b"raw"));

        let response = pipeline.send_request(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].method, Method::PUT);
        assert_eq!(seen[0].body.as_deref(), Some(b"raw".as_slice()));
    }

    // End-to-end against a mock server over the hyper transport

    fn live_pipeline() -> HttpPipeline {
        HttpPipeline::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_e2e_get_text() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(MockMethod::GET)
                .path("/greeting")
                .header("accept", "text/plain")
                .header("cookie", "session=abc");
            then.status(200).body("hello");
        });

        let text = live_pipeline()
            .get_with(&server.url("/greeting"), |s| {
                s.set_accept("text/plain")?.append_cookie("session", "abc")?;
                Ok(())
            })
            .await
            .unwrap();

        mock.assert();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn test_e2e_post_json() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(MockMethod::POST)
                .path("/users")
                .header("content-type", "application/json")
                .json_body(serde_json::json!({"name": "Alice"}));
            then.status(201).body("{\"id\":1}");
        });

        let text = live_pipeline()
            .post_with(&server.url("/users"), |s| {
                s.set_json_request_body(&serde_json::json!({"name": "Alice"}))?;
                Ok(())
            })
            .await
            .unwrap();

        mock.assert();
        assert_eq!(text, "{\"id\":1}");
    }

    #[tokio::test]
    async fn test_e2e_put_form() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(MockMethod::PUT)
                .path("/form")
                .header("content-type", "application/x-www-form-urlencoded")
                .body("a=1&b=two+words");
            then.status(200).body("stored");
        });

        let bytes = live_pipeline()
            .put_as_bytes(&server.url("/form"), &{
                let mut s = RequestSettings::new();
                s.set_form_url_encoded_request_body([("a", "1"), ("b", "two words")])
                    .unwrap();
                s
            })
            .await
            .unwrap();

        mock.assert();
        assert_eq!(bytes, Bytes::from_static(b"stored"));
    }

    #[tokio::test]
    async fn test_e2e_delete_and_status_failure() {
        let server = MockServer::start();
        let deleted = server.mock(|when, then| {
            when.method(MockMethod::DELETE).path("/item/1");
            then.status(204);
        });
        let _failing = server.mock(|when, then| {
            when.method(MockMethod::DELETE).path("/item/2");
            then.status(500).body("boom");
        });

        let pipeline = live_pipeline();
        pipeline
            .delete(&server.url("/item/1"), &RequestSettings::default())
            .await
            .unwrap();
        deleted.assert();

        let err = pipeline
            .delete_with(&server.url("/item/2"), |s| {
                s.ensure_success_status_code(true)?;
                Ok(())
            })
            .await
            .unwrap_err();
        match err {
            HttpError::HttpStatus {
                status,
                body_preview,
                ..
            } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body_preview, "boom");
            }
            other => panic!("expected HttpStatus, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_e2e_execute_returns_full_response() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(MockMethod::GET).path("/meta");
            then.status(202).header("x-request-id", "r-1").body("queued");
        });

        let response = live_pipeline()
            .execute(Method::GET, &server.url("/meta"), &RequestSettings::default())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.reason(), "Accepted");
        assert_eq!(response.headers()["x-request-id"], "r-1");
        assert_eq!(response.into_text(), "queued");
    }
}
