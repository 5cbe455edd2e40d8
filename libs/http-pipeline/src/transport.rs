//! Default hyper-based transport.
//!
//! [`HyperTransport`] performs exactly one exchange per call: it converts a
//! [`TransportRequest`] into a hyper request, follows redirects under
//! [`RedirectGuard`], and buffers the response body up to the
//! configured size limit. It never retries.

use crate::config::{HttpPipelineConfig, RedirectConfig, TlsRootConfig, TransportSecurity};
use crate::error::HttpError;
use crate::layers::RedirectGuard;
use crate::request::TransportRequest;
use crate::response::HttpResponse;
use crate::settings::ClientCertificate;
use crate::tls;
use bytes::Bytes;
use http::{Method, Response, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Service, ServiceBuilder, ServiceExt};
use tower_http::follow_redirect::FollowRedirectLayer;

type HyperClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// hyper-util client over a rustls connector, speaking HTTP/1.1
///
/// Cloning is cheap and clones share the connection pool. Requests that
/// carry client certificates get a dedicated connector for that exchange.
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient,
    tls_roots: TlsRootConfig,
    security: TransportSecurity,
    redirect: RedirectConfig,
    max_body_size: usize,
}

impl HyperTransport {
    /// Create a transport from the pipeline configuration
    ///
    /// # Errors
    /// Returns `HttpError::Tls` if the TLS configuration cannot be built,
    /// e.g. `TlsRootConfig::Native` with an empty OS certificate store.
    pub fn new(config: &HttpPipelineConfig) -> Result<Self, HttpError> {
        let client = build_client(config.tls_roots, config.transport, &[])?;
        Ok(Self {
            client,
            tls_roots: config.tls_roots,
            security: config.transport,
            redirect: config.redirect.clone(),
            max_body_size: config.max_body_size,
        })
    }

    async fn execute(self, request: TransportRequest) -> Result<HttpResponse, HttpError> {
        if request.use_default_credentials {
            tracing::debug!(
                uri = %request.uri,
                "default credentials requested; no ambient credential source is available, ignoring"
            );
        }

        let client = if request.client_certificates.is_empty() {
            self.client
        } else {
            build_client(self.tls_roots, self.security, &request.client_certificates)?
        };

        let is_head = request.method == Method::HEAD;
        let http_request = request.into_http_request()?;

        let service = ServiceBuilder::new()
            .layer(FollowRedirectLayer::with_policy(RedirectGuard::new(&self.redirect)))
            .service(client);

        let response = service
            .oneshot(http_request)
            .await
            .map_err(map_client_error)?;

        read_response(response, self.max_body_size, is_head).await
    }
}

impl Service<TransportRequest> for HyperTransport {
    type Response = HttpResponse;
    type Error = HttpError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: TransportRequest) -> Self::Future {
        let transport = self.clone();
        Box::pin(transport.execute(request))
    }
}

/// Build the hyper client with an HTTP/1.1 rustls connector.
fn build_client(
    tls_roots: TlsRootConfig,
    security: TransportSecurity,
    certificates: &[ClientCertificate],
) -> Result<HyperClient, HttpError> {
    let tls_config = tls::client_config(tls_roots, certificates)?;
    let builder = hyper_rustls::HttpsConnectorBuilder::new().with_tls_config(tls_config);
    let https = match security {
        TransportSecurity::TlsOnly => builder.https_only().enable_http1().build(),
        TransportSecurity::AllowHttp => builder.https_or_http().enable_http1().build(),
    };

    let mut client_builder = Client::builder(TokioExecutor::new());
    // pool_timer is required for idle connections to expire
    client_builder.pool_timer(TokioTimer::new());
    Ok(client_builder.build::<_, Full<Bytes>>(https))
}

/// Buffer the response body within `limit` and wrap it in an [`HttpResponse`].
async fn read_response(
    response: Response<Incoming>,
    limit: usize,
    is_head: bool,
) -> Result<HttpResponse, HttpError> {
    let (parts, body) = response.into_parts();

    let reason = parts
        .extensions
        .get::<hyper::ext::ReasonPhrase>()
        .map(|phrase| String::from_utf8_lossy(phrase.as_bytes()).into_owned());

    let bytes = Limited::new(body, limit)
        .collect()
        .await
        .map_err(|err| map_body_error(err, limit))?
        .to_bytes();

    let body = has_content(parts.status, is_head).then_some(bytes);
    let response = HttpResponse::new(parts.status, parts.headers, body);
    Ok(match reason {
        Some(reason) => response.with_reason(reason),
        None => response,
    })
}

fn has_content(status: StatusCode, is_head: bool) -> bool {
    !(is_head
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

fn map_body_error(err: Box<dyn std::error::Error + Send + Sync>, limit: usize) -> HttpError {
    if err.is::<LengthLimitError>() {
        HttpError::BodyTooLarge { limit }
    } else {
        HttpError::Transport(err)
    }
}

/// Classify client errors, surfacing TLS failures as `HttpError::Tls`.
fn map_client_error(err: hyper_util::client::legacy::Error) -> HttpError {
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        let io_inner = cause
            .downcast_ref::<std::io::Error>()
            .and_then(std::io::Error::get_ref);
        if cause.is::<rustls::Error>() || io_inner.is_some_and(|inner| inner.is::<rustls::Error>())
        {
            return HttpError::Tls(Box::new(err));
        }
        source = cause.source();
    }
    HttpError::from(err)
}
