use crate::client::HttpPipeline;
use crate::config::{HttpPipelineConfig, RedirectConfig, TlsRootConfig, TransportSecurity};
use crate::error::HttpError;
use crate::event_log::{HttpEventLog, TracingEventLog};
use crate::layers::UserAgentLayer;
use crate::request::TransportRequest;
use crate::response::HttpResponse;
use crate::transport::HyperTransport;
use std::sync::Arc;
use std::time::Duration;
use tower::Service;
use tower::util::BoxCloneSyncService;

/// Type-erased transport at the bottom of every per-request stack.
pub type BoxedTransport = BoxCloneSyncService<TransportRequest, HttpResponse, HttpError>;

/// Builder for constructing an [`HttpPipeline`].
///
/// The builder fixes what is shared by every request (transport, TLS roots,
/// redirect policy, user agent, event sink). Everything that varies per
/// request lives in [`RequestSettings`](crate::RequestSettings).
pub struct HttpPipelineBuilder {
    config: HttpPipelineConfig,
    event_log: Option<Arc<dyn HttpEventLog>>,
}

impl HttpPipelineBuilder {
    /// Create a new builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: HttpPipelineConfig::default(),
            event_log: None,
        }
    }

    /// Create a builder with a specific configuration
    #[must_use]
    pub fn with_config(config: HttpPipelineConfig) -> Self {
        Self {
            config,
            event_log: None,
        }
    }

    /// Set the user agent product token
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the timeout applied when a request does not set its own
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    /// Set the maximum buffered response body size
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// Set which URI schemes the pipeline accepts
    #[must_use]
    pub fn transport(mut self, transport: TransportSecurity) -> Self {
        self.config.transport = transport;
        self
    }

    /// Reject `http://` addresses with `HttpError::InvalidScheme`
    ///
    /// Equivalent to `.transport(TransportSecurity::TlsOnly)`.
    #[must_use]
    pub fn https_only(mut self) -> Self {
        self.config.transport = TransportSecurity::TlsOnly;
        self
    }

    /// Set the trust anchors used to verify servers
    #[must_use]
    pub fn tls_roots(mut self, tls_roots: TlsRootConfig) -> Self {
        self.config.tls_roots = tls_roots;
        self
    }

    /// Set the redirect policy configuration
    #[must_use]
    pub fn redirect(mut self, config: RedirectConfig) -> Self {
        self.config.redirect = config;
        self
    }

    /// Disable redirect following; 3xx responses are returned as-is
    #[must_use]
    pub fn no_redirects(mut self) -> Self {
        self.config.redirect = RedirectConfig::disabled();
        self
    }

    /// Set the maximum number of redirects to follow
    #[must_use]
    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.config.redirect.max_redirects = max_redirects;
        self
    }

    /// Send request/response events to `event_log` instead of `tracing`
    #[must_use]
    pub fn event_log(mut self, event_log: Arc<dyn HttpEventLog>) -> Self {
        self.event_log = Some(event_log);
        self
    }

    /// Build the pipeline over the default hyper transport
    ///
    /// # Errors
    /// Returns `HttpError::InvalidHeaderValue` for an unusable user agent and
    /// `HttpError::Tls` if the TLS configuration cannot be built.
    pub fn build(self) -> Result<HttpPipeline, HttpError> {
        let transport = HyperTransport::new(&self.config)?;
        self.build_with_transport(transport)
    }

    /// Build the pipeline over a caller-supplied transport
    ///
    /// The transport receives fully intercepted requests and must perform
    /// exactly one exchange per call. Redirects, TLS and body limits are the
    /// transport's business; the pipeline still applies timeouts, user agent,
    /// interception and event logging around it.
    ///
    /// # Errors
    /// Returns `HttpError::InvalidHeaderValue` if the user agent is not a valid header value.
    pub fn build_with_transport<S>(self, transport: S) -> Result<HttpPipeline, HttpError>
    where
        S: Service<TransportRequest, Response = HttpResponse, Error = HttpError>
            + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        let user_agent = UserAgentLayer::try_new(&self.config.user_agent)?;
        let event_log = self
            .event_log
            .unwrap_or_else(|| Arc::new(TracingEventLog::new()));

        Ok(HttpPipeline {
            transport: BoxCloneSyncService::new(transport),
            event_log,
            user_agent,
            default_timeout: self.config.default_timeout,
            transport_security: self.config.transport,
        })
    }
}

impl Default for HttpPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
