use crate::error::HttpError;
use crate::request::TransportRequest;
use http::HeaderValue;
use http::header::USER_AGENT;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Tower layer that adds the pipeline product token to the User-Agent header
///
/// A caller-supplied User-Agent is kept and the product token is prepended
/// to it (`"<product> <caller value>"`).
#[derive(Debug, Clone)]
pub struct UserAgentLayer {
    product: HeaderValue,
}

impl UserAgentLayer {
    /// Create a new `UserAgentLayer` with the specified product token
    ///
    /// # Errors
    /// Returns `HttpError::InvalidHeaderValue` if the product token is not a valid header value
    pub fn try_new(product: impl AsRef<str>) -> Result<Self, HttpError> {
        let product = HeaderValue::from_str(product.as_ref())?;
        Ok(Self { product })
    }

    /// The product token added to every request
    #[must_use]
    pub fn product(&self) -> &HeaderValue {
        &self.product
    }
}

impl<S> Layer<S> for UserAgentLayer {
    type Service = UserAgentService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        UserAgentService {
            inner,
            product: self.product.clone(),
        }
    }
}

/// Service that adds the product token to the User-Agent header
#[derive(Debug, Clone)]
pub struct UserAgentService<S> {
    inner: S,
    product: HeaderValue,
}

impl<S> UserAgentService<S> {
    fn user_agent_for(&self, existing: Option<&HeaderValue>) -> HeaderValue {
        let Some(existing) = existing.filter(|value| !value.is_empty()) else {
            return self.product.clone();
        };

        let mut combined = Vec::with_capacity(self.product.len() + 1 + existing.len());
        combined.extend_from_slice(self.product.as_bytes());
        combined.push(b' ');
        combined.extend_from_slice(existing.as_bytes());
        // Both halves are valid header values, so the concatenation is too
        HeaderValue::from_bytes(&combined).unwrap_or_else(|_| self.product.clone())
    }
}

impl<S> Service<TransportRequest> for UserAgentService<S>
where
    S: Service<TransportRequest>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: TransportRequest) -> Self::Future {
        let user_agent = self.user_agent_for(req.headers.get(USER_AGENT));
        req.headers.insert(USER_AGENT, user_agent);
        self.inner.call(req)
    }
}
