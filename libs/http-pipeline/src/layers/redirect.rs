//! Redirect handling for [`HyperTransport`](crate::HyperTransport).
//!
//! [`RedirectGuard`] is handed to `tower_http`'s `FollowRedirect` once per
//! exchange. It counts hops against [`RedirectConfig::max_redirects`], refuses
//! to continue an `https` chain over `http`, and drops credentials as soon as
//! the chain reaches a different origin than the first request.

use crate::config::RedirectConfig;
use http::header::{AUTHORIZATION, COOKIE, HeaderName, PROXY_AUTHORIZATION};
use http::{Request, Uri};
use tower_http::follow_redirect::policy::{Action, Attempt, Policy};

/// Credentials that must not follow a request to another origin
const CREDENTIAL_HEADERS: [HeaderName; 3] = [AUTHORIZATION, COOKIE, PROXY_AUTHORIZATION];

/// Scheme, host and effective port of a URI
#[derive(Debug, Clone, PartialEq, Eq)]
struct Origin {
    scheme: String,
    host: String,
    port: Option<u16>,
}

impl Origin {
    fn of(uri: &Uri) -> Self {
        let scheme = uri.scheme_str().unwrap_or("https").to_ascii_lowercase();
        let port = uri.port_u16().or(match scheme.as_str() {
            "https" => Some(443),
            "http" => Some(80),
            _ => None,
        });
        Self {
            host: uri.host().unwrap_or_default().to_ascii_lowercase(),
            scheme,
            port,
        }
    }

    fn is_tls(&self) -> bool {
        self.scheme == "https"
    }
}

/// Per-exchange redirect policy
#[derive(Debug, Clone)]
pub struct RedirectGuard {
    hops_left: usize,
    first_origin: Option<Origin>,
    left_first_origin: bool,
}

impl RedirectGuard {
    /// Start a fresh chain under `config`
    #[must_use]
    pub fn new(config: &RedirectConfig) -> Self {
        Self {
            hops_left: config.max_redirects,
            first_origin: None,
            left_first_origin: false,
        }
    }

    /// Decide whether the hop from `from` to `to` is followed.
    fn next_hop(&mut self, from: &Uri, to: &Uri) -> Action {
        let Some(hops_left) = self.hops_left.checked_sub(1) else {
            tracing::debug!(location = %to, "redirect limit reached, returning 3xx response");
            return Action::Stop;
        };
        self.hops_left = hops_left;

        let from = Origin::of(from);
        let to_origin = Origin::of(to);
        if from.is_tls() && !to_origin.is_tls() {
            tracing::warn!(location = %to, "refusing redirect from https to plain http");
            return Action::Stop;
        }

        let first = self.first_origin.get_or_insert(from);
        if *first != to_origin && !self.left_first_origin {
            tracing::debug!(
                location = %to,
                "redirect left the request origin, dropping credentials"
            );
            self.left_first_origin = true;
        }
        Action::Follow
    }
}

impl<B: Clone, E> Policy<B, E> for RedirectGuard {
    fn redirect(&mut self, attempt: &Attempt<'_>) -> Result<Action, E> {
        Ok(self.next_hop(attempt.previous(), attempt.location()))
    }

    fn on_request(&mut self, request: &mut Request<B>) {
        if self.left_first_origin {
            let headers = request.headers_mut();
            for name in &CREDENTIAL_HEADERS {
                headers.remove(name);
            }
        }
    }

    fn clone_body(&self, body: &B) -> Option<B> {
        Some(body.clone())
    }
}
