use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Default User-Agent product token added to every request
pub const DEFAULT_USER_AGENT: &str = concat!("cf-http-pipeline/", env!("CARGO_PKG_VERSION"));

/// Timeout applied when the request settings do not carry one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(100);

/// Default maximum response body size (10 MiB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Default redirect hop limit
pub const DEFAULT_MAX_REDIRECTS: usize = 50;

/// Redirect following
///
/// Redirects are followed to any host up to `max_redirects` hops. Credentials
/// (`Authorization`, `Cookie`, `Proxy-Authorization`) are dropped once the
/// chain leaves the origin of the first request, and an `https` hop never
/// continues over plain `http`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RedirectConfig {
    /// Maximum number of redirects to follow (default: 50)
    ///
    /// `0` disables following; 3xx responses are returned to the caller as-is.
    pub max_redirects: usize,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl RedirectConfig {
    /// Do not follow redirects
    #[must_use]
    pub fn disabled() -> Self {
        Self { max_redirects: 0 }
    }
}

/// TLS root certificate configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum TlsRootConfig {
    /// Use Mozilla's root certificates (webpki-roots, no OS dependency)
    #[default]
    WebPki,
    /// Use OS native root certificate store
    Native,
}

/// Which URI schemes the pipeline accepts
///
/// Both `http` and `https` addresses are accepted by default. `TlsOnly`
/// rejects `http://` addresses with `HttpError::InvalidScheme` before any
/// connection is made.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum TransportSecurity {
    /// Accept `http` and `https` addresses
    #[default]
    AllowHttp,
    /// Accept `https` addresses only
    TlsOnly,
}

/// Overall pipeline configuration
///
/// Deserializable so hosts can embed it in their own configuration files.
/// Durations are written as humantime strings (`"30s"`, `"1m 30s"`).
///
/// ```rust,ignore
/// let config: HttpPipelineConfig = serde_json::from_str(r#"{
///     "user_agent": "deploy-tool/2.1",
///     "default_timeout": "30s",
///     "transport": "tls_only"
/// }"#)?;
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpPipelineConfig {
    /// User-Agent product token (default: `cf-http-pipeline/<version>`)
    pub user_agent: String,

    /// Timeout for one exchange when the request settings do not set one (default: 100s)
    #[serde(deserialize_with = "deserialize_duration")]
    pub default_timeout: Duration,

    /// Maximum response body size in bytes (default: 10 MiB)
    pub max_body_size: usize,

    /// Accepted schemes (default: `AllowHttp`)
    pub transport: TransportSecurity,

    /// TLS root certificate source (default: `WebPki`)
    pub tls_roots: TlsRootConfig,

    /// Redirect policy
    pub redirect: RedirectConfig,
}

impl Default for HttpPipelineConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            default_timeout: DEFAULT_TIMEOUT,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            transport: TransportSecurity::AllowHttp,
            tls_roots: TlsRootConfig::WebPki,
            redirect: RedirectConfig::default(),
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpPipelineConfig::default();
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.default_timeout, Duration::from_secs(100));
        assert_eq!(config.max_body_size, 10 * 1024 * 1024);
        assert_eq!(config.transport, TransportSecurity::AllowHttp);
        assert_eq!(config.tls_roots, TlsRootConfig::WebPki);
        assert_eq!(config.redirect.max_redirects, 50);
    }

    #[test]
    fn test_default_user_agent_has_version() {
        assert!(DEFAULT_USER_AGENT.starts_with("cf-http-pipeline/"));
        assert!(DEFAULT_USER_AGENT.len() > "cf-http-pipeline/".len());
    }

    #[test]
    fn test_redirect_defaults() {
        assert_eq!(RedirectConfig::default().max_redirects, DEFAULT_MAX_REDIRECTS);
        assert_eq!(RedirectConfig::disabled().max_redirects, 0);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: HttpPipelineConfig = serde_json::from_str(
            r#"{
                "user_agent": "deploy-tool/2.1",
                "default_timeout": "1m 30s",
                "transport": "tls_only",
                "tls_roots": "native",
                "redirect": { "max_redirects": 3 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.user_agent, "deploy-tool/2.1");
        assert_eq!(config.default_timeout, Duration::from_secs(90));
        assert_eq!(config.transport, TransportSecurity::TlsOnly);
        assert_eq!(config.tls_roots, TlsRootConfig::Native);
        assert_eq!(config.redirect.max_redirects, 3);
        // Unspecified fields keep their defaults
        assert_eq!(config.max_body_size, DEFAULT_MAX_BODY_SIZE);
    }

    #[test]
    fn test_deserialize_empty_object_is_default() {
        let config: HttpPipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.default_timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.transport, TransportSecurity::AllowHttp);
    }

    #[test]
    fn test_deserialize_rejects_bad_duration() {
        let result: Result<HttpPipelineConfig, _> =
            serde_json::from_str(r#"{ "default_timeout": "soon" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_rejects_unknown_fields() {
        let result: Result<HttpPipelineConfig, _> =
            serde_json::from_str(r#"{ "retries": 3 }"#);
        assert!(result.is_err());

        let result: Result<HttpPipelineConfig, _> =
            serde_json::from_str(r#"{ "redirect": { "same_origin_only": true } }"#);
        assert!(result.is_err());
    }
}
