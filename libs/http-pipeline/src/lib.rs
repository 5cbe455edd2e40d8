#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Configurable HTTP request pipeline
//!
//! This crate turns `(address, settings)` into exactly one HTTP exchange:
//! - Declarative per-request [`RequestSettings`] with validated, chainable mutators
//!   (headers, cookies, authorization, JSON/form/multipart bodies, certificates)
//! - An interception layer that applies the settings, writes correlated
//!   request/response events to an [`HttpEventLog`], and enforces the
//!   success-status policy
//! - Verb helpers (GET/POST/PUT/PATCH/DELETE and arbitrary methods) returning
//!   raw bytes or UTF-8 text
//! - A hyper + rustls transport (HTTP/1.1, http and https, HTTPS-only on request) with
//!   secure redirect following and response size limits
//! - A blocking facade for synchronous callers
//!
//! There are no retries: each call is one exchange bounded by a timeout.
//!
//! # Example
//!
//! ```ignore
//! use http_pipeline::HttpPipeline;
//! use std::time::Duration;
//!
//! let pipeline = HttpPipeline::builder()
//!     .timeout(Duration::from_secs(10))
//!     .build()?;
//!
//! let users = pipeline
//!     .get_with("https://api.example.com/users", |s| {
//!         s.use_bearer_authorization(&token)?
//!             .set_accept("application/json")?
//!             .ensure_success_status_code(true)?;
//!         Ok(())
//!     })
//!     .await?;
//! ```

mod blocking;
mod body;
mod builder;
mod client;
mod config;
mod error;
mod event_log;
mod layers;
mod request;
mod response;
mod settings;
mod tls;
mod transport;

pub use blocking::BlockingHttpPipeline;
pub use body::{
    DEFAULT_FILE_FIELD, EncodedBody, FORM_CONTENT_TYPE, JSON_CONTENT_TYPE, MULTIPART_BOUNDARY,
    MultipartFile, encode_form_url_encoded, encode_json, encode_multipart, encode_text,
    multipart_content_type,
};
pub use builder::{BoxedTransport, HttpPipelineBuilder};
pub use client::HttpPipeline;
pub use config::{
    DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT,
    HttpPipelineConfig, RedirectConfig, TlsRootConfig, TransportSecurity,
};
pub use error::{HttpError, InvalidUriKind};
pub use event_log::{HttpEventKind, HttpEventLog, TracingEventLog};
pub use layers::{
    InterceptPolicy, InterceptorLayer, InterceptorService, RedirectGuard, UserAgentLayer,
    UserAgentService, is_content_header,
};
pub use request::{TransportRequest, parse_method, validate_address};
pub use response::{ERROR_BODY_PREVIEW_LIMIT, HttpResponse, decode_text};
pub use settings::{ClientCertificate, HeaderCollection, Iter as HeaderIter, RequestSettings};
pub use transport::HyperTransport;
