//! Tower layers for the request pipeline
//!
//! ## Available Layers
//!
//! - [`InterceptorLayer`] - Applies per-request settings, logs the exchange and
//!   enforces the status policy
//! - [`UserAgentLayer`] - Adds the pipeline product token to the User-Agent header
//! - [`RedirectGuard`] - Redirect policy used by the default transport

mod interceptor;
mod redirect;
mod user_agent;

pub use interceptor::{InterceptPolicy, InterceptorLayer, InterceptorService, is_content_header};
pub use redirect::RedirectGuard;
pub use user_agent::{UserAgentLayer, UserAgentService};
