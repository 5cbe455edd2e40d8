//! Diagnostic request/response events.
//!
//! The interceptor reports each exchange as a pair of events sharing one
//! correlation id. Hosts plug their own sink in through [`HttpEventLog`];
//! the default sink forwards to `tracing`.

use std::fmt;

/// Which half of an exchange an event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpEventKind {
    /// Outgoing request
    Request,
    /// Received response
    Response,
}

impl HttpEventKind {
    /// Lowercase label used in log output
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
        }
    }
}

impl fmt::Display for HttpEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for request/response diagnostic events
///
/// Implementations must not fail and should not block for long: they are
/// called inline on the request path.
pub trait HttpEventLog: Send + Sync {
    /// Record one event
    ///
    /// `summary` is `"{METHOD} {uri}"`. `payload` is the request body for
    /// request events, and the response body or status diagnostic for
    /// response events.
    fn log(&self, correlation_id: &str, kind: HttpEventKind, summary: &str, payload: &[u8]);
}

/// Event log that emits `tracing` debug events on target `http_pipeline::events`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventLog;

impl TracingEventLog {
    /// Create the tracing-backed event log
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HttpEventLog for TracingEventLog {
    fn log(&self, correlation_id: &str, kind: HttpEventKind, summary: &str, payload: &[u8]) {
        tracing::debug!(
            target: "http_pipeline::events",
            correlation_id = %correlation_id,
            kind = %kind,
            summary = %summary,
            payload = %String::from_utf8_lossy(payload),
            "{correlation_id} - {kind}: {summary}"
        );
    }
}
