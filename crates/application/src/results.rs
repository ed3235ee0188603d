//! Execution result model
//!
//! One [`ExecutionResult`] exists for every attempted request,
//! successful or not; failures carry a kind and a message that names
//! the request and the subsystem that rejected it. Results are
//! write-once; aggregate counters are derived.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::dispatch::HttpResponse;
use crate::error::{PrepareError, TransportError};

/// Classification of a failed execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Variable resolution failed
    Variable,
    /// Auth configuration was invalid
    Auth,
    /// Body or URL encoding failed
    Body,
    /// The dispatch deadline elapsed
    Timeout,
    /// The remote refused the connection
    ConnectionRefused,
    /// DNS lookup failed
    DnsFailure,
    /// TLS negotiation failed
    TlsFailure,
    /// The redirect ceiling was hit
    TooManyRedirects,
    /// Any other transport-level rejection
    Protocol,
    /// The cancellation signal fired
    Cancelled,
    /// A hook failed under `strict_hooks`
    Hook,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Variable => "variable resolution",
            Self::Auth => "auth configuration",
            Self::Body => "body encoding",
            Self::Timeout => "timeout",
            Self::ConnectionRefused => "connection refused",
            Self::DnsFailure => "dns failure",
            Self::TlsFailure => "tls failure",
            Self::TooManyRedirects => "too many redirects",
            Self::Protocol => "protocol error",
            Self::Cancelled => "cancelled",
            Self::Hook => "hook failure",
        };
        f.write_str(name)
    }
}

impl From<&PrepareError> for FailureKind {
    fn from(error: &PrepareError) -> Self {
        match error {
            PrepareError::Variable(_) => Self::Variable,
            PrepareError::Auth(_) => Self::Auth,
            PrepareError::Body(_) => Self::Body,
        }
    }
}

impl From<&TransportError> for FailureKind {
    fn from(error: &TransportError) -> Self {
        match error {
            TransportError::Timeout { .. } => Self::Timeout,
            TransportError::ConnectionRefused { .. } => Self::ConnectionRefused,
            TransportError::DnsFailure { .. } => Self::DnsFailure,
            TransportError::TlsFailure(_) => Self::TlsFailure,
            TransportError::TooManyRedirects { .. } => Self::TooManyRedirects,
            TransportError::ProtocolError(_) => Self::Protocol,
            TransportError::Cancelled => Self::Cancelled,
        }
    }
}

/// The outcome of one request execution.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// The name of the request this result belongs to
    pub request_name: String,
    /// The response, when dispatch completed
    pub response: Option<HttpResponse>,
    /// Human-readable failure description
    pub error: Option<String>,
    /// Failure classification
    pub error_kind: Option<FailureKind>,
    /// Non-fatal notes: unresolved variables, ignored modifications,
    /// hook failures outside strict mode
    pub diagnostics: Vec<String>,
    /// Wall time for the whole execution including hooks
    pub duration: Duration,
    /// When execution began
    pub started_at: DateTime<Utc>,
}

impl ExecutionResult {
    /// Creates a successful result.
    #[must_use]
    pub fn ok(
        request_name: impl Into<String>,
        response: HttpResponse,
        diagnostics: Vec<String>,
        duration: Duration,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            request_name: request_name.into(),
            response: Some(response),
            error: None,
            error_kind: None,
            diagnostics,
            duration,
            started_at,
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failed(
        request_name: impl Into<String>,
        error: impl Into<String>,
        kind: FailureKind,
        diagnostics: Vec<String>,
        duration: Duration,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            request_name: request_name.into(),
            response: None,
            error: Some(error.into()),
            error_kind: Some(kind),
            diagnostics,
            duration,
            started_at,
        }
    }

    /// True when dispatch completed and nothing failed.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.error.is_none() && self.response.is_some()
    }

    /// The response status, when there is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success() {
            write!(
                f,
                "ok: {} ({}) - {}ms",
                self.request_name,
                self.status().unwrap_or_default(),
                self.duration.as_millis()
            )
        } else {
            write!(
                f,
                "failed: {} - {} - {}ms",
                self.request_name,
                self.error.as_deref().unwrap_or("unknown error"),
                self.duration.as_millis()
            )
        }
    }
}

/// Aggregate outcome of a folder or collection run.
#[derive(Debug, Clone, Default)]
pub struct CollectionExecutionResult {
    /// The collection or folder name
    pub name: String,
    /// Per-request results; tree pre-order in sequential mode,
    /// completion order in parallel mode
    pub results: Vec<ExecutionResult>,
    /// Wall time for the whole run
    pub total_time: Duration,
    /// True when `stop_on_error` or cancellation cut the run short
    pub stopped_early: bool,
}

impl CollectionExecutionResult {
    /// Creates an empty aggregate.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Number of attempted requests.
    #[must_use]
    pub fn total_requests(&self) -> usize {
        self.results.len()
    }

    /// Number of successes.
    #[must_use]
    pub fn successful(&self) -> usize {
        self.results.iter().filter(|r| r.success()).count()
    }

    /// Number of failures.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.total_requests() - self.successful()
    }

    /// True when every attempted request succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

impl fmt::Display for CollectionExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}': {}/{} requests successful - {}ms{}",
            self.name,
            self.successful(),
            self.total_requests(),
            self.total_time.as_millis(),
            if self.stopped_early { " (stopped early)" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ok(name: &str) -> ExecutionResult {
        ExecutionResult::ok(
            name,
            HttpResponse {
                status: 200,
                ..HttpResponse::default()
            },
            Vec::new(),
            Duration::from_millis(5),
            Utc::now(),
        )
    }

    fn failed(name: &str, kind: FailureKind) -> ExecutionResult {
        ExecutionResult::failed(
            name,
            "boom",
            kind,
            Vec::new(),
            Duration::from_millis(5),
            Utc::now(),
        )
    }

    #[test]
    fn test_success_requires_response_and_no_error() {
        assert!(ok("r").success());
        assert!(!failed("r", FailureKind::Protocol).success());
    }

    #[test]
    fn test_failure_always_has_kind_and_message() {
        let result = failed("r", FailureKind::ConnectionRefused);
        assert!(result.error_kind.is_some());
        assert!(result.error.is_some());
    }

    #[test]
    fn test_kind_mapping_from_errors() {
        let prepare: PrepareError = crate::error::BodyEncodingError::EmptyHost.into();
        assert_eq!(FailureKind::from(&prepare), FailureKind::Body);

        let transport = TransportError::Timeout { timeout_ms: 100 };
        assert_eq!(FailureKind::from(&transport), FailureKind::Timeout);

        assert_eq!(
            FailureKind::from(&TransportError::Cancelled),
            FailureKind::Cancelled
        );
    }

    #[test]
    fn test_aggregate_counters() {
        let mut aggregate = CollectionExecutionResult::new("Batch");
        aggregate.results.push(ok("a"));
        aggregate.results.push(failed("b", FailureKind::Timeout));
        aggregate.results.push(ok("c"));

        assert_eq!(aggregate.total_requests(), 3);
        assert_eq!(aggregate.successful(), 2);
        assert_eq!(aggregate.failed(), 1);
        assert!(!aggregate.all_succeeded());
    }

    #[test]
    fn test_empty_aggregate() {
        let aggregate = CollectionExecutionResult::new("Empty");
        assert_eq!(aggregate.total_requests(), 0);
        assert_eq!(aggregate.successful(), 0);
        assert!(aggregate.all_succeeded());
        assert!(!aggregate.stopped_early);
    }

    #[test]
    fn test_display_mentions_outcome() {
        assert!(ok("Ping").to_string().starts_with("ok: Ping (200)"));
        assert!(
            failed("Ping", FailureKind::Timeout)
                .to_string()
                .contains("boom")
        );
    }
}
