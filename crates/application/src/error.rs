//! Execution error taxonomy
//!
//! Every failure a request can hit is one of a small fixed set of
//! kinds. None of these unwind out of request execution; the executor
//! captures them into results. Only structural bugs panic.

use std::fmt;

use thiserror::Error;

use convoy_domain::AuthType;

/// Failure while resolving variable templates.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VariableResolutionError {
    /// A referenced variable exists in no scope (strict mode only).
    #[error("variable '{name}' is not defined in any scope")]
    Undefined {
        /// The unresolved reference name
        name: String,
    },

    /// A single key was substituted more times than the guard allows.
    #[error(
        "variable '{name}' was visited more than {limit} times; probable circular reference"
    )]
    CycleOrDepth {
        /// The key that tripped the guard
        name: String,
        /// The visit limit
        limit: u32,
    },
}

/// Failure rendering an auth declaration onto the wire.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthConfigError {
    /// A required parameter for the auth type is absent.
    #[error("{auth_type} auth requires parameter '{param}'")]
    MissingParam {
        /// The auth type being applied
        auth_type: AuthType,
        /// The missing parameter name
        param: &'static str,
    },

    /// The auth type cannot be rendered by this core.
    #[error("auth type '{0}' is not supported")]
    UnsupportedType(AuthType),

    /// An oauth1 signature method outside HMAC-SHA1 / PLAINTEXT.
    #[error("oauth1 signature method '{0}' is not supported")]
    UnsupportedSignatureMethod(String),

    /// A placement parameter had a value outside its enumeration.
    #[error("invalid value '{value}' for {auth_type} parameter '{param}'")]
    InvalidParam {
        /// The auth type being applied
        auth_type: AuthType,
        /// The offending parameter
        param: &'static str,
        /// The rejected value
        value: String,
    },
}

/// Failure assembling the wire request from resolved parts.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BodyEncodingError {
    /// The URL's host resolved to nothing; dispatch would be meaningless.
    #[error("request URL resolved to an empty host")]
    EmptyHost,

    /// A raw body marked as JSON failed to parse.
    #[error("raw body is not valid JSON: {0}")]
    InvalidJson(String),

    /// Mode-specific encoding failed.
    #[error("failed to encode {mode} body: {message}")]
    Encoding {
        /// The body mode
        mode: &'static str,
        /// What went wrong
        message: String,
    },
}

/// Any failure during request preparation. No I/O has happened yet.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PrepareError {
    /// Template resolution failed.
    #[error(transparent)]
    Variable(#[from] VariableResolutionError),

    /// Auth application failed.
    #[error(transparent)]
    Auth(#[from] AuthConfigError),

    /// Body or URL encoding failed.
    #[error(transparent)]
    Body(#[from] BodyEncodingError),
}

/// Transport-level failure reported by the dispatcher.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request exceeded its deadline.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// The deadline that elapsed
        timeout_ms: u64,
    },

    /// The remote end refused the connection.
    #[error("connection refused by {host}")]
    ConnectionRefused {
        /// The unreachable host
        host: String,
    },

    /// The hostname did not resolve.
    #[error("DNS lookup failed for {host}")]
    DnsFailure {
        /// The unresolvable host
        host: String,
    },

    /// TLS negotiation failed.
    #[error("TLS failure: {0}")]
    TlsFailure(String),

    /// The redirect limit was exhausted.
    #[error("stopped after {max} redirects")]
    TooManyRedirects {
        /// The configured limit
        max: u32,
    },

    /// Anything else the HTTP layer rejected.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// The caller's cancellation signal fired.
    #[error("request was cancelled")]
    Cancelled,
}

/// The lifecycle point a hook ran at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    /// Before preparation and dispatch
    Prerequest,
    /// After the response arrived
    Test,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prerequest => f.write_str("prerequest"),
            Self::Test => f.write_str("test"),
        }
    }
}

/// A hook implementation reported a failure.
///
/// Recorded as a diagnostic unless `strict_hooks` is set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{phase} hook failed: {message}")]
pub struct HookError {
    /// Which hook failed
    pub phase: HookPhase,
    /// The failure description from the hook
    pub message: String,
}

impl HookError {
    /// Creates a prerequest hook error.
    #[must_use]
    pub fn prerequest(message: impl Into<String>) -> Self {
        Self {
            phase: HookPhase::Prerequest,
            message: message.into(),
        }
    }

    /// Creates a test hook error.
    #[must_use]
    pub fn test(message: impl Into<String>) -> Self {
        Self {
            phase: HookPhase::Test,
            message: message.into(),
        }
    }
}
