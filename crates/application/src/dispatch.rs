//! HTTP dispatcher port
//!
//! The dispatcher is the only component that touches the network. This
//! trait abstracts the HTTP implementation so the execution core can be
//! tested against a mock and the real adapter lives in the
//! infrastructure layer.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::prepare::WireRequest;

/// Default request timeout: 30 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Default redirect ceiling.
pub const DEFAULT_MAX_REDIRECTS: u32 = 10;

/// Per-dispatch transport options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Deadline for the whole exchange
    pub timeout: Duration,
    /// Whether 3xx responses are followed
    pub follow_redirects: bool,
    /// Redirect ceiling when following
    pub max_redirects: u32,
    /// Whether server certificates are verified
    pub verify_tls: bool,
    /// Optional proxy URL
    pub proxy: Option<String>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            follow_redirects: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            verify_tls: true,
            proxy: None,
        }
    }
}

/// What came back over the wire.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Status reason phrase, empty when the protocol omits it
    pub reason: String,
    /// Response headers in arrival order
    pub headers: Vec<(String, String)>,
    /// Raw body bytes
    pub body: Vec<u8>,
    /// Time from request write to body completion
    pub elapsed: Duration,
    /// The URL that answered, after any redirects
    pub final_url: String,
}

impl HttpResponse {
    /// Returns the body decoded as UTF-8, lossily.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the underlying parse error for non-JSON bodies.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Finds a header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Response headers as a map; later duplicates win.
    #[must_use]
    pub fn header_map(&self) -> HashMap<String, String> {
        self.headers.iter().cloned().collect()
    }

    /// True for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Port for sending wire requests.
///
/// Implementations are stateless apart from an internally synchronized
/// connection pool and must be shareable across workers.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Sends the request and collects the response.
    ///
    /// # Errors
    ///
    /// A [`TransportError`] classifying the failure; never panics on
    /// network conditions.
    async fn dispatch(
        &self,
        request: &WireRequest,
        options: &DispatchOptions,
    ) -> Result<HttpResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = DispatchOptions::default();
        assert_eq!(options.timeout, Duration::from_millis(30_000));
        assert!(options.follow_redirects);
        assert_eq!(options.max_redirects, 10);
        assert!(options.verify_tls);
        assert!(options.proxy.is_none());
    }

    #[test]
    fn test_response_accessors() {
        let response = HttpResponse {
            status: 200,
            reason: "OK".to_string(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: br#"{"ok": true}"#.to_vec(),
            elapsed: Duration::from_millis(12),
            final_url: "https://api.example.com/".to_string(),
        };

        assert!(response.is_success());
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(
            response.json().expect("valid json")["ok"],
            serde_json::json!(true)
        );
        assert_eq!(response.text(), r#"{"ok": true}"#);
    }
}
