//! Structured URL model
//!
//! A `Url` keeps the structured form (protocol, host, path, query)
//! authoritative. The `raw` string seen at load time is kept for
//! reference only; rendering always rebuilds from components, so
//! variable resolution can operate segment by segment.
//!
//! Parsing is template-tolerant: strings like `{{base}}/users/:id` are
//! not valid URLs for strict parsers, so splitting is done manually and
//! segments containing templates are kept intact.

use serde::{Deserialize, Serialize};

/// A query string entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParam {
    /// Parameter key
    pub key: String,
    /// Parameter value; empty string is a meaningful value
    #[serde(default)]
    pub value: String,
    /// Disabled entries are omitted from the rendered URL
    #[serde(default)]
    pub disabled: bool,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl QueryParam {
    /// Creates a new enabled query parameter.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            disabled: false,
            description: None,
        }
    }

    /// Creates a disabled query parameter.
    #[must_use]
    pub fn disabled(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            disabled: true,
            ..Self::new(key, value)
        }
    }
}

/// A declared path variable (`:id` style) with an optional default value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathVariable {
    /// Variable name without the leading colon
    pub key: String,
    /// Default value from the source document
    #[serde(default)]
    pub value: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Structured request URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Url {
    /// The raw string as loaded; informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    /// Protocol without "://" (e.g., "https")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// Host segments; joined with "." on render
    #[serde(default)]
    pub host: Vec<String>,
    /// Port as a string so it may contain a template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    /// Path segments without slashes
    #[serde(default)]
    pub path: Vec<String>,
    /// Query entries in source order
    #[serde(default)]
    pub query: Vec<QueryParam>,
    /// Fragment without the leading "#"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Declared path variables
    #[serde(default)]
    pub path_vars: Vec<PathVariable>,
}

impl Url {
    /// Parses a raw URL string into structured components.
    ///
    /// Tolerates variable templates anywhere: an authority containing
    /// `{{` stays a single host segment instead of being split on dots.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let mut url = Self {
            raw: Some(raw.clone()),
            ..Self::default()
        };

        let mut rest = raw.as_str();

        if let Some(idx) = rest.find('#') {
            let fragment = &rest[idx + 1..];
            if !fragment.is_empty() {
                url.hash = Some(fragment.to_string());
            }
            rest = &rest[..idx];
        }

        if let Some(idx) = rest.find('?') {
            for pair in rest[idx + 1..].split('&').filter(|p| !p.is_empty()) {
                match pair.split_once('=') {
                    Some((k, v)) => url.query.push(QueryParam::new(k, v)),
                    None => url.query.push(QueryParam::new(pair, "")),
                }
            }
            rest = &rest[..idx];
        }

        if let Some((scheme, remainder)) = rest.split_once("://") {
            url.protocol = Some(scheme.to_string());
            rest = remainder;
        }

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx + 1..]),
            None => (rest, ""),
        };

        let (host_part, port) = split_port(authority);
        url.port = port;
        if !host_part.is_empty() {
            if host_part.contains("{{") {
                url.host = vec![host_part.to_string()];
            } else {
                url.host = host_part.split('.').map(str::to_string).collect();
            }
        }

        url.path = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        url
    }

    /// Renders the URL back into a string from its components.
    ///
    /// Disabled query entries are omitted; entries with empty values are
    /// kept (`?key=`). The stored `raw` string is ignored.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();

        if let Some(protocol) = &self.protocol {
            out.push_str(protocol);
            out.push_str("://");
        }

        out.push_str(&self.host.join("."));

        if let Some(port) = &self.port {
            out.push(':');
            out.push_str(port);
        }

        for segment in &self.path {
            out.push('/');
            out.push_str(segment);
        }

        let query: Vec<String> = self
            .query
            .iter()
            .filter(|p| !p.disabled)
            .map(|p| format!("{}={}", encode_component(&p.key), encode_component(&p.value)))
            .collect();
        if !query.is_empty() {
            out.push('?');
            out.push_str(&query.join("&"));
        }

        if let Some(hash) = &self.hash {
            out.push('#');
            out.push_str(hash);
        }

        out
    }

    /// Returns the host joined into a single string.
    #[must_use]
    pub fn host_string(&self) -> String {
        self.host.join(".")
    }

    /// Returns true if no host is present.
    #[must_use]
    pub fn has_empty_host(&self) -> bool {
        self.host.iter().all(|h| h.trim().is_empty())
    }
}

/// Splits a trailing `:port` off an authority, but only when the port
/// part is purely numeric so templates and bare colons are left alone.
fn split_port(authority: &str) -> (&str, Option<String>) {
    if let Some((host, port)) = authority.rsplit_once(':')
        && !port.is_empty()
        && port.chars().all(|c| c.is_ascii_digit())
    {
        return (host, Some(port.to_string()));
    }
    (authority, None)
}

/// Percent-encodes the characters that would corrupt query structure.
/// Everything else passes through untouched so already-encoded input is
/// not encoded twice.
fn encode_component(s: &str) -> String {
    s.replace(' ', "%20")
        .replace('&', "%26")
        .replace('#', "%23")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_plain_url() {
        let url = Url::from_raw("https://api.example.com:8080/v1/users?page=1&limit=10#top");
        assert_eq!(url.protocol.as_deref(), Some("https"));
        assert_eq!(url.host, vec!["api", "example", "com"]);
        assert_eq!(url.port.as_deref(), Some("8080"));
        assert_eq!(url.path, vec!["v1", "users"]);
        assert_eq!(url.query.len(), 2);
        assert_eq!(url.hash.as_deref(), Some("top"));
    }

    #[test]
    fn test_parse_templated_url_keeps_host_whole() {
        let url = Url::from_raw("{{base}}/users/:id?limit={{lim}}");
        assert_eq!(url.protocol, None);
        assert_eq!(url.host, vec!["{{base}}"]);
        assert_eq!(url.path, vec!["users", ":id"]);
        assert_eq!(url.query[0].key, "limit");
        assert_eq!(url.query[0].value, "{{lim}}");
    }

    #[test]
    fn test_render_round_trip() {
        let url = Url::from_raw("https://api.example.com/v1/users?page=1");
        assert_eq!(url.render(), "https://api.example.com/v1/users?page=1");
    }

    #[test]
    fn test_render_omits_disabled_keeps_empty() {
        let mut url = Url::from_raw("https://api.example.com/search");
        url.query.push(QueryParam::new("q", ""));
        url.query.push(QueryParam::disabled("debug", "1"));
        assert_eq!(url.render(), "https://api.example.com/search?q=");
    }

    #[test]
    fn test_templated_port_not_split() {
        let url = Url::from_raw("https://host:{{port}}/x");
        assert_eq!(url.port, None);
        assert_eq!(url.host, vec!["host:{{port}}"]);
    }

    #[test]
    fn test_query_value_encoding() {
        let mut url = Url::from_raw("https://api.example.com/search");
        url.query.push(QueryParam::new("q", "a&b c"));
        assert_eq!(url.render(), "https://api.example.com/search?q=a%26b%20c");
    }

    #[test]
    fn test_empty_host_detection() {
        let url = Url::from_raw("/relative/path");
        assert!(url.has_empty_host());
    }
}
