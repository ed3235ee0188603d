//! Request definition

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Auth;
use crate::body::Body;
use crate::event::Event;
use crate::header::{Header, Headers};
use crate::method::HttpMethod;
use crate::url::Url;
use crate::variable::Variable;

/// One HTTP call definition inside a collection.
///
/// A request is immutable during execution: per-call changes are made to
/// a clone or carried outside the tree entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Unique identifier
    pub id: Uuid,
    /// Human-readable name
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// HTTP method
    pub method: HttpMethod,
    /// Target URL
    #[serde(default)]
    pub url: Url,
    /// Request headers
    #[serde(default)]
    pub headers: Headers,
    /// Request body; absent means no body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    /// Request-level auth override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<Auth>,
    /// Request-scoped variables
    #[serde(default)]
    pub variables: Vec<Variable>,
    /// Attached script events
    #[serde(default)]
    pub events: Vec<Event>,
    /// Saved example responses from the source document
    #[serde(default)]
    pub responses: Vec<ExampleResponse>,
}

impl Request {
    /// Creates a named request with defaults.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            description: None,
            method: HttpMethod::default(),
            url: Url::default(),
            headers: Headers::new(),
            body: None,
            auth: None,
            variables: Vec::new(),
            events: Vec::new(),
            responses: Vec::new(),
        }
    }

    /// Creates a GET request for a raw URL.
    #[must_use]
    pub fn get(name: impl Into<String>, raw_url: impl Into<String>) -> Self {
        let mut request = Self::new(name);
        request.url = Url::from_raw(raw_url);
        request
    }

    /// Creates a POST request for a raw URL.
    #[must_use]
    pub fn post(name: impl Into<String>, raw_url: impl Into<String>) -> Self {
        let mut request = Self::get(name, raw_url);
        request.method = HttpMethod::Post;
        request
    }

    /// Sets the method.
    #[must_use]
    pub const fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(key, value));
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the request-level auth.
    #[must_use]
    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Adds a request-scoped variable.
    #[must_use]
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.push(Variable::new(key, value));
        self
    }

    /// The events listening on a given lifecycle point.
    pub fn events_for(&self, kind: crate::event::EventKind) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.listen == kind)
    }
}

/// A saved example response carried through from the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleResponse {
    /// Example name
    pub name: String,
    /// HTTP status code
    #[serde(default)]
    pub code: Option<u16>,
    /// Status line text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Example body text
    #[serde(default)]
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, Script};

    #[test]
    fn test_builder() {
        let request = Request::post("Create User", "https://api.example.com/users")
            .with_header("Accept", "application/json")
            .with_body(Body::json(r#"{"name": "Ada"}"#))
            .with_variable("region", "eu");

        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.headers.len(), 1);
        assert!(request.body.is_some());
        assert_eq!(request.variables[0].key, "region");
    }

    #[test]
    fn test_events_for_filters_by_kind() {
        let mut request = Request::new("r");
        request.events.push(Event {
            listen: EventKind::Prerequest,
            script: Script::default(),
        });
        request.events.push(Event {
            listen: EventKind::Test,
            script: Script::default(),
        });

        assert_eq!(request.events_for(EventKind::Prerequest).count(), 1);
        assert_eq!(request.events_for(EventKind::Test).count(), 1);
    }
}
