//! Per-call request extensions
//!
//! Extensions describe runtime modifications to a request without
//! mutating the source tree: substitutions replace existing entries by
//! key, extensions add new entries or overwrite by key. They are
//! applied to a clone during preparation; template resolution happens
//! afterwards in the normal single pass, so extension values may
//! themselves contain `{{variables}}`.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

use convoy_domain::{Body, FormParam, Header, QueryParam, Request};

/// Runtime overrides and additions for one request execution.
#[derive(Debug, Clone, Default)]
pub struct RequestExtensions {
    /// Replacements for URL components: `protocol`, `host`, `port`,
    /// `path`, `hash`
    pub url_substitutions: HashMap<String, String>,
    /// Replacements for existing header values, matched case-insensitively
    pub header_substitutions: HashMap<String, String>,
    /// Headers to add; an existing key (case-insensitive) is overwritten
    pub header_extensions: HashMap<String, String>,
    /// Replacements for existing query parameter values
    pub param_substitutions: HashMap<String, String>,
    /// Query parameters to add; an existing key is overwritten
    pub param_extensions: HashMap<String, String>,
    /// Body replacements, keyed per mode (JSON keys or form fields)
    pub body_substitutions: HashMap<String, Value>,
    /// Body additions, merged at the root for JSON, appended for forms
    pub body_extensions: HashMap<String, Value>,
    /// Replacements for auth parameter values on the effective auth
    pub auth_substitutions: HashMap<String, String>,
    /// Per-call timeout override, taking precedence over executor options
    pub timeout: Option<Duration>,
}

impl RequestExtensions {
    /// Creates an empty extension set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no modification is defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.url_substitutions.is_empty()
            && self.header_substitutions.is_empty()
            && self.header_extensions.is_empty()
            && self.param_substitutions.is_empty()
            && self.param_extensions.is_empty()
            && self.body_substitutions.is_empty()
            && self.body_extensions.is_empty()
            && self.auth_substitutions.is_empty()
            && self.timeout.is_none()
    }

    /// Applies everything except auth substitutions to a clone of the
    /// request. Returns the modified clone plus diagnostics for
    /// modifications that could not be applied.
    #[must_use]
    pub fn apply_to_request(&self, request: &Request) -> (Request, Vec<String>) {
        let mut modified = request.clone();
        let mut diagnostics = Vec::new();

        self.apply_url(&mut modified);
        self.apply_headers(&mut modified);
        self.apply_params(&mut modified);
        self.apply_body(&mut modified, &mut diagnostics);

        (modified, diagnostics)
    }

    /// Applies auth parameter substitutions to a clone of the effective
    /// auth. Values are replaced before variable resolution.
    #[must_use]
    pub fn apply_auth_substitutions(
        &self,
        auth: &convoy_domain::Auth,
    ) -> convoy_domain::Auth {
        let mut modified = auth.clone();
        for (key, value) in &self.auth_substitutions {
            if let Some(slot) = modified.parameters.get_mut(key) {
                value.clone_into(slot);
            }
        }
        modified
    }

    fn apply_url(&self, request: &mut Request) {
        for (component, value) in &self.url_substitutions {
            match component.as_str() {
                "protocol" => request.url.protocol = Some(value.clone()),
                "host" => {
                    request.url.host = if value.contains("{{") {
                        vec![value.clone()]
                    } else {
                        value.split('.').map(str::to_string).collect()
                    };
                }
                "port" => request.url.port = Some(value.clone()),
                "path" => {
                    request.url.path = value
                        .split('/')
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect();
                }
                "hash" => request.url.hash = Some(value.clone()),
                _ => {}
            }
        }
    }

    fn apply_headers(&self, request: &mut Request) {
        let mut headers: Vec<Header> = request.headers.clone().into_iter().collect();

        for (key, value) in &self.header_substitutions {
            for header in headers.iter_mut().filter(|h| h.matches(key)) {
                value.clone_into(&mut header.value);
            }
        }

        for (key, value) in &self.header_extensions {
            if let Some(existing) = headers.iter_mut().find(|h| h.matches(key)) {
                value.clone_into(&mut existing.value);
            } else {
                headers.push(Header::new(key.clone(), value.clone()));
            }
        }

        request.headers = headers.into_iter().collect();
    }

    fn apply_params(&self, request: &mut Request) {
        for (key, value) in &self.param_substitutions {
            for param in request.url.query.iter_mut().filter(|p| &p.key == key) {
                value.clone_into(&mut param.value);
            }
        }

        for (key, value) in &self.param_extensions {
            if let Some(existing) = request.url.query.iter_mut().find(|p| &p.key == key) {
                value.clone_into(&mut existing.value);
            } else {
                request.url.query.push(QueryParam::new(key.clone(), value.clone()));
            }
        }
    }

    fn apply_body(&self, request: &mut Request, diagnostics: &mut Vec<String>) {
        if self.body_substitutions.is_empty() && self.body_extensions.is_empty() {
            return;
        }

        match &mut request.body {
            Some(Body::Raw { content, .. }) => {
                match serde_json::from_str::<Value>(content) {
                    Ok(Value::Object(mut object)) => {
                        for (key, value) in &self.body_substitutions {
                            if let Some(slot) = object.get_mut(key) {
                                *slot = value.clone();
                            }
                        }
                        for (key, value) in &self.body_extensions {
                            object.insert(key.clone(), value.clone());
                        }
                        *content = Value::Object(object).to_string();
                    }
                    _ => {
                        if !self.body_extensions.is_empty() {
                            diagnostics.push(format!(
                                "body extensions ignored for non-JSON raw body on '{}'",
                                request.name
                            ));
                        }
                    }
                }
            }
            Some(Body::Urlencoded { params } | Body::Formdata { params }) => {
                for (key, value) in &self.body_substitutions {
                    for param in params.iter_mut().filter(|p| &p.key == key) {
                        param.value = value_as_string(value);
                    }
                }
                for (key, value) in &self.body_extensions {
                    if let Some(existing) = params.iter_mut().find(|p| &p.key == key) {
                        existing.value = value_as_string(value);
                    } else {
                        params.push(FormParam::new(key.clone(), value_as_string(value)));
                    }
                }
            }
            Some(Body::File { .. } | Body::Graphql { .. }) | None => {
                if !self.body_substitutions.is_empty() || !self.body_extensions.is_empty() {
                    diagnostics.push(format!(
                        "body modifications not applicable to '{}'",
                        request.name
                    ));
                }
            }
        }
    }
}

fn value_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
