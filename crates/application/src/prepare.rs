//! Request preparation
//!
//! Turns a declarative request plus its execution context into a wire
//! request: extensions applied, every template resolved, auth rendered,
//! body encoded. Preparation is deterministic and performs no I/O;
//! given the same inputs (and no dynamic built-ins) it produces the
//! same wire request.

use std::time::Duration;

use convoy_domain::{Auth, Body, HttpMethod, Request, Url};

use crate::auth::apply::apply_auth;
use crate::context::ExecutionContext;
use crate::error::{BodyEncodingError, PrepareError};
use crate::extensions::RequestExtensions;
use crate::resolver::{ResolvePolicy, VariableResolver};

/// Header names the core never copies from the source document; the
/// HTTP layer owns them.
const RESERVED_HEADERS: &[&str] = &["host", "content-length"];

/// The body of a wire request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireBody {
    /// Fully encoded bytes
    Bytes(Vec<u8>),
    /// A file to stream at dispatch time; opened lazily by the dispatcher
    File(String),
    /// Multipart fields; the dispatcher chooses the boundary
    Multipart(Vec<MultipartField>),
}

/// One multipart field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartField {
    /// Field name
    pub name: String,
    /// Field content
    pub value: MultipartValue,
}

/// Content of a multipart field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartValue {
    /// Inline text
    Text(String),
    /// A file path, read at dispatch time
    FilePath(String),
}

/// A fully resolved request, ready for the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Final URL string
    pub url: String,
    /// Resolved headers in emission order
    pub headers: Vec<(String, String)>,
    /// Encoded body, if any
    pub body: Option<WireBody>,
    /// Per-request timeout override
    pub timeout: Option<Duration>,
}

impl WireRequest {
    /// Finds a header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A wire request together with non-fatal preparation notes.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// The request to dispatch
    pub wire: WireRequest,
    /// Unresolved variables (lenient mode) and ignored modifications
    pub diagnostics: Vec<String>,
}

/// Prepares requests for dispatch.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestPreparer {
    policy: ResolvePolicy,
}

impl RequestPreparer {
    /// Creates a preparer with the given undefined-variable policy.
    #[must_use]
    pub const fn new(policy: ResolvePolicy) -> Self {
        Self { policy }
    }

    /// Prepares one request.
    ///
    /// `effective_auth` is the outcome of hierarchical auth resolution;
    /// `None` means no auth is rendered at all.
    ///
    /// # Errors
    ///
    /// [`PrepareError`] on unresolvable variables (strict mode), auth
    /// misconfiguration or body encoding problems. No I/O is performed.
    pub fn prepare(
        &self,
        request: &Request,
        effective_auth: Option<&Auth>,
        context: &ExecutionContext,
        extensions: Option<&RequestExtensions>,
    ) -> Result<PreparedRequest, PrepareError> {
        let mut diagnostics = Vec::new();

        let working = match extensions {
            Some(ext) => {
                let (modified, ext_diagnostics) = ext.apply_to_request(request);
                diagnostics.extend(ext_diagnostics);
                modified
            }
            None => request.clone(),
        };

        let resolver = VariableResolver::with_policy(context, self.policy);

        let mut url = self.resolve_url(&working.url, &resolver, &mut diagnostics)?;
        if url.has_empty_host() {
            return Err(BodyEncodingError::EmptyHost.into());
        }

        let mut headers = self.resolve_headers(&working, &resolver, &mut diagnostics)?;

        let body = match &working.body {
            Some(body) => self.encode_body(body, &resolver, &mut diagnostics)?,
            None => None,
        };

        // An explicit Content-Type (source or extension) wins over the
        // one the body mode implies.
        if body.is_some()
            && !headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            && let Some(content_type) = working.body.as_ref().and_then(Body::inferred_content_type)
        {
            headers.push(("Content-Type".to_string(), content_type.to_string()));
        }

        if let Some(auth) = effective_auth {
            let auth = match extensions {
                Some(ext) => ext.apply_auth_substitutions(auth),
                None => auth.clone(),
            };
            apply_auth(&auth, &resolver, working.method, &mut url, &mut headers)?;
        }

        let wire = WireRequest {
            method: working.method,
            url: url.render(),
            headers,
            body,
            timeout: extensions.and_then(|e| e.timeout),
        };

        Ok(PreparedRequest { wire, diagnostics })
    }

    fn resolve_url(
        &self,
        url: &Url,
        resolver: &VariableResolver<'_>,
        diagnostics: &mut Vec<String>,
    ) -> Result<Url, PrepareError> {
        let mut resolved = url.clone();

        if let Some(protocol) = &resolved.protocol {
            resolved.protocol = Some(resolve_tracked(resolver, protocol, diagnostics)?);
        }
        for segment in &mut resolved.host {
            *segment = resolve_tracked(resolver, segment, diagnostics)?;
        }
        if let Some(port) = &resolved.port {
            resolved.port = Some(resolve_tracked(resolver, port, diagnostics)?);
        }
        for segment in &mut resolved.path {
            *segment = resolve_tracked(resolver, segment, diagnostics)?;
        }

        // Disabled entries are dropped here; empty values stay.
        resolved.query.retain(|p| !p.disabled);
        for param in &mut resolved.query {
            param.key = resolve_tracked(resolver, &param.key, diagnostics)?;
            param.value = resolve_tracked(resolver, &param.value, diagnostics)?;
        }

        if let Some(hash) = &resolved.hash {
            resolved.hash = Some(resolve_tracked(resolver, hash, diagnostics)?);
        }

        Ok(resolved)
    }

    fn resolve_headers(
        &self,
        request: &Request,
        resolver: &VariableResolver<'_>,
        diagnostics: &mut Vec<String>,
    ) -> Result<Vec<(String, String)>, PrepareError> {
        let mut headers = Vec::new();

        for header in request.headers.enabled() {
            let key = resolve_tracked(resolver, &header.key, diagnostics)?;
            let value = resolve_tracked(resolver, &header.value, diagnostics)?;

            if key.trim().is_empty() || value.is_empty() {
                continue;
            }
            if RESERVED_HEADERS.iter().any(|r| key.eq_ignore_ascii_case(r)) {
                continue;
            }
            headers.push((key, value));
        }

        Ok(headers)
    }

    fn encode_body(
        &self,
        body: &Body,
        resolver: &VariableResolver<'_>,
        diagnostics: &mut Vec<String>,
    ) -> Result<Option<WireBody>, PrepareError> {
        match body {
            Body::Raw { content, language } => {
                let resolved = resolve_tracked(resolver, content, diagnostics)?;
                if language.as_deref() == Some("json")
                    && !resolved.trim().is_empty()
                    && let Err(e) = serde_json::from_str::<serde_json::Value>(&resolved)
                {
                    return Err(BodyEncodingError::InvalidJson(e.to_string()).into());
                }
                Ok(Some(WireBody::Bytes(resolved.into_bytes())))
            }
            Body::Urlencoded { params } => {
                let encoded = params
                    .iter()
                    .filter(|p| !p.disabled)
                    .map(|p| {
                        let key = resolve_tracked(resolver, &p.key, diagnostics)?;
                        let value = resolve_tracked(resolver, &p.value, diagnostics)?;
                        Ok(format!(
                            "{}={}",
                            urlencoding::encode(&key),
                            urlencoding::encode(&value)
                        ))
                    })
                    .collect::<Result<Vec<_>, PrepareError>>()?
                    .join("&");
                Ok(Some(WireBody::Bytes(encoded.into_bytes())))
            }
            Body::Formdata { params } => {
                let mut fields = Vec::new();
                for param in params.iter().filter(|p| !p.disabled) {
                    let name = resolve_tracked(resolver, &param.key, diagnostics)?;
                    let value = if let Some(src) = &param.src {
                        MultipartValue::FilePath(resolve_tracked(resolver, src, diagnostics)?)
                    } else {
                        MultipartValue::Text(resolve_tracked(resolver, &param.value, diagnostics)?)
                    };
                    fields.push(MultipartField { name, value });
                }
                Ok(Some(WireBody::Multipart(fields)))
            }
            Body::File { src } => {
                let path = resolve_tracked(resolver, src, diagnostics)?;
                if path.trim().is_empty() {
                    return Err(BodyEncodingError::Encoding {
                        mode: "file",
                        message: "file body has an empty source path".to_string(),
                    }
                    .into());
                }
                Ok(Some(WireBody::File(path)))
            }
            Body::Graphql { query, variables } => {
                let query = resolve_tracked(resolver, query, diagnostics)?;
                let mut payload = serde_json::Map::new();
                payload.insert("query".to_string(), serde_json::Value::String(query));
                if let Some(variables) = variables {
                    let resolved = resolve_tracked(resolver, variables, diagnostics)?;
                    let value = serde_json::from_str(&resolved).map_err(|e| {
                        BodyEncodingError::Encoding {
                            mode: "graphql",
                            message: format!("variables are not valid JSON: {e}"),
                        }
                    })?;
                    payload.insert("variables".to_string(), value);
                }
                Ok(Some(WireBody::Bytes(
                    serde_json::Value::Object(payload).to_string().into_bytes(),
                )))
            }
        }
    }
}

fn resolve_tracked(
    resolver: &VariableResolver<'_>,
    input: &str,
    diagnostics: &mut Vec<String>,
) -> Result<String, PrepareError> {
    let resolution = resolver.resolve(input)?;
    for name in &resolution.unresolved {
        diagnostics.push(format!("unresolved variable '{name}'"));
    }
    Ok(resolution.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Scope;
    use convoy_domain::{FormParam, Header};
    use pretty_assertions::assert_eq;

    fn context(pairs: &[(&str, &str)]) -> ExecutionContext {
        let mut ctx = ExecutionContext::new();
        for (k, v) in pairs {
            ctx.set(Scope::Environment, *k, *v);
        }
        ctx
    }

    fn prepare(
        request: &Request,
        auth: Option<&Auth>,
        ctx: &ExecutionContext,
        extensions: Option<&RequestExtensions>,
    ) -> Result<PreparedRequest, PrepareError> {
        RequestPreparer::default().prepare(request, auth, ctx, extensions)
    }

    #[test]
    fn test_path_and_template_mix() {
        let ctx = context(&[("base", "https://api.x"), ("id", "42"), ("lim", "10")]);
        let request = Request::get("r", "{{base}}/users/:id?limit={{lim}}");
        let prepared = prepare(&request, None, &ctx, None).expect("prepares");
        assert_eq!(prepared.wire.url, "https://api.x/users/42?limit=10");
    }

    #[test]
    fn test_empty_host_fails_before_dispatch() {
        let ctx = context(&[("base", "")]);
        let request = Request::get("r", "{{base}}/path");
        let err = prepare(&request, None, &ctx, None).expect_err("empty host");
        assert!(matches!(
            err,
            PrepareError::Body(BodyEncodingError::EmptyHost)
        ));
    }

    #[test]
    fn test_disabled_query_dropped_empty_value_kept() {
        let ctx = context(&[]);
        let mut request = Request::get("r", "https://api.example.com/search");
        request.url.query.push(convoy_domain::QueryParam::new("q", ""));
        request
            .url
            .query
            .push(convoy_domain::QueryParam::disabled("debug", "1"));

        let prepared = prepare(&request, None, &ctx, None).expect("prepares");
        assert_eq!(prepared.wire.url, "https://api.example.com/search?q=");
    }

    #[test]
    fn test_reserved_headers_never_copied() {
        let ctx = context(&[]);
        let mut request = Request::get("r", "https://api.example.com/");
        request.headers.push(Header::new("Host", "evil.example.com"));
        request.headers.push(Header::new("Content-Length", "999"));
        request.headers.push(Header::new("Accept", "application/json"));

        let prepared = prepare(&request, None, &ctx, None).expect("prepares");
        assert_eq!(prepared.wire.headers.len(), 1);
        assert_eq!(prepared.wire.header("accept"), Some("application/json"));
    }

    #[test]
    fn test_header_values_resolved_and_empty_dropped() {
        let ctx = context(&[("trace", "t-1"), ("blank", "")]);
        let request = Request::get("r", "https://api.example.com/")
            .with_header("X-Trace", "{{trace}}")
            .with_header("X-Blank", "{{blank}}");

        let prepared = prepare(&request, None, &ctx, None).expect("prepares");
        assert_eq!(prepared.wire.header("X-Trace"), Some("t-1"));
        assert_eq!(prepared.wire.header("X-Blank"), None);
    }

    #[test]
    fn test_raw_json_body_resolved_and_content_type_set() {
        let ctx = context(&[("name", "Ada")]);
        let request = Request::post("r", "https://api.example.com/users")
            .with_body(Body::json(r#"{"name": "{{name}}"}"#));

        let prepared = prepare(&request, None, &ctx, None).expect("prepares");
        assert_eq!(prepared.wire.header("content-type"), Some("application/json"));
        let Some(WireBody::Bytes(bytes)) = prepared.wire.body else {
            panic!("bytes body expected");
        };
        assert_eq!(String::from_utf8(bytes).expect("utf8"), r#"{"name": "Ada"}"#);
    }

    #[test]
    fn test_invalid_json_body_rejected() {
        let ctx = context(&[]);
        let request = Request::post("r", "https://api.example.com/users")
            .with_body(Body::json("{not json"));
        let err = prepare(&request, None, &ctx, None).expect_err("invalid json");
        assert!(matches!(
            err,
            PrepareError::Body(BodyEncodingError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_explicit_content_type_wins_over_inferred() {
        let ctx = context(&[]);
        let request = Request::post("r", "https://api.example.com/users")
            .with_header("Content-Type", "application/vnd.custom+json")
            .with_body(Body::json("{}"));

        let prepared = prepare(&request, None, &ctx, None).expect("prepares");
        let content_types: Vec<&str> = prepared
            .wire
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(content_types, vec!["application/vnd.custom+json"]);
    }

    #[test]
    fn test_urlencoded_body() {
        let ctx = context(&[("user", "ada lovelace")]);
        let request = Request::post("r", "https://api.example.com/login").with_body(Body::Urlencoded {
            params: vec![
                FormParam::new("user", "{{user}}"),
                FormParam::new("remember", "yes"),
            ],
        });

        let prepared = prepare(&request, None, &ctx, None).expect("prepares");
        assert_eq!(
            prepared.wire.header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
        let Some(WireBody::Bytes(bytes)) = prepared.wire.body else {
            panic!("bytes body expected");
        };
        assert_eq!(
            String::from_utf8(bytes).expect("utf8"),
            "user=ada%20lovelace&remember=yes"
        );
    }

    #[test]
    fn test_formdata_body_defers_to_dispatcher() {
        let ctx = context(&[]);
        let request = Request::post("r", "https://api.example.com/upload").with_body(Body::Formdata {
            params: vec![
                FormParam::new("note", "hello"),
                FormParam::file("data", "/tmp/file.bin"),
            ],
        });

        let prepared = prepare(&request, None, &ctx, None).expect("prepares");
        // Boundary is chosen at dispatch; no Content-Type yet.
        assert_eq!(prepared.wire.header("content-type"), None);
        let Some(WireBody::Multipart(fields)) = prepared.wire.body else {
            panic!("multipart body expected");
        };
        assert_eq!(fields.len(), 2);
        assert!(matches!(fields[1].value, MultipartValue::FilePath(_)));
    }

    #[test]
    fn test_graphql_body_wrapped_in_json() {
        let ctx = context(&[("id", "7")]);
        let request = Request::post("r", "https://api.example.com/graphql").with_body(Body::Graphql {
            query: "query { user(id: {{id}}) { name } }".to_string(),
            variables: Some(r#"{"verbose": true}"#.to_string()),
        });

        let prepared = prepare(&request, None, &ctx, None).expect("prepares");
        let Some(WireBody::Bytes(bytes)) = prepared.wire.body else {
            panic!("bytes body expected");
        };
        let value: serde_json::Value =
            serde_json::from_slice(&bytes).expect("valid json");
        assert!(value["query"].as_str().expect("query").contains("id: 7"));
        assert_eq!(value["variables"]["verbose"], serde_json::json!(true));
    }

    #[test]
    fn test_auth_applied_to_wire() {
        let ctx = context(&[("tok", "secret")]);
        let request = Request::get("r", "https://api.example.com/me");
        let auth = Auth::bearer("{{tok}}");
        let prepared = prepare(&request, Some(&auth), &ctx, None).expect("prepares");
        assert_eq!(prepared.wire.header("authorization"), Some("Bearer secret"));
    }

    #[test]
    fn test_no_auth_means_no_authorization_header() {
        let ctx = context(&[]);
        let request = Request::get("r", "https://api.example.com/open");
        let prepared = prepare(&request, None, &ctx, None).expect("prepares");
        assert_eq!(prepared.wire.header("authorization"), None);
    }

    #[test]
    fn test_auth_substitution_before_resolution() {
        let ctx = context(&[("fresh", "new-token")]);
        let request = Request::get("r", "https://api.example.com/");
        let auth = Auth::bearer("stale");
        let mut extensions = RequestExtensions::new();
        extensions
            .auth_substitutions
            .insert("token".to_string(), "{{fresh}}".to_string());

        let prepared =
            prepare(&request, Some(&auth), &ctx, Some(&extensions)).expect("prepares");
        assert_eq!(prepared.wire.header("authorization"), Some("Bearer new-token"));
    }

    #[test]
    fn test_lenient_unresolved_recorded() {
        let ctx = context(&[]);
        let request = Request::get("r", "https://api.example.com/{{missing}}");
        let prepared = prepare(&request, None, &ctx, None).expect("prepares");
        assert!(prepared.wire.url.contains("{{missing}}"));
        assert!(
            prepared
                .diagnostics
                .iter()
                .any(|d| d.contains("missing"))
        );
    }

    #[test]
    fn test_strict_mode_fails_on_undefined() {
        let ctx = context(&[]);
        let request = Request::get("r", "https://api.example.com/{{missing}}");
        let preparer = RequestPreparer::new(ResolvePolicy::Strict);
        assert!(preparer.prepare(&request, None, &ctx, None).is_err());
    }

    #[test]
    fn test_preparation_is_deterministic() {
        let ctx = context(&[("v", "1")]);
        let request = Request::post("r", "https://api.example.com/items?v={{v}}")
            .with_header("X-K", "{{v}}")
            .with_body(Body::json(r#"{"v": "{{v}}"}"#));

        let a = prepare(&request, None, &ctx, None).expect("prepares");
        let b = prepare(&request, None, &ctx, None).expect("prepares");
        assert_eq!(a.wire, b.wire);
    }
}
