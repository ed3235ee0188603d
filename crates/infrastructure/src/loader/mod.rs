//! Collection loader
//!
//! Reads a collection document (file path, bytes or parsed JSON),
//! detects its schema version, validates its structure and maps it
//! into the immutable domain tree. The execution core assumes the
//! returned tree is well-formed; everything suspect is rejected here.

pub mod document;

use std::path::Path;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use convoy_domain::{
    Auth, AuthType, Body, Collection, CollectionInfo, Event, EventKind, ExampleResponse, Folder,
    FormParam, Header, Headers, HttpMethod, Item, PathVariable, QueryParam, Request, SchemaVersion,
    Script, Url, Variable,
};

use document::{RawAuth, RawBody, RawCollection, RawEvent, RawItem, RawUrl, RawVariable};

/// Failure to turn a document into a collection.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("cannot read collection: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes are not the JSON we expect.
    #[error("cannot parse collection: {0}")]
    Parse(#[from] serde_json::Error),

    /// The declared schema is missing or not executable.
    #[error("unsupported collection schema: {0}")]
    UnsupportedSchema(String),

    /// The document parsed but violates structural rules.
    #[error("invalid collection: {0}")]
    Invalid(String),
}

/// Loads a collection from a file on disk.
///
/// # Errors
///
/// [`LoadError`] on I/O, parse, schema or validation failure.
pub fn load_collection_from_path(path: impl AsRef<Path>) -> Result<Collection, LoadError> {
    let bytes = std::fs::read(path)?;
    load_collection_from_slice(&bytes)
}

/// Loads a collection from raw bytes.
///
/// # Errors
///
/// [`LoadError`] on parse, schema or validation failure.
pub fn load_collection_from_slice(bytes: &[u8]) -> Result<Collection, LoadError> {
    let raw: RawCollection = serde_json::from_slice(bytes)?;
    map_collection(raw)
}

/// Loads a collection from an already parsed JSON document.
///
/// # Errors
///
/// [`LoadError`] on shape, schema or validation failure.
pub fn load_collection_from_value(value: serde_json::Value) -> Result<Collection, LoadError> {
    let raw: RawCollection = serde_json::from_value(value)?;
    map_collection(raw)
}

fn map_collection(raw: RawCollection) -> Result<Collection, LoadError> {
    if raw.info.name.trim().is_empty() {
        return Err(LoadError::Invalid("collection has no name".to_string()));
    }

    let schema_string = raw
        .info
        .schema
        .ok_or_else(|| LoadError::UnsupportedSchema("missing schema declaration".to_string()))?;
    let schema = SchemaVersion::detect(&schema_string)
        .map_err(|_| LoadError::UnsupportedSchema(schema_string.clone()))?;

    let items = raw
        .item
        .into_iter()
        .map(map_item)
        .collect::<Result<Vec<_>, _>>()?;

    let collection = Collection {
        info: CollectionInfo {
            name: raw.info.name,
            description: raw.info.description,
            schema,
        },
        items,
        variables: raw.variable.into_iter().map(map_variable).collect(),
        auth: raw.auth.map(map_auth).transpose()?,
        events: map_events(raw.event),
    };

    debug!(
        collection = %collection.info.name,
        schema = %collection.info.schema,
        requests = collection.request_count(),
        "collection loaded"
    );
    Ok(collection)
}

fn map_item(raw: RawItem) -> Result<Item, LoadError> {
    if let Some(children) = raw.item {
        let items = children
            .into_iter()
            .map(map_item)
            .collect::<Result<Vec<_>, _>>()?;
        let mut folder = Folder::new(raw.name);
        folder.description = raw.description;
        folder.auth = raw.auth.map(map_auth).transpose()?;
        folder.variables = raw.variable.into_iter().map(map_variable).collect();
        folder.events = map_events(raw.event);
        folder.items = items;
        return Ok(Item::Folder(folder));
    }

    let Some(raw_request) = raw.request else {
        return Err(LoadError::Invalid(format!(
            "item '{}' is neither a folder nor a request",
            raw.name
        )));
    };

    let method = HttpMethod::from_str(&raw_request.method).map_err(|e| {
        LoadError::Invalid(format!("request '{}': {e}", raw.name))
    })?;

    let mut request = Request::new(raw.name);
    request.description = raw.description.or(raw_request.description);
    request.method = method;
    request.url = map_url(raw_request.url);
    request.headers = raw_request
        .header
        .into_iter()
        .map(|h| Header {
            key: h.key,
            value: h.value,
            disabled: h.disabled,
            description: h.description,
        })
        .collect::<Headers>();
    request.body = raw_request.body.and_then(map_body);
    // Request-level auth may come from either nesting level in the wild.
    request.auth = raw_request
        .auth
        .or(raw.auth)
        .map(map_auth)
        .transpose()?;
    request.variables = raw.variable.into_iter().map(map_variable).collect();
    request.events = map_events(raw.event);
    request.responses = raw.response.iter().filter_map(map_example).collect();

    Ok(Item::Request(request))
}

fn map_url(raw: RawUrl) -> Url {
    match raw {
        RawUrl::Empty => Url::default(),
        RawUrl::Simple(s) => Url::from_raw(s),
        RawUrl::Structured(s) => {
            // A structured URL with no components falls back to its raw string.
            if s.host.is_empty() && s.path.is_empty() {
                if let Some(raw_string) = &s.raw {
                    let mut url = Url::from_raw(raw_string.clone());
                    url.path_vars = map_path_vars(s.variable);
                    return url;
                }
            }

            Url {
                raw: s.raw,
                protocol: s.protocol,
                host: s.host,
                port: s.port,
                path: s.path,
                query: s
                    .query
                    .into_iter()
                    .map(|q| QueryParam {
                        key: q.key,
                        value: q.value.unwrap_or_default(),
                        disabled: q.disabled,
                        description: q.description,
                    })
                    .collect(),
                hash: s.hash,
                path_vars: map_path_vars(s.variable),
            }
        }
    }
}

fn map_path_vars(raw: Vec<document::RawPathVariable>) -> Vec<PathVariable> {
    raw.into_iter()
        .map(|v| PathVariable {
            key: v.key,
            value: v.value.unwrap_or_default(),
            description: v.description,
        })
        .collect()
}

fn map_body(raw: RawBody) -> Option<Body> {
    match raw.mode.as_str() {
        "raw" => Some(Body::Raw {
            content: raw.raw.unwrap_or_default(),
            language: raw.options.and_then(|o| o.raw).and_then(|r| r.language),
        }),
        "urlencoded" => Some(Body::Urlencoded {
            params: raw.urlencoded.into_iter().map(map_form_param).collect(),
        }),
        "formdata" => Some(Body::Formdata {
            params: raw.formdata.into_iter().map(map_form_param).collect(),
        }),
        "file" => raw
            .file
            .and_then(|f| f.src)
            .map(|src| Body::File { src }),
        "graphql" => raw.graphql.map(|g| Body::Graphql {
            query: g.query,
            variables: g.variables,
        }),
        // "none" and anything unrecognized mean no body.
        _ => None,
    }
}

fn map_form_param(raw: document::RawFormParam) -> FormParam {
    FormParam {
        key: raw.key,
        value: raw.value.unwrap_or_default(),
        src: raw.src,
        disabled: raw.disabled,
    }
}

fn map_auth(raw: RawAuth) -> Result<Auth, LoadError> {
    let auth_type = AuthType::from_str(&raw.auth_type)
        .map_err(|e| LoadError::Invalid(e.to_string()))?;

    let mut auth = Auth::new(auth_type);
    for param in raw.parameters() {
        let value = match &param.value {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        auth.parameters.insert(param.key.clone(), value);
    }
    Ok(auth)
}

fn map_variable(raw: RawVariable) -> Variable {
    Variable {
        key: raw.key,
        value: raw.value.unwrap_or_default(),
        var_type: raw.var_type,
        description: raw.description,
        enabled: !raw.disabled,
    }
}

fn map_events(raw: Vec<RawEvent>) -> Vec<Event> {
    raw.into_iter()
        .filter_map(|e| {
            let listen = match e.listen.as_str() {
                "prerequest" => EventKind::Prerequest,
                "test" => EventKind::Test,
                _ => return None,
            };
            Some(Event {
                listen,
                script: Script {
                    exec: e.script.map(|s| s.exec).unwrap_or_default(),
                },
            })
        })
        .collect()
}

fn map_example(value: &serde_json::Value) -> Option<ExampleResponse> {
    let object = value.as_object()?;
    Some(ExampleResponse {
        name: object.get("name")?.as_str()?.to_string(),
        code: object
            .get("code")
            .and_then(serde_json::Value::as_u64)
            .and_then(|c| u16::try_from(c).ok()),
        status: object
            .get("status")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string),
        body: object
            .get("body")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SCHEMA_V21: &str =
        "https://schema.getpostman.com/json/collection/v2.1.0/collection.json";

    fn document(body: &str) -> Vec<u8> {
        format!(
            r#"{{
                "info": {{"name": "Fixture", "schema": "{SCHEMA_V21}"}},
                {body}
            }}"#
        )
        .into_bytes()
    }

    #[test]
    fn test_load_minimal() {
        let collection = load_collection_from_slice(&document(r#""item": []"#)).unwrap();
        assert_eq!(collection.info.name, "Fixture");
        assert_eq!(collection.info.schema, SchemaVersion::V2_1);
        assert_eq!(collection.request_count(), 0);
    }

    #[test]
    fn test_unknown_schema_fails_load() {
        let json = br#"{
            "info": {"name": "Old", "schema": "https://schema.getpostman.com/json/collection/v1.0.0/collection.json"},
            "item": []
        }"#;
        assert!(matches!(
            load_collection_from_slice(json),
            Err(LoadError::UnsupportedSchema(_))
        ));
    }

    #[test]
    fn test_missing_schema_fails_load() {
        let json = br#"{"info": {"name": "NoSchema"}, "item": []}"#;
        assert!(matches!(
            load_collection_from_slice(json),
            Err(LoadError::UnsupportedSchema(_))
        ));
    }

    #[test]
    fn test_nested_tree_with_auth_and_variables() {
        let collection = load_collection_from_slice(&document(
            r#""auth": {"type": "bearer", "bearer": [{"key": "token", "value": "{{T}}"}]},
               "variable": [{"key": "base", "value": "https://api.example.com"}],
               "item": [
                   {"name": "Users", "auth": {"type": "noauth"},
                    "variable": [{"key": "path", "value": "users"}],
                    "item": [
                        {"name": "List", "request": {"method": "GET", "url": "{{base}}/{{path}}"}}
                    ]}
               ]"#,
        ))
        .unwrap();

        assert_eq!(collection.auth.as_ref().unwrap().auth_type, AuthType::Bearer);
        assert_eq!(collection.variables[0].key, "base");

        let folder = collection.find_folder("Users").unwrap();
        assert!(folder.auth.as_ref().unwrap().is_noauth());
        assert_eq!(folder.variables[0].key, "path");

        let request = collection.find_request("List").unwrap();
        assert_eq!(request.method, HttpMethod::Get);
    }

    #[test]
    fn test_structured_url_mapping() {
        let collection = load_collection_from_slice(&document(
            r#""item": [{"name": "R", "request": {"method": "GET", "url": {
                "raw": "https://api.example.com/users/:id?active=true",
                "protocol": "https",
                "host": ["api", "example", "com"],
                "path": ["users", ":id"],
                "query": [{"key": "active", "value": "true"},
                          {"key": "debug", "value": "1", "disabled": true}],
                "variable": [{"key": "id", "value": "1"}]
            }}}]"#,
        ))
        .unwrap();

        let request = collection.find_request("R").unwrap();
        assert_eq!(request.url.host, vec!["api", "example", "com"]);
        assert_eq!(request.url.path, vec!["users", ":id"]);
        assert_eq!(request.url.query.len(), 2);
        assert!(request.url.query[1].disabled);
        assert_eq!(request.url.path_vars[0].key, "id");
    }

    #[test]
    fn test_body_modes() {
        let collection = load_collection_from_slice(&document(
            r#""item": [
                {"name": "RawJson", "request": {"method": "POST", "url": "https://x.example/a",
                    "body": {"mode": "raw", "raw": "{\"a\": 1}",
                             "options": {"raw": {"language": "json"}}}}},
                {"name": "Form", "request": {"method": "POST", "url": "https://x.example/b",
                    "body": {"mode": "urlencoded",
                             "urlencoded": [{"key": "k", "value": "v"}]}}},
                {"name": "NoBody", "request": {"method": "POST", "url": "https://x.example/c",
                    "body": {"mode": "none"}}}
            ]"#,
        ))
        .unwrap();

        let raw = collection.find_request("RawJson").unwrap();
        assert!(matches!(
            raw.body,
            Some(Body::Raw { ref language, .. }) if language.as_deref() == Some("json")
        ));

        let form = collection.find_request("Form").unwrap();
        assert!(matches!(form.body, Some(Body::Urlencoded { .. })));

        let none = collection.find_request("NoBody").unwrap();
        assert!(none.body.is_none());
    }

    #[test]
    fn test_events_and_scripts() {
        let collection = load_collection_from_slice(&document(
            r#""item": [{"name": "R",
                "event": [
                    {"listen": "prerequest", "script": {"exec": ["setup();"]}},
                    {"listen": "test", "script": {"exec": ["check();"]}},
                    {"listen": "unknown", "script": {"exec": ["ignored();"]}}
                ],
                "request": {"method": "GET", "url": "https://x.example/r"}}]"#,
        ))
        .unwrap();

        let request = collection.find_request("R").unwrap();
        assert_eq!(request.events.len(), 2);
        assert_eq!(request.events[0].listen, EventKind::Prerequest);
        assert_eq!(request.events[0].script.source(), "setup();");
    }

    #[test]
    fn test_malformed_item_rejected() {
        let result = load_collection_from_slice(&document(r#""item": [{"name": "Ghost"}]"#));
        assert!(matches!(result, Err(LoadError::Invalid(_))));
    }

    #[test]
    fn test_unknown_method_rejected() {
        let result = load_collection_from_slice(&document(
            r#""item": [{"name": "R", "request": {"method": "TELEPORT", "url": "https://x.example"}}]"#,
        ));
        assert!(matches!(result, Err(LoadError::Invalid(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collection.json");
        std::fs::write(&path, document(r#""item": []"#)).unwrap();

        let collection = load_collection_from_path(&path).unwrap();
        assert_eq!(collection.info.name, "Fixture");

        assert!(matches!(
            load_collection_from_path(dir.path().join("absent.json")),
            Err(LoadError::Io(_))
        ));
    }

    #[test]
    fn test_disabled_variable_mapping() {
        let collection = load_collection_from_slice(&document(
            r#""variable": [{"key": "off", "value": "x", "disabled": true}], "item": []"#,
        ))
        .unwrap();
        assert!(!collection.variables[0].enabled);
    }
}
