//! Request body types
//!
//! A body is a tagged union keyed by its mode. A source document with
//! `mode = none` maps to an absent body rather than a variant here.

use serde::{Deserialize, Serialize};

/// A key-value entry for urlencoded and formdata bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormParam {
    /// Field name
    pub key: String,
    /// Field value (text fields)
    #[serde(default)]
    pub value: String,
    /// Source path for file fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Disabled entries are skipped during encoding
    #[serde(default)]
    pub disabled: bool,
}

impl FormParam {
    /// Creates a new text field.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            src: None,
            disabled: false,
        }
    }

    /// Creates a file field pointing at a source path.
    #[must_use]
    pub fn file(key: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: String::new(),
            src: Some(src.into()),
            disabled: false,
        }
    }

    /// Returns true if this is a file field.
    #[must_use]
    pub const fn is_file(&self) -> bool {
        self.src.is_some()
    }
}

/// Request body, tagged by mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Body {
    /// Raw text; `language` is the editor hint from the source ("json", "xml", ...)
    Raw {
        /// The raw content
        content: String,
        /// Language hint used to pick a Content-Type
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    /// `application/x-www-form-urlencoded` fields
    Urlencoded {
        /// The form fields
        params: Vec<FormParam>,
    },
    /// `multipart/form-data` fields, text or file
    Formdata {
        /// The form fields
        params: Vec<FormParam>,
    },
    /// A single file used verbatim as the body
    File {
        /// Path to the file
        src: String,
    },
    /// A GraphQL query with optional variables JSON
    Graphql {
        /// The query document
        query: String,
        /// Variables as a JSON string
        #[serde(default, skip_serializing_if = "Option::is_none")]
        variables: Option<String>,
    },
}

impl Body {
    /// Creates a raw JSON body.
    #[must_use]
    pub fn json(content: impl Into<String>) -> Self {
        Self::Raw {
            content: content.into(),
            language: Some("json".to_string()),
        }
    }

    /// Creates a raw plain-text body.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Raw {
            content: content.into(),
            language: None,
        }
    }

    /// The Content-Type this body implies when none is set explicitly.
    /// Formdata returns `None`: the boundary is chosen at dispatch time.
    #[must_use]
    pub fn inferred_content_type(&self) -> Option<&'static str> {
        match self {
            Self::Raw { language, .. } => match language.as_deref() {
                Some("json") => Some("application/json"),
                Some("xml") => Some("application/xml"),
                Some("html") => Some("text/html"),
                _ => Some("text/plain"),
            },
            Self::Urlencoded { .. } => Some("application/x-www-form-urlencoded"),
            Self::Formdata { .. } => None,
            Self::File { .. } => Some("application/octet-stream"),
            Self::Graphql { .. } => Some("application/json"),
        }
    }

    /// Returns true when the raw content claims or appears to be JSON.
    #[must_use]
    pub fn is_json_raw(&self) -> bool {
        match self {
            Self::Raw { content, language } => {
                language.as_deref() == Some("json")
                    || serde_json::from_str::<serde_json::Value>(content).is_ok()
            }
            _ => false,
        }
    }
}
