//! HTTP header types
//!
//! Header keys compare case-insensitively but preserve their original
//! casing when emitted.

use serde::{Deserialize, Serialize};

/// A single request header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Header name, original casing preserved
    pub key: String,
    /// Header value, may contain variable templates
    #[serde(default)]
    pub value: String,
    /// Whether the header is sent
    #[serde(default)]
    pub disabled: bool,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Header {
    /// Creates a new enabled header.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            disabled: false,
            description: None,
        }
    }

    /// Creates a disabled header.
    #[must_use]
    pub fn disabled(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            disabled: true,
            ..Self::new(key, value)
        }
    }

    /// Returns true if this header's key matches `name`, ignoring case.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.key.eq_ignore_ascii_case(name)
    }
}

/// An ordered list of headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers {
    items: Vec<Header>,
}

impl Headers {
    /// Creates an empty header list.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Appends a header.
    pub fn push(&mut self, header: Header) {
        self.items.push(header);
    }

    /// Returns an iterator over enabled headers.
    pub fn enabled(&self) -> impl Iterator<Item = &Header> {
        self.items.iter().filter(|h| !h.disabled)
    }

    /// Finds the first header matching `name`, ignoring case.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Header> {
        self.items.iter().find(|h| h.matches(name))
    }

    /// Returns all headers, enabled and disabled.
    #[must_use]
    pub fn all(&self) -> &[Header] {
        &self.items
    }

    /// Returns the number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<Header> for Headers {
    fn from_iter<T: IntoIterator<Item = Header>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Headers {
    type Item = Header;
    type IntoIter = std::vec::IntoIter<Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
