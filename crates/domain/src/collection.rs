//! Collection tree model
//!
//! A collection owns a tree of items, each either a folder or a
//! request. Folders own their children exclusively; there are no parent
//! back-references. Ancestor paths are computed during traversal
//! instead (see [`crate::walk`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Auth;
use crate::error::{DomainError, DomainResult};
use crate::event::Event;
use crate::request::Request;
use crate::variable::Variable;
use crate::walk::RequestWalk;

/// The collection format revisions we execute against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaVersion {
    /// Collection format v2.0.0
    #[serde(rename = "v2.0")]
    V2_0,
    /// Collection format v2.1.0
    #[serde(rename = "v2.1")]
    V2_1,
}

impl SchemaVersion {
    /// Detects the version from a schema URL or shorthand string.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::UnsupportedSchema`] for anything else;
    /// resolution never crosses schema boundaries.
    pub fn detect(schema: &str) -> DomainResult<Self> {
        if schema.contains("v2.1") || schema == "2.1" {
            Ok(Self::V2_1)
        } else if schema.contains("v2.0") || schema == "2.0" {
            Ok(Self::V2_0)
        } else {
            Err(DomainError::UnsupportedSchema(schema.to_string()))
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V2_0 => f.write_str("v2.0"),
            Self::V2_1 => f.write_str("v2.1"),
        }
    }
}

impl FromStr for SchemaVersion {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        Self::detect(s)
    }
}

/// Collection metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Collection name
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The format revision the source document declared
    pub schema: SchemaVersion,
}

/// A named, possibly nested container of items.
///
/// Folders contribute a variable scope and may override auth for
/// everything beneath them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Unique identifier
    pub id: Uuid,
    /// Folder name
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Folder-level auth override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<Auth>,
    /// Folder-scoped variables
    #[serde(default)]
    pub variables: Vec<Variable>,
    /// Attached script events
    #[serde(default)]
    pub events: Vec<Event>,
    /// Child items
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Folder {
    /// Creates an empty folder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            description: None,
            auth: None,
            variables: Vec::new(),
            events: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Sets the folder auth.
    #[must_use]
    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Adds a folder-scoped variable.
    #[must_use]
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.push(Variable::new(key, value));
        self
    }

    /// Adds a child item.
    #[must_use]
    pub fn with_item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }
}

/// A node in the collection tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item {
    /// A nested folder
    Folder(Folder),
    /// A request leaf
    Request(Request),
}

impl Item {
    /// The item's name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Folder(f) => &f.name,
            Self::Request(r) => &r.name,
        }
    }

    /// The item's id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        match self {
            Self::Folder(f) => f.id,
            Self::Request(r) => r.id,
        }
    }

    /// Returns the folder if this item is one.
    #[must_use]
    pub const fn as_folder(&self) -> Option<&Folder> {
        match self {
            Self::Folder(f) => Some(f),
            Self::Request(_) => None,
        }
    }

    /// Returns the request if this item is one.
    #[must_use]
    pub const fn as_request(&self) -> Option<&Request> {
        match self {
            Self::Folder(_) => None,
            Self::Request(r) => Some(r),
        }
    }
}

/// The root container: items, variables, auth and events.
///
/// Collections are constructed by the loader and never mutated by the
/// execution core; clone one to modify it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Collection metadata
    pub info: CollectionInfo,
    /// Root items
    #[serde(default)]
    pub items: Vec<Item>,
    /// Collection-scoped variables
    #[serde(default)]
    pub variables: Vec<Variable>,
    /// Collection-level auth, inherited by everything below
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<Auth>,
    /// Attached script events
    #[serde(default)]
    pub events: Vec<Event>,
}

impl Collection {
    /// Creates an empty v2.1 collection.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: CollectionInfo {
                name: name.into(),
                description: None,
                schema: SchemaVersion::V2_1,
            },
            items: Vec::new(),
            variables: Vec::new(),
            auth: None,
            events: Vec::new(),
        }
    }

    /// Sets the collection auth.
    #[must_use]
    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Adds a collection-scoped variable.
    #[must_use]
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.push(Variable::new(key, value));
        self
    }

    /// Adds a root item.
    #[must_use]
    pub fn with_item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    /// Walks every request in depth-first pre-order, lazily, yielding
    /// each request with its ancestor folder path.
    #[must_use]
    pub fn walk_requests(&self) -> RequestWalk<'_> {
        RequestWalk::new(&self.items)
    }

    /// Finds the first request with the given name, depth-first.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::RequestNotFound`] when no request matches.
    pub fn find_request(&self, name: &str) -> DomainResult<&Request> {
        self.walk_requests()
            .map(|entry| entry.request)
            .find(|r| r.name == name)
            .ok_or_else(|| DomainError::RequestNotFound(name.to_string()))
    }

    /// Finds the first folder with the given name, depth-first.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::FolderNotFound`] when no folder matches.
    pub fn find_folder(&self, name: &str) -> DomainResult<&Folder> {
        fn search<'a>(items: &'a [Item], name: &str) -> Option<&'a Folder> {
            for item in items {
                if let Item::Folder(folder) = item {
                    if folder.name == name {
                        return Some(folder);
                    }
                    if let Some(found) = search(&folder.items, name) {
                        return Some(found);
                    }
                }
            }
            None
        }
        search(&self.items, name).ok_or_else(|| DomainError::FolderNotFound(name.to_string()))
    }

    /// Total number of requests in the tree.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.walk_requests().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_collection() -> Collection {
        Collection::new("Sample")
            .with_item(Item::Request(Request::new("Ping")))
            .with_item(Item::Folder(
                Folder::new("Users")
                    .with_item(Item::Request(Request::new("List Users")))
                    .with_item(Item::Folder(
                        Folder::new("Admin")
                            .with_item(Item::Request(Request::new("Delete User"))),
                    )),
            ))
    }

    #[test]
    fn test_schema_detection() {
        assert_eq!(
            SchemaVersion::detect("https://schema.getpostman.com/json/collection/v2.1.0/collection.json")
                .expect("known schema"),
            SchemaVersion::V2_1
        );
        assert_eq!(
            SchemaVersion::detect("v2.0").expect("known schema"),
            SchemaVersion::V2_0
        );
        assert!(SchemaVersion::detect("v1.0").is_err());
    }

    #[test]
    fn test_request_count_recurses() {
        assert_eq!(sample_collection().request_count(), 3);
    }

    #[test]
    fn test_find_request_depth_first() {
        let collection = sample_collection();
        let request = collection.find_request("Delete User").expect("present");
        assert_eq!(request.name, "Delete User");
        assert!(collection.find_request("Missing").is_err());
    }

    #[test]
    fn test_find_folder_nested() {
        let collection = sample_collection();
        assert_eq!(collection.find_folder("Admin").expect("present").name, "Admin");
        assert!(collection.find_folder("Ops").is_err());
    }
}
