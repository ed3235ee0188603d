//! Raw collection document types
//!
//! Serde mirror of the Postman Collection v2.x JSON format. These
//! types absorb the format's variations (`#[serde(default)]`
//! everywhere, untagged URL forms) and are mapped into the domain
//! model by the loader; nothing outside the loader sees them.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

/// Root of a collection document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCollection {
    pub info: RawInfo,
    #[serde(default)]
    pub item: Vec<RawItem>,
    #[serde(default)]
    pub variable: Vec<RawVariable>,
    #[serde(default)]
    pub auth: Option<RawAuth>,
    #[serde(default)]
    pub event: Vec<RawEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(rename = "_postman_id", default)]
    pub postman_id: Option<String>,
}

/// Folder when `item` is present, request when `request` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawItem {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub item: Option<Vec<Self>>,
    #[serde(default)]
    pub request: Option<RawRequest>,
    #[serde(default)]
    pub response: Vec<serde_json::Value>,
    #[serde(default)]
    pub event: Vec<RawEvent>,
    #[serde(default)]
    pub auth: Option<RawAuth>,
    #[serde(default)]
    pub variable: Vec<RawVariable>,
}

impl RawItem {
    #[must_use]
    pub const fn is_folder(&self) -> bool {
        self.item.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRequest {
    pub method: String,
    #[serde(default)]
    pub url: RawUrl,
    #[serde(default)]
    pub header: Vec<RawHeader>,
    #[serde(default)]
    pub body: Option<RawBody>,
    #[serde(default)]
    pub auth: Option<RawAuth>,
    #[serde(default)]
    pub description: Option<String>,
}

/// URLs appear as plain strings or structured objects.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum RawUrl {
    #[default]
    Empty,
    Simple(String),
    Structured(RawUrlStructured),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawUrlStructured {
    #[serde(default)]
    pub raw: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub host: Vec<String>,
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub path: Vec<String>,
    #[serde(default)]
    pub query: Vec<RawQueryParam>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub variable: Vec<RawPathVariable>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawQueryParam {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPathVariable {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawHeader {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBody {
    pub mode: String,
    #[serde(default)]
    pub raw: Option<String>,
    #[serde(default)]
    pub urlencoded: Vec<RawFormParam>,
    #[serde(default)]
    pub formdata: Vec<RawFormParam>,
    #[serde(default)]
    pub file: Option<RawBodyFile>,
    #[serde(default)]
    pub graphql: Option<RawGraphQl>,
    #[serde(default)]
    pub options: Option<RawBodyOptions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFormParam {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(rename = "type", default)]
    pub param_type: Option<String>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBodyFile {
    #[serde(default)]
    pub src: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawGraphQl {
    pub query: String,
    #[serde(default)]
    pub variables: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBodyOptions {
    #[serde(default)]
    pub raw: Option<RawRawOptions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRawOptions {
    #[serde(default)]
    pub language: Option<String>,
}

/// Auth keeps one parameter table per type; only the one matching
/// `auth_type` is meaningful.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAuth {
    #[serde(rename = "type")]
    pub auth_type: String,
    #[serde(default)]
    pub basic: Vec<RawAuthParam>,
    #[serde(default)]
    pub bearer: Vec<RawAuthParam>,
    #[serde(default)]
    pub apikey: Vec<RawAuthParam>,
    #[serde(default)]
    pub oauth1: Vec<RawAuthParam>,
    #[serde(default)]
    pub oauth2: Vec<RawAuthParam>,
    #[serde(default)]
    pub digest: Vec<RawAuthParam>,
    #[serde(default)]
    pub awsv4: Vec<RawAuthParam>,
    #[serde(default)]
    pub ntlm: Vec<RawAuthParam>,
    #[serde(default)]
    pub hawk: Vec<RawAuthParam>,
}

impl RawAuth {
    /// The parameter table matching the declared type.
    #[must_use]
    pub fn parameters(&self) -> &[RawAuthParam] {
        match self.auth_type.as_str() {
            "basic" => &self.basic,
            "bearer" => &self.bearer,
            "apikey" => &self.apikey,
            "oauth1" => &self.oauth1,
            "oauth2" => &self.oauth2,
            "digest" => &self.digest,
            "awsv4" => &self.awsv4,
            "ntlm" => &self.ntlm,
            "hawk" => &self.hawk,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAuthParam {
    pub key: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawVariable {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(rename = "type", default)]
    pub var_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub listen: String,
    #[serde(default)]
    pub script: Option<RawScript>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawScript {
    #[serde(default)]
    pub exec: Vec<String>,
}
