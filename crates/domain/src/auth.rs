//! Authentication configuration
//!
//! An `Auth` pairs a type with a flat parameter map. Interpretation of
//! the parameters (which are required, where they land on the wire) is
//! the application layer's concern; the domain only carries them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// The authentication schemes a collection may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    /// Explicitly no authentication; blocks inheritance
    NoAuth,
    /// HTTP Basic
    Basic,
    /// Bearer token
    Bearer,
    /// API key in a header or query parameter
    ApiKey,
    /// OAuth 1.0a signed requests
    OAuth1,
    /// OAuth 2.0 access token
    OAuth2,
    /// HTTP Digest
    Digest,
    /// AWS Signature v4
    AwsV4,
    /// NTLM
    Ntlm,
    /// Hawk
    Hawk,
}

impl AuthType {
    /// Returns the type in its source-document spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoAuth => "noauth",
            Self::Basic => "basic",
            Self::Bearer => "bearer",
            Self::ApiKey => "apikey",
            Self::OAuth1 => "oauth1",
            Self::OAuth2 => "oauth2",
            Self::Digest => "digest",
            Self::AwsV4 => "awsv4",
            Self::Ntlm => "ntlm",
            Self::Hawk => "hawk",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthType {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s.to_lowercase().as_str() {
            "noauth" => Ok(Self::NoAuth),
            "basic" => Ok(Self::Basic),
            "bearer" => Ok(Self::Bearer),
            "apikey" => Ok(Self::ApiKey),
            "oauth1" => Ok(Self::OAuth1),
            "oauth2" => Ok(Self::OAuth2),
            "digest" => Ok(Self::Digest),
            "awsv4" => Ok(Self::AwsV4),
            "ntlm" => Ok(Self::Ntlm),
            "hawk" => Ok(Self::Hawk),
            other => Err(DomainError::UnknownAuthType(other.to_string())),
        }
    }
}

/// An authentication declaration attached to a collection, folder or request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auth {
    /// The scheme
    #[serde(rename = "type")]
    pub auth_type: AuthType,
    /// Type-specific parameters; values may contain variable templates
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl Auth {
    /// Creates an auth declaration with no parameters.
    #[must_use]
    pub fn new(auth_type: AuthType) -> Self {
        Self {
            auth_type,
            parameters: BTreeMap::new(),
        }
    }

    /// Creates an explicit `noauth` declaration.
    #[must_use]
    pub fn noauth() -> Self {
        Self::new(AuthType::NoAuth)
    }

    /// Creates a bearer declaration with its token.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::new(AuthType::Bearer).with_param("token", token)
    }

    /// Creates a basic declaration with credentials.
    #[must_use]
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(AuthType::Basic)
            .with_param("username", username)
            .with_param("password", password)
    }

    /// Creates an API-key declaration placed in a header.
    #[must_use]
    pub fn api_key(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(AuthType::ApiKey)
            .with_param("key", key)
            .with_param("value", value)
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Looks up a parameter value.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    /// Returns true when this declaration is an explicit `noauth`.
    #[must_use]
    pub const fn is_noauth(&self) -> bool {
        matches!(self.auth_type, AuthType::NoAuth)
    }
}
