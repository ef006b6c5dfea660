//! Core protocol types shared by the other type modules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Protocol version string, e.g. `"2025-06-18"`
pub type ProtocolVersion = String;

/// Pagination cursor
pub type Cursor = String;

/// URI string
pub type Uri = String;

/// MIME type string
pub type MimeType = String;

/// Base64 encoded data
pub type Base64String = String;

/// Name and version of an MCP implementation, exchanged during the handshake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    /// Implementation name
    pub name: String,
    /// Implementation display title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Implementation version
    pub version: String,
}

impl Implementation {
    /// Create an implementation record from a name and version
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            version: version.into(),
        }
    }
}

impl Default for Implementation {
    fn default() -> Self {
        Self::new(crate::SDK_NAME, crate::SDK_VERSION)
    }
}

/// Display hints attached to content. Clients may ignore all of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotations {
    /// Role-based audience hint, `"user"` or `"assistant"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<Vec<String>>,
    /// Subjective priority hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,
    /// ISO 8601 timestamp of last modification
    #[serde(rename = "lastModified", skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    /// Application-specific extensions
    #[serde(flatten)]
    pub custom: HashMap<String, serde_json::Value>,
}
