//! Connection testing types

use serde::{Deserialize, Serialize};

/// Result of a `ping` round trip. MCP defines it as an empty object; any
/// `_meta` the peer attaches is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmptyResult {
    /// Optional metadata
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub _meta: Option<serde_json::Value>,
}
