//! Client configuration
//!
//! [`ClientConfig`] can be built in code, through
//! [`ClientBuilder`](super::builder::ClientBuilder), or loaded from JSON. Every
//! field has a default, so a partial document is enough:
//!
//! ```rust
//! use std::time::Duration;
//! use syncmcp_client::ClientConfig;
//!
//! let config: ClientConfig =
//!     serde_json::from_str(r#"{ "request_timeout_ms": 5000 }"#).unwrap();
//! assert_eq!(config.request_timeout, Duration::from_secs(5));
//! assert!(config.validate_tool_output);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use syncmcp_protocol::{ClientCapabilities, DEFAULT_TIMEOUT_MS, Implementation};

/// Configuration for an MCP client session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Bound on each request round trip after the handshake
    #[serde(rename = "request_timeout_ms", with = "duration_ms_serde")]
    pub request_timeout: Duration,

    /// Bound on the `initialize` round trip
    #[serde(rename = "initialization_timeout_ms", with = "duration_ms_serde")]
    pub initialization_timeout: Duration,

    /// Check `structuredContent` of tool results against declared output
    /// schemas. When off, `call_tool` also skips the lazy `tools/list`.
    pub validate_tool_output: bool,

    /// Reported to the server as `clientInfo`
    pub client_info: Implementation,

    /// Advertised to the server during the handshake
    pub capabilities: ClientCapabilities,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            initialization_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            validate_tool_output: true,
            client_info: Implementation::default(),
            capabilities: ClientCapabilities::default(),
        }
    }
}

mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(20));
        assert_eq!(config.initialization_timeout, Duration::from_secs(20));
        assert!(config.validate_tool_output);
        assert_eq!(config.client_info.name, "syncmcp-client");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ClientConfig = serde_json::from_value(json!({
            "initialization_timeout_ms": 1500,
            "validate_tool_output": false,
            "client_info": {"name": "config-test", "version": "0.0.1"}
        }))
        .unwrap();

        assert_eq!(config.initialization_timeout, Duration::from_millis(1500));
        assert_eq!(config.request_timeout, Duration::from_secs(20));
        assert!(!config.validate_tool_output);
        assert_eq!(config.client_info, Implementation::new("config-test", "0.0.1"));
    }

    #[test]
    fn test_serializes_durations_as_millis() {
        let value = serde_json::to_value(ClientConfig::default()).unwrap();
        assert_eq!(value["request_timeout_ms"], json!(20_000));
        assert_eq!(value["capabilities"], json!({}));
    }
}
