//! # SyncMCP Protocol
//!
//! Message model and protocol types shared by the SyncMCP client crates.
//!
//! ## What lives here
//!
//! - [`jsonrpc`]: JSON-RPC 2.0 requests, responses, notifications and the
//!   [`JsonRpcMessage`] envelope used to classify incoming traffic
//! - [`types`]: MCP payloads for the handshake, tool listing and tool calls
//! - [`error`]: the [`McpError`] taxonomy every client operation reports through
//! - [`validation`]: checking a tool's `structuredContent` against its declared
//!   `outputSchema`
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use syncmcp_protocol::validation::{JsonSchemaValidator, OutputValidator};
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": { "result": { "type": "number" } },
//!     "required": ["result"]
//! });
//! let validator = JsonSchemaValidator::new();
//! let outcome = validator.validate(&schema, &json!({ "result": "5" })).unwrap();
//! assert!(!outcome.is_valid());
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod jsonrpc;
pub mod types;
pub mod validation;

pub use error::{ErrorContext, ErrorKind, McpError, McpResult};
pub use jsonrpc::{
    JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    JsonRpcResponsePayload, JsonRpcVersion, RequestId, ResponseId,
};
pub use types::{
    CallToolRequest, CallToolResult, ClientCapabilities, Implementation, InitializeRequest,
    InitializeResult, ListToolsResult, ServerCapabilities, Tool,
};
pub use validation::{JsonSchemaValidator, OutputValidator, SchemaViolation, ValidationOutcome};

/// Alias kept so transport code can speak of message ids
pub type MessageId = RequestId;

/// Latest MCP protocol revision, sent in every `initialize` request
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// Protocol revisions a server may answer the handshake with
pub const SUPPORTED_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

/// Default bound on a single request round trip, in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 20_000;

/// SDK name reported as `clientInfo.name` unless configured otherwise
pub const SDK_NAME: &str = "syncmcp-client";

/// SDK version reported as `clientInfo.version` unless configured otherwise
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Well-known MCP method names
pub mod methods {
    /// Handshake request
    pub const INITIALIZE: &str = "initialize";
    /// Sent by the client once the handshake response has been accepted
    pub const INITIALIZED: &str = "notifications/initialized";
    /// Liveness check, valid in both directions
    pub const PING: &str = "ping";
    /// Descriptor listing
    pub const LIST_TOOLS: &str = "tools/list";
    /// Tool invocation
    pub const CALL_TOOL: &str = "tools/call";
    /// Server notification that its tool list changed
    pub const TOOLS_LIST_CHANGED: &str = "notifications/tools/list_changed";
    /// Server log message notification
    pub const LOG_MESSAGE: &str = "notifications/message";
}

/// Returns `true` if `version` is a protocol revision this client can speak.
pub fn is_supported_version(version: &str) -> bool {
    SUPPORTED_VERSIONS.contains(&version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constants() {
        assert!(SUPPORTED_VERSIONS.contains(&PROTOCOL_VERSION));
        // Latest should be first in supported versions
        assert_eq!(SUPPORTED_VERSIONS[0], PROTOCOL_VERSION);
    }

    #[test]
    fn test_supported_version_check() {
        assert!(is_supported_version("2024-11-05"));
        assert!(!is_supported_version("1999-01-01"));
    }

    #[test]
    fn test_method_names() {
        assert_eq!(methods::LIST_TOOLS, "tools/list");
        assert_eq!(methods::CALL_TOOL, "tools/call");
        assert_eq!(methods::INITIALIZED, "notifications/initialized");
    }
}
