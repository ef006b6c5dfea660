//! Error taxonomy for MCP client operations.
//!
//! Every fallible client operation reports through the single [`McpError`] type.
//! Its [`ErrorKind`] tells callers *which* failure happened, so a schema
//! violation in a tool result can be told apart from an error object sent by
//! the server, and both from a timeout or a closed session.
//!
//! ## Example
//!
//! ```rust
//! use syncmcp_protocol::error::{ErrorKind, McpError};
//!
//! let err = McpError::remote(-32601, "Method not found");
//! assert_eq!(err.kind, ErrorKind::Remote);
//! assert_eq!(err.code(), Some(-32601));
//! assert!(!err.is_validation());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type alias for MCP operations
pub type McpResult<T> = std::result::Result<T, McpError>;

/// Unified MCP error type
///
/// The `context` field is boxed to keep `Result<T, McpError>` small.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpError {
    /// Error classification
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// JSON-RPC error code, set for errors the remote peer reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    /// Additional context (boxed to keep McpError small)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Box<ErrorContext>>,
}

/// Additional error context
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Operation being performed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// Request ID for tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Individual schema violations, in the order the validator reported them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<String>,
    /// `data` member of a remote JSON-RPC error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Error classification for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Operation attempted before the handshake completed, or while it is running
    NotReady,
    /// The session was closed before or while the operation ran
    SessionClosed,
    /// The transport failed to send or deliver
    Transport,
    /// No matching response arrived within the bound
    Timeout,
    /// The server answered with a JSON-RPC error object
    Remote,
    /// A tool's structured result does not satisfy its declared output schema
    Validation,
    /// The server negotiated a protocol revision this client does not support
    ProtocolVersionMismatch,
    /// A payload could not be encoded or decoded
    Serialization,
    /// A response arrived but its shape is not what the method promises
    InvalidResponse,
    /// Client configuration could not be applied
    Configuration,
    /// Internal invariant failure
    Internal,
}

impl McpError {
    /// Create a new error with kind and message
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            context: None,
        }
    }

    /// Create a not-ready (protocol order) error for `operation`
    #[must_use]
    pub fn not_ready(operation: impl Into<String>, state: impl fmt::Display) -> Self {
        let operation = operation.into();
        Self::new(
            ErrorKind::NotReady,
            format!("Client not ready for '{}': session is {}", operation, state),
        )
        .with_operation(operation)
    }

    /// Create a session closed error
    #[must_use]
    pub fn session_closed() -> Self {
        Self::new(ErrorKind::SessionClosed, "Session closed")
    }

    /// Create a transport error
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Create an error from a JSON-RPC error object returned by the server
    #[must_use]
    pub fn remote(code: i32, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut err = Self::new(
            ErrorKind::Remote,
            format!("Server returned error {}: {}", code, message),
        );
        err.code = Some(code);
        err
    }

    /// Create a validation failure listing every violation found in a tool result
    #[must_use]
    pub fn validation(tool_name: &str, violations: Vec<String>) -> Self {
        let message = format!(
            "Validation failed for structured content of tool '{}': {}",
            tool_name,
            violations.join("; ")
        );
        let mut err = Self::new(ErrorKind::Validation, message).with_operation("tools/call");
        if let Some(ctx) = err.context.as_mut() {
            ctx.violations = violations;
        }
        err
    }

    /// Create a protocol version mismatch error
    #[must_use]
    pub fn protocol_version_mismatch(
        client_version: impl Into<String>,
        server_version: impl Into<String>,
    ) -> Self {
        let client = client_version.into();
        let server = server_version.into();
        Self::new(
            ErrorKind::ProtocolVersionMismatch,
            format!(
                "Protocol version mismatch: client={}, server={}",
                client, server
            ),
        )
    }

    /// Create a serialization error
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    /// Create an invalid response error
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidResponse, message)
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Set the operation context
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Set the request ID context
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl fmt::Display) -> Self {
        self.context_mut().request_id = Some(request_id.to_string());
        self
    }

    /// Attach the `data` member of a remote error
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.context_mut().data = Some(data);
        self
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        self.context.get_or_insert_with(Box::default)
    }

    /// JSON-RPC code reported by the server, for [`ErrorKind::Remote`] errors
    #[must_use]
    pub const fn code(&self) -> Option<i32> {
        self.code
    }

    /// Schema violations carried by a [`ErrorKind::Validation`] error
    #[must_use]
    pub fn violations(&self) -> &[String] {
        self.context
            .as_ref()
            .map_or(&[], |ctx| ctx.violations.as_slice())
    }

    /// Operation recorded in the context, if any
    #[must_use]
    pub fn operation(&self) -> Option<&str> {
        self.context.as_ref()?.operation.as_deref()
    }

    /// Check if this is an output validation failure
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self.kind, ErrorKind::Validation)
    }

    /// Check if this error came from a JSON-RPC error object
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self.kind, ErrorKind::Remote)
    }

    /// Check if the call timed out
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout)
    }

    /// Check if the session was closed under the call
    #[must_use]
    pub const fn is_session_closed(&self) -> bool {
        matches!(self.kind, ErrorKind::SessionClosed)
    }

    /// Check if the call was rejected for protocol order
    #[must_use]
    pub const fn is_not_ready(&self) -> bool {
        matches!(self.kind, ErrorKind::NotReady)
    }

    /// Check if this error is retryable
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout | ErrorKind::Transport)
    }
}

impl ErrorKind {
    /// Get a human-readable description
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::NotReady => "Client not ready",
            Self::SessionClosed => "Session closed",
            Self::Transport => "Transport error",
            Self::Timeout => "Operation timed out",
            Self::Remote => "Remote error",
            Self::Validation => "Validation failed",
            Self::ProtocolVersionMismatch => "Protocol version mismatch",
            Self::Serialization => "Serialization error",
            Self::InvalidResponse => "Invalid response",
            Self::Configuration => "Configuration error",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for McpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ctx) = &self.context {
            if let Some(op) = &ctx.operation {
                write!(f, " (operation: {})", op)?;
            }
            if let Some(id) = &ctx.request_id {
                write!(f, " (request: {})", id)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl std::error::Error for McpError {}

impl From<serde_json::Error> for McpError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}
