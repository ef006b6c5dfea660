//! Transport error types.

use thiserror::Error;

use syncmcp_protocol::McpError;

/// A specialized `Result` type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Represents errors that can occur during transport operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// Failed to establish a connection.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// An established connection was lost.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// The transport is not connected.
    #[error("Transport not connected")]
    NotConnected,

    /// Failed to send a message.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to receive a message.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// The operation did not complete within the transport's own timeout.
    #[error("Operation timed out")]
    Timeout,

    /// An underlying I/O error occurred.
    #[error("IO error: {0}")]
    Io(String),

    /// An unexpected internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<TransportError> for McpError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => McpError::timeout(err.to_string()),
            other => McpError::transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncmcp_protocol::ErrorKind;

    #[test]
    fn test_into_mcp_error() {
        let err: McpError = TransportError::SendFailed("pipe closed".into()).into();
        assert_eq!(err.kind, ErrorKind::Transport);
        assert!(err.message.contains("pipe closed"));

        let err: McpError = TransportError::Timeout.into();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert!(matches!(TransportError::from(io), TransportError::Io(m) if m == "gone"));
    }
}
