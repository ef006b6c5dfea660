//! Transport connection state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current state of a transport connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    /// The transport is not connected.
    Disconnected,
    /// The transport is in the process of connecting.
    Connecting,
    /// The transport is connected and ready to send/receive messages.
    Connected,
    /// The transport is in the process of disconnecting.
    Disconnecting,
    /// The transport has encountered an unrecoverable error.
    Failed {
        /// A description of the failure reason.
        reason: String,
    },
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnecting => write!(f, "disconnecting"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}
