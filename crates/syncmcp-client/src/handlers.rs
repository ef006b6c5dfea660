//! Handler traits for server-initiated traffic
//!
//! Servers push notifications to the client at any time. The client routes
//! the ones it understands to the handlers registered here:
//!
//! - **LogHandler**: `notifications/message` log records
//! - **ToolListChangedHandler**: `notifications/tools/list_changed`, invoked
//!   after the client has refreshed its tool descriptor cache
//! - **NotificationObserver**: every notification, after built-in routing
//!
//! Handlers run on the client's runtime, never on the routing task, so a slow
//! handler cannot stall response delivery. Notifications are handled one at a
//! time in arrival order; a slow handler delays the notifications behind it.
//! Handler errors are logged and otherwise ignored.
//!
//! ## Usage
//!
//! ```rust
//! use async_trait::async_trait;
//! use syncmcp_client::handlers::{HandlerResult, LogHandler};
//! use syncmcp_protocol::types::LoggingNotification;
//!
//! #[derive(Debug)]
//! struct StderrLogHandler;
//!
//! #[async_trait]
//! impl LogHandler for StderrLogHandler {
//!     async fn handle_log(&self, log: LoggingNotification) -> HandlerResult<()> {
//!         eprintln!("[{:?}] {}", log.level, log.data);
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use syncmcp_protocol::JsonRpcNotification;
use syncmcp_protocol::types::LoggingNotification;

/// Errors a handler may report
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HandlerError {
    /// Handler operation timed out
    #[error("Handler operation timed out after {timeout_seconds} seconds")]
    Timeout {
        /// Seconds waited
        timeout_seconds: u64,
    },

    /// The notification payload could not be used
    #[error("Invalid input: {details}")]
    InvalidInput {
        /// What was wrong with it
        details: String,
    },

    /// Handler configuration error
    #[error("Handler configuration error: {message}")]
    Configuration {
        /// Description
        message: String,
    },

    /// Generic handler error
    #[error("Handler error: {message}")]
    Generic {
        /// Description
        message: String,
    },

    /// External system error
    #[error("External system error: {source}")]
    External {
        /// Underlying error
        #[from]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for handler operations
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Receives `notifications/message` log records from the server.
///
/// Without a registered handler the client re-emits them through `tracing`
/// at the matching level.
#[async_trait]
pub trait LogHandler: Send + Sync + std::fmt::Debug {
    /// Handle one log record
    async fn handle_log(&self, log: LoggingNotification) -> HandlerResult<()>;
}

/// Told when the server's tool list changed.
///
/// Called after the client has refreshed its descriptor cache, so
/// `list_tools` from inside the handler is answered from fresh data.
#[async_trait]
pub trait ToolListChangedHandler: Send + Sync + std::fmt::Debug {
    /// Handle a tool list change
    async fn handle_tool_list_changed(&self) -> HandlerResult<()>;
}

/// Sees every notification the server sends
#[async_trait]
pub trait NotificationObserver: Send + Sync + std::fmt::Debug {
    /// Observe one notification
    async fn on_notification(&self, notification: &JsonRpcNotification) -> HandlerResult<()>;
}

/// Registry of the handlers a client dispatches to
#[derive(Debug, Default, Clone)]
pub struct HandlerRegistry {
    /// Log handler for server log messages
    pub log: Option<Arc<dyn LogHandler>>,

    /// Tool list changed handler
    pub tool_list_changed: Option<Arc<dyn ToolListChangedHandler>>,

    /// Generic observers, in registration order
    pub observers: Vec<Arc<dyn NotificationObserver>>,
}

impl HandlerRegistry {
    /// Create a new empty handler registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a log handler
    pub fn set_log_handler(&mut self, handler: Arc<dyn LogHandler>) {
        debug!("Registering log handler");
        self.log = Some(handler);
    }

    /// Register a tool list changed handler
    pub fn set_tool_list_changed_handler(&mut self, handler: Arc<dyn ToolListChangedHandler>) {
        debug!("Registering tool list changed handler");
        self.tool_list_changed = Some(handler);
    }

    /// Add a notification observer
    pub fn add_observer(&mut self, observer: Arc<dyn NotificationObserver>) {
        debug!(count = self.observers.len() + 1, "Registering notification observer");
        self.observers.push(observer);
    }

    /// Check if a log handler is registered
    #[must_use]
    pub fn has_log_handler(&self) -> bool {
        self.log.is_some()
    }

    /// Get the log handler if registered
    #[must_use]
    pub fn get_log_handler(&self) -> Option<Arc<dyn LogHandler>> {
        self.log.clone()
    }

    /// Get the tool list changed handler if registered
    #[must_use]
    pub fn get_tool_list_changed_handler(&self) -> Option<Arc<dyn ToolListChangedHandler>> {
        self.tool_list_changed.clone()
    }

    /// Snapshot of the registered observers
    #[must_use]
    pub fn get_observers(&self) -> Vec<Arc<dyn NotificationObserver>> {
        self.observers.clone()
    }
}
