//! Client builder pattern for MCP client construction
//!
//! Provides a fluent interface for configuring client options before creation.

use std::sync::Arc;
use std::time::Duration;

use syncmcp_protocol::{
    ClientCapabilities, Implementation, JsonSchemaValidator, McpResult, OutputValidator,
};
use syncmcp_transport_traits::Transport;

use super::config::ClientConfig;
use super::core::Client;
use crate::handlers::{
    HandlerRegistry, LogHandler, NotificationObserver, ToolListChangedHandler,
};
use crate::sync::SyncClient;

/// Builder for configuring and creating MCP clients
///
/// # Examples
///
/// ```rust,no_run
/// use std::time::Duration;
/// use syncmcp_client::ClientBuilder;
/// # use syncmcp_transport_traits::Transport;
///
/// # fn example<T: Transport + 'static>(transport: T) -> syncmcp_protocol::McpResult<()> {
/// let client = ClientBuilder::new()
///     .request_timeout(Duration::from_secs(5))
///     .client_info("calculator-cli", "0.3.0")
///     .build_sync(transport)?;
///
/// client.initialize()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    validator: Option<Arc<dyn OutputValidator>>,
    handlers: HandlerRegistry,
}

impl ClientBuilder {
    /// Create a new client builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Bound on each request round trip after the handshake
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Bound on the `initialize` round trip
    pub fn initialization_timeout(mut self, timeout: Duration) -> Self {
        self.config.initialization_timeout = timeout;
        self
    }

    /// Name and version reported as `clientInfo`
    pub fn client_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.config.client_info = Implementation::new(name, version);
        self
    }

    /// Capabilities advertised during the handshake
    pub fn capabilities(mut self, capabilities: ClientCapabilities) -> Self {
        self.config.capabilities = capabilities;
        self
    }

    /// Enable or disable tool output validation
    pub fn validate_tool_output(mut self, enabled: bool) -> Self {
        self.config.validate_tool_output = enabled;
        self
    }

    /// Use a custom output validator instead of [`JsonSchemaValidator`]
    pub fn output_validator(mut self, validator: Arc<dyn OutputValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Register a handler for server log messages
    pub fn log_handler(mut self, handler: Arc<dyn LogHandler>) -> Self {
        self.handlers.set_log_handler(handler);
        self
    }

    /// Register a handler for tool list changes
    pub fn tool_list_changed_handler(mut self, handler: Arc<dyn ToolListChangedHandler>) -> Self {
        self.handlers.set_tool_list_changed_handler(handler);
        self
    }

    /// Register an observer for every server notification
    pub fn notification_observer(mut self, observer: Arc<dyn NotificationObserver>) -> Self {
        self.handlers.add_observer(observer);
        self
    }

    /// Build an asynchronous client.
    ///
    /// Must be called inside a tokio runtime.
    pub fn build<T: Transport + 'static>(self, transport: T) -> Client<T> {
        let validator: Arc<dyn OutputValidator> = match self.validator {
            Some(validator) => validator,
            None => Arc::new(JsonSchemaValidator::new()),
        };
        Client::from_parts(transport, self.config, validator, self.handlers)
    }

    /// Build a blocking client that owns its runtime.
    ///
    /// Must not be called from inside an async context.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if the runtime cannot be created.
    pub fn build_sync<T: Transport + 'static>(self, transport: T) -> McpResult<SyncClient<T>> {
        SyncClient::from_builder(self, transport)
    }
}
