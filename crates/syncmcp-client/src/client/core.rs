//! Core client implementation
//!
//! [`Client`] ties the pieces together: the protocol client and its dispatcher
//! (correlation), the [`Session`] (handshake gating and close), the tool
//! descriptor cache and the output validator. It is the asynchronous engine
//! underneath [`SyncClient`](crate::SyncClient).

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use syncmcp_protocol::types::{EmptyResult, LogLevel, LoggingNotification};
use syncmcp_protocol::{
    InitializeRequest, InitializeResult, Implementation, JsonRpcError, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, McpError, McpResult, OutputValidator, PROTOCOL_VERSION,
    ServerCapabilities, Tool, is_supported_version, methods,
};
use syncmcp_transport_traits::Transport;

use super::cache::ToolDescriptorCache;
use super::config::ClientConfig;
use super::protocol::ProtocolClient;
use super::session::{Session, SessionState};
use crate::handlers::{
    HandlerRegistry, LogHandler, NotificationObserver, ToolListChangedHandler,
};

/// Shared state behind every [`Client`] clone
#[derive(Debug)]
pub(crate) struct ClientInner<T: Transport + 'static> {
    pub(crate) protocol: ProtocolClient<T>,
    pub(crate) config: ClientConfig,
    pub(crate) session: Session,
    pub(crate) tools: ToolDescriptorCache,
    pub(crate) validator: Arc<dyn OutputValidator>,
    pub(crate) handlers: Mutex<HandlerRegistry>,
}

/// Asynchronous MCP client
///
/// Cloning is cheap; all clones share one session, one pending-call table and
/// one descriptor cache. Every operation except [`initialize`](Self::initialize)
/// and [`close`](Self::close) fails fast until the handshake has completed.
///
/// Must be created inside a tokio runtime, which runs its routing task.
///
/// # Examples
///
/// ```rust,no_run
/// # use syncmcp_client::Client;
/// # use syncmcp_transport_traits::Transport;
/// # async fn example<T: Transport + 'static>(transport: T) -> syncmcp_protocol::McpResult<()> {
/// let client = Client::new(transport);
/// let init = client.initialize().await?;
/// println!("Connected to {} {}", init.server_info.name, init.server_info.version);
///
/// let result = client.call_tool("calculator", None).await?;
/// println!("{}", result.all_text());
/// client.close().await;
/// # Ok(())
/// # }
/// ```
pub struct Client<T: Transport + 'static> {
    pub(crate) inner: Arc<ClientInner<T>>,
}

impl<T: Transport + 'static> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport + 'static> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.inner.session.state())
            .field("pending", &self.inner.protocol.dispatcher().pending_count())
            .field("cached_tools", &self.inner.tools.len())
            .finish()
    }
}

impl<T: Transport + 'static> Drop for ClientInner<T> {
    fn drop(&mut self) {
        debug!("Last client reference dropped; shutting down message dispatcher");
        self.protocol.dispatcher().shutdown();
    }
}

impl<T: Transport + 'static> Client<T> {
    /// Create a client with default configuration
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    /// Create a client with the given configuration
    pub fn with_config(transport: T, config: ClientConfig) -> Self {
        crate::ClientBuilder::new()
            .with_config(config)
            .build(transport)
    }

    pub(crate) fn from_parts(
        transport: T,
        config: ClientConfig,
        validator: Arc<dyn OutputValidator>,
        handlers: HandlerRegistry,
    ) -> Self {
        let client = Self {
            inner: Arc::new(ClientInner {
                protocol: ProtocolClient::new(transport),
                config,
                session: Session::new(),
                tools: ToolDescriptorCache::new(),
                validator,
                handlers: Mutex::new(handlers),
            }),
        };

        client.register_dispatcher_handlers();

        client
    }

    /// Wire server requests and notifications from the routing task into
    /// this client.
    ///
    /// The closures hold weak references so the dispatcher does not keep the
    /// client alive, and hand the real work off so routing never waits on it.
    /// Server requests are answered concurrently. Notifications go through a
    /// queue drained by a single task, so handlers see them in arrival order
    /// and a `list_changed` refresh finishes before later notifications run.
    fn register_dispatcher_handlers(&self) {
        let dispatcher = self.inner.protocol.dispatcher();
        let for_requests = Arc::downgrade(&self.inner);
        let for_notifications = Arc::downgrade(&self.inner);

        dispatcher.set_request_handler(Arc::new(move |request: JsonRpcRequest| {
            let Some(inner) = for_requests.upgrade() else {
                return;
            };
            let client = Client { inner };
            tokio::spawn(async move {
                if let Err(e) = client.handle_request(request).await {
                    error!("Error answering server request: {}", e);
                }
            });
        }));

        let (queue, mut incoming) = mpsc::unbounded_channel::<JsonRpcNotification>();
        tokio::spawn(async move {
            while let Some(notification) = incoming.recv().await {
                let Some(inner) = for_notifications.upgrade() else {
                    break;
                };
                Client { inner }.handle_notification(notification).await;
            }
            debug!("Notification task stopped");
        });

        dispatcher.set_notification_handler(Arc::new(move |notification: JsonRpcNotification| {
            if queue.send(notification).is_err() {
                trace!("Notification dropped; client is gone");
            }
        }));
    }

    /// Answer a server-initiated request. Only `ping` is supported.
    async fn handle_request(&self, request: JsonRpcRequest) -> McpResult<()> {
        let response = match request.method.as_str() {
            methods::PING => {
                debug!(id = %request.id, "Answering server ping");
                JsonRpcResponse::success(serde_json::to_value(EmptyResult::default())?, request.id)
            }
            other => {
                warn!(method = other, id = %request.id, "Rejecting unsupported server request");
                JsonRpcResponse::error_response(JsonRpcError::method_not_found(other), request.id)
            }
        };
        self.inner.protocol.send_response(response).await
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            methods::TOOLS_LIST_CHANGED => self.on_tool_list_changed().await,
            methods::LOG_MESSAGE => self.on_log_message(notification.params.clone()).await,
            other => debug!(method = other, "Received notification without built-in routing"),
        }

        let observers = self.inner.handlers.lock().get_observers();
        for observer in observers {
            if let Err(e) = observer.on_notification(&notification).await {
                warn!(method = %notification.method, "Notification observer error: {}", e);
            }
        }
    }

    async fn on_tool_list_changed(&self) {
        self.inner.tools.invalidate();

        if self.is_ready() {
            match self.list_tools().await {
                Ok(tools) => debug!(count = tools.len(), "Refreshed tool descriptors after list change"),
                Err(e) => warn!("Failed to refresh tool descriptors: {}", e),
            }
        }

        let handler = self.inner.handlers.lock().get_tool_list_changed_handler();
        if let Some(handler) = handler {
            if let Err(e) = handler.handle_tool_list_changed().await {
                error!("Tool list changed handler error: {}", e);
            }
        } else {
            debug!("Tool list changed (no handler registered)");
        }
    }

    async fn on_log_message(&self, params: Option<Value>) {
        let log: LoggingNotification = match serde_json::from_value(params.unwrap_or(Value::Null)) {
            Ok(log) => log,
            Err(e) => {
                warn!("Invalid log notification: {}", e);
                return;
            }
        };

        let handler = self.inner.handlers.lock().get_log_handler();
        match handler {
            Some(handler) => {
                if let Err(e) = handler.handle_log(log).await {
                    error!("Log handler error: {}", e);
                }
            }
            None => emit_server_log(&log),
        }
    }

    /// Perform the MCP handshake.
    ///
    /// Connects the transport if needed, sends `initialize`, checks the
    /// negotiated protocol version and confirms with
    /// `notifications/initialized`. On success the session is `Ready`.
    ///
    /// Calling it again while `Ready` returns the cached result without
    /// contacting the server. A failed handshake leaves the session
    /// `Uninitialized`, so it can be retried.
    ///
    /// # Errors
    ///
    /// - `NotReady` if another handshake is in progress
    /// - `SessionClosed` after [`close`](Self::close)
    /// - `ProtocolVersionMismatch` if the server answers with an unsupported revision
    /// - `Timeout`, `Transport` or `Remote` if the round trip fails
    pub async fn initialize(&self) -> McpResult<InitializeResult> {
        if let Some(cached) = self.inner.session.begin_handshake()? {
            debug!("Already initialized; returning cached handshake result");
            return Ok(cached);
        }

        match self.handshake().await {
            Ok(result) => {
                self.inner.session.complete_handshake(result.clone())?;
                info!(
                    server = %result.server_info.name,
                    version = %result.server_info.version,
                    protocol = %result.protocol_version,
                    "MCP session initialized"
                );
                Ok(result)
            }
            Err(e) => {
                warn!("Handshake failed: {}", e);
                self.inner.session.abort_handshake();
                Err(e)
            }
        }
    }

    async fn handshake(&self) -> McpResult<InitializeResult> {
        self.inner.protocol.ensure_connected().await?;

        let request = InitializeRequest {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: self.inner.config.capabilities.clone(),
            client_info: self.inner.config.client_info.clone(),
            _meta: None,
        };

        let result: InitializeResult = self
            .inner
            .protocol
            .request(
                methods::INITIALIZE,
                Some(serde_json::to_value(request)?),
                self.inner.config.initialization_timeout,
            )
            .await?;

        if !is_supported_version(&result.protocol_version) {
            return Err(McpError::protocol_version_mismatch(
                PROTOCOL_VERSION,
                result.protocol_version,
            )
            .with_operation(methods::INITIALIZE));
        }

        self.inner
            .protocol
            .notify(methods::INITIALIZED, None)
            .await?;

        Ok(result)
    }

    /// Close the session.
    ///
    /// Every pending call fails with `SessionClosed`, the transport is
    /// disconnected and the routing task stops. Idempotent.
    pub async fn close(&self) {
        let Some(previous) = self.inner.session.begin_close() else {
            debug!("Session already closed");
            return;
        };
        self.shutdown(previous).await;
    }

    /// Stop admitting operations, wait up to `grace` for in-flight ones to
    /// finish, then [`close`](Self::close).
    pub async fn close_gracefully(&self, grace: Duration) {
        let Some(previous) = self.inner.session.begin_close() else {
            debug!("Session already closed");
            return;
        };
        if !self.inner.session.wait_idle(grace).await {
            warn!(
                active = self.inner.session.active_operations(),
                grace_ms = grace.as_millis() as u64,
                "Grace period elapsed with operations in flight"
            );
        }
        self.shutdown(previous).await;
    }

    async fn shutdown(&self, previous: SessionState) {
        let dispatcher = self.inner.protocol.dispatcher();
        let cancelled = dispatcher.cancel_all();

        if let Err(e) = self.inner.protocol.disconnect().await {
            debug!("Ignoring disconnect failure during close: {}", e);
        }
        dispatcher.shutdown();
        self.inner.tools.invalidate();
        self.inner.session.finish_close();
        info!(from = %previous, cancelled, "MCP session closed");
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.inner.session.state()
    }

    /// `true` once the handshake has completed and until close
    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// The full handshake result, once initialized
    pub fn initialize_result(&self) -> Option<InitializeResult> {
        self.inner.session.initialize_result()
    }

    /// Server identity from the handshake
    pub fn server_info(&self) -> Option<Implementation> {
        self.initialize_result().map(|r| r.server_info)
    }

    /// Server capabilities from the handshake
    pub fn server_capabilities(&self) -> Option<ServerCapabilities> {
        self.initialize_result().map(|r| r.capabilities)
    }

    /// Usage instructions the server sent during the handshake
    pub fn instructions(&self) -> Option<String> {
        self.initialize_result().and_then(|r| r.instructions)
    }

    /// Protocol revision the server answered with
    pub fn protocol_version(&self) -> Option<String> {
        self.initialize_result().map(|r| r.protocol_version)
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Number of requests currently awaiting a response
    pub fn pending_requests(&self) -> usize {
        self.inner.protocol.dispatcher().pending_count()
    }

    /// Cached descriptor for `name`, without contacting the server
    pub fn cached_tool(&self, name: &str) -> Option<Tool> {
        self.inner.tools.lookup(name)
    }

    /// Names of all cached descriptors, sorted
    pub fn cached_tool_names(&self) -> Vec<String> {
        self.inner.tools.names()
    }

    /// Register a handler for server log messages
    pub fn set_log_handler(&self, handler: Arc<dyn LogHandler>) {
        self.inner.handlers.lock().set_log_handler(handler);
    }

    /// Register a handler for tool list changes
    pub fn set_tool_list_changed_handler(&self, handler: Arc<dyn ToolListChangedHandler>) {
        self.inner
            .handlers
            .lock()
            .set_tool_list_changed_handler(handler);
    }

    /// Register an observer that sees every server notification
    pub fn on_notification(&self, observer: Arc<dyn NotificationObserver>) {
        self.inner.handlers.lock().add_observer(observer);
    }
}

/// Re-emit a server log record through `tracing`
fn emit_server_log(log: &LoggingNotification) {
    let logger = log.logger.as_deref().unwrap_or("server");
    match log.level {
        LogLevel::Debug => debug!(logger, "Server: {}", log.data),
        LogLevel::Info | LogLevel::Notice => info!(logger, "Server: {}", log.data),
        LogLevel::Warning => warn!(logger, "Server: {}", log.data),
        LogLevel::Error | LogLevel::Critical | LogLevel::Alert | LogLevel::Emergency => {
            error!(logger, level = ?log.level, "Server: {}", log.data)
        }
    }
}
