//! Blocking facade over [`Client`]
//!
//! [`SyncClient`] owns a multi-threaded tokio runtime. The routing task runs
//! on its workers while each blocking method parks the calling thread on
//! `Runtime::block_on` until its own response arrives. Any number of threads
//! may call into one `SyncClient` at once; each waits only for its own id.
//!
//! Do not use a `SyncClient` from inside an async context: `block_on` panics
//! there. Use [`Client`] directly instead.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use syncmcp_protocol::types::{Cursor, EmptyResult};
use syncmcp_protocol::{
    CallToolResult, Implementation, InitializeResult, ListToolsResult, McpError, McpResult,
    ServerCapabilities, Tool,
};
use syncmcp_transport_traits::Transport;

use crate::client::{Client, ClientBuilder, SessionState};

/// Blocking MCP client
///
/// # Examples
///
/// ```rust,no_run
/// use std::collections::HashMap;
/// use syncmcp_client::SyncClient;
/// # use syncmcp_transport_traits::Transport;
///
/// # fn example<T: Transport + 'static>(transport: T) -> syncmcp_protocol::McpResult<()> {
/// let client = SyncClient::new(transport)?;
/// client.initialize()?;
///
/// let mut args = HashMap::new();
/// args.insert("expression".to_string(), serde_json::json!("2 + 3"));
/// match client.call_tool("calculator", Some(args)) {
///     Ok(result) => println!("{:?}", result.structured_content),
///     Err(e) if e.is_validation() => eprintln!("server broke its contract: {e}"),
///     Err(e) => return Err(e),
/// }
/// client.close();
/// # Ok(())
/// # }
/// ```
pub struct SyncClient<T: Transport + 'static> {
    // Declared before `runtime` so the client drops while the runtime is alive
    client: Client<T>,
    runtime: Runtime,
}

impl<T: Transport + 'static> std::fmt::Debug for SyncClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClient")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl<T: Transport + 'static> SyncClient<T> {
    /// Create a blocking client with default configuration
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if the runtime cannot be created.
    pub fn new(transport: T) -> McpResult<Self> {
        Self::from_builder(ClientBuilder::new(), transport)
    }

    pub(crate) fn from_builder(builder: ClientBuilder, transport: T) -> McpResult<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("syncmcp-client")
            .enable_all()
            .build()
            .map_err(|e| McpError::configuration(format!("Failed to start client runtime: {e}")))?;

        let client = {
            let _guard = runtime.enter();
            builder.build(transport)
        };
        debug!("Blocking client created");

        Ok(Self { client, runtime })
    }

    /// The asynchronous client underneath
    pub fn client(&self) -> &Client<T> {
        &self.client
    }

    /// Perform the handshake; see [`Client::initialize`].
    ///
    /// # Errors
    ///
    /// See [`Client::initialize`].
    pub fn initialize(&self) -> McpResult<InitializeResult> {
        self.runtime.block_on(self.client.initialize())
    }

    /// List every tool; see [`Client::list_tools`].
    ///
    /// # Errors
    ///
    /// See [`Client::list_tools`].
    pub fn list_tools(&self) -> McpResult<Vec<Tool>> {
        self.runtime.block_on(self.client.list_tools())
    }

    /// Fetch one page of tools; see [`Client::list_tools_page`].
    ///
    /// # Errors
    ///
    /// See [`Client::list_tools_page`].
    pub fn list_tools_page(&self, cursor: Option<Cursor>) -> McpResult<ListToolsResult> {
        self.runtime.block_on(self.client.list_tools_page(cursor))
    }

    /// Call a tool, validating structured output; see [`Client::call_tool`].
    ///
    /// # Errors
    ///
    /// See [`Client::call_tool`].
    pub fn call_tool(
        &self,
        name: &str,
        arguments: Option<HashMap<String, Value>>,
    ) -> McpResult<CallToolResult> {
        self.runtime.block_on(self.client.call_tool(name, arguments))
    }

    /// Ping the server; see [`Client::ping`].
    ///
    /// # Errors
    ///
    /// See [`Client::ping`].
    pub fn ping(&self) -> McpResult<EmptyResult> {
        self.runtime.block_on(self.client.ping())
    }

    /// Close the session, failing every blocked call with `SessionClosed`
    pub fn close(&self) {
        self.runtime.block_on(self.client.close());
    }

    /// Wait up to `grace` for in-flight calls, then close
    pub fn close_gracefully(&self, grace: Duration) {
        self.runtime.block_on(self.client.close_gracefully(grace));
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.client.state()
    }

    /// `true` once initialized and until closed
    pub fn is_ready(&self) -> bool {
        self.client.is_ready()
    }

    /// Server identity from the handshake
    pub fn server_info(&self) -> Option<Implementation> {
        self.client.server_info()
    }

    /// Server capabilities from the handshake
    pub fn server_capabilities(&self) -> Option<ServerCapabilities> {
        self.client.server_capabilities()
    }

    /// Instructions the server sent during the handshake
    pub fn instructions(&self) -> Option<String> {
        self.client.instructions()
    }

    /// Protocol revision the server answered with
    pub fn protocol_version(&self) -> Option<String> {
        self.client.protocol_version()
    }

    /// Number of requests awaiting a response
    pub fn pending_requests(&self) -> usize {
        self.client.pending_requests()
    }
}
