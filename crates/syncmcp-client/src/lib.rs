//! # SyncMCP Client
//!
//! A blocking MCP (Model Context Protocol) client over any message-oriented
//! [`Transport`](syncmcp_transport_traits::Transport).
//!
//! ## Features
//!
//! - Request/response correlation by JSON-RPC id, with many concurrent callers
//! - Mandatory handshake: nothing but `initialize` is sent before it completes
//! - Per-request timeouts; late responses are dropped
//! - Tool output validation against each tool's declared `outputSchema`
//! - `close` unblocks every waiting caller
//! - Server `ping` answered, server log messages and tool list changes routed
//!   to handlers
//!
//! ## Architecture
//!
//! ```text
//! SyncClient (blocking facade, owns a tokio runtime)
//!        ↓
//! Client (session state, descriptor cache, output validation)
//!        ↓
//! ProtocolClient ⇄ MessageDispatcher (pending calls, routing task)
//!        ↓
//! Transport (syncmcp-transport-traits)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use syncmcp_client::ClientBuilder;
//! # use syncmcp_transport_traits::Transport;
//!
//! # fn example<T: Transport + 'static>(transport: T) -> syncmcp_protocol::McpResult<()> {
//! let client = ClientBuilder::new().build_sync(transport)?;
//!
//! let init = client.initialize()?;
//! println!("Connected to: {}", init.server_info.name);
//!
//! for tool in client.list_tools()? {
//!     println!("Tool: {}", tool.name);
//! }
//!
//! let result = client.call_tool("calculator", None)?;
//! println!("{}", result.all_text());
//! client.close();
//! # Ok(())
//! # }
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
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod client;
pub mod handlers;
pub mod sync;

pub use client::{Client, ClientBuilder, ClientConfig, SessionState};
pub use handlers::{
    HandlerError, HandlerRegistry, HandlerResult, LogHandler, NotificationObserver,
    ToolListChangedHandler,
};
pub use sync::SyncClient;

pub use syncmcp_protocol::{
    CallToolResult, ErrorKind, Implementation, InitializeResult, ListToolsResult, McpError,
    McpResult, ServerCapabilities, Tool,
};
