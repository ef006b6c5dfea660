//! MCP client core implementation
//!
//! - `core`: `Client<T>`, handshake, close and server-initiated traffic
//! - `protocol`: `ProtocolClient` for correlated JSON-RPC round trips
//! - `dispatcher`: the pending-call table and the routing task
//! - `session`: the session state machine
//! - `cache`: tool descriptor cache
//! - `config` / `builder`: configuration and construction
//! - `operations`: tool and ping operations

pub mod builder;
pub mod config;
pub mod core;
pub mod operations;
pub mod session;

pub(crate) mod cache;
pub(crate) mod dispatcher;
pub(crate) mod protocol;

pub use builder::ClientBuilder;
pub use config::ClientConfig;
pub use core::Client;
pub use session::SessionState;
