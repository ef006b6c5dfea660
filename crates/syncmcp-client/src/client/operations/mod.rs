//! MCP operations, implemented as methods on [`Client`](super::core::Client)

pub mod connection;
pub mod tools;
