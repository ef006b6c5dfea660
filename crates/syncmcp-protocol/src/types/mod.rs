//! MCP payload types used by the client.
//!
//! - [`core`] - identity, annotations and small shared aliases
//! - [`capabilities`] - client/server capability negotiation
//! - [`initialization`] - handshake request and result
//! - [`tools`] - tool descriptors, listing and invocation
//! - [`content`] - content blocks returned by tools
//! - [`logging`] - server log notifications
//! - [`ping`] - connection liveness

pub mod capabilities;
pub mod content;
pub mod core;
pub mod initialization;
pub mod logging;
pub mod ping;
pub mod tools;

pub use capabilities::*;
pub use content::*;
pub use core::*;
pub use initialization::*;
pub use logging::*;
pub use ping::*;
pub use tools::*;
