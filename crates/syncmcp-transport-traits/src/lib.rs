//! # SyncMCP Transport Traits
//!
//! The transport port the SyncMCP client is written against. The client never
//! frames bytes, retries or reconnects; a [`Transport`] does all of that and
//! only has to move whole JSON-RPC messages in each direction.
//!
//! ## Overview
//!
//! - **Trait**: [`Transport`]
//! - **Types**: [`TransportState`], [`TransportMessage`]
//! - **Errors**: [`TransportError`], [`TransportResult`]

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

mod error;
mod message;
mod traits;
mod types;

pub use error::{TransportError, TransportResult};
pub use message::{TransportMessage, TransportMessageMetadata};
pub use traits::Transport;
pub use types::TransportState;
