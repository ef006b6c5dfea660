//! Core transport trait.

use std::future::Future;
use std::pin::Pin;

use crate::error::TransportResult;
use crate::message::TransportMessage;
use crate::types::TransportState;

/// A message-oriented, bidirectional channel to one MCP server.
///
/// The client calls [`send`](Transport::send) from any task and keeps exactly
/// one task looping on [`receive`](Transport::receive), so implementations
/// only need to support one concurrent receiver.
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Returns the current state of the transport.
    fn state(&self) -> Pin<Box<dyn Future<Output = TransportState> + Send + '_>>;

    /// Establishes a connection to the remote endpoint.
    fn connect(&self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>>;

    /// Closes the connection to the remote endpoint.
    fn disconnect(&self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>>;

    /// Sends a single message over the transport.
    fn send(
        &self,
        message: TransportMessage,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>>;

    /// Waits for the next incoming message.
    ///
    /// `Ok(None)` means the incoming stream has ended and no further messages
    /// will arrive.
    fn receive(
        &self,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Option<TransportMessage>>> + Send + '_>>;

    /// Returns `true` if the transport is currently in the `Connected` state.
    fn is_connected(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(async move { matches!(self.state().await, TransportState::Connected) })
    }

    /// Returns the endpoint address or identifier for this transport, if applicable.
    fn endpoint(&self) -> Option<String> {
        None
    }
}
