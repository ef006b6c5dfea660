//! Connection health operations

use syncmcp_protocol::types::EmptyResult;
use syncmcp_protocol::{McpResult, methods};
use syncmcp_transport_traits::Transport;

use crate::client::core::Client;

impl<T: Transport + 'static> Client<T> {
    /// Send a `ping` and wait for the server's empty result.
    ///
    /// # Errors
    ///
    /// Fails with `NotReady` before the handshake, or with the round trip's
    /// `Timeout`, `Transport` or `Remote` error.
    pub async fn ping(&self) -> McpResult<EmptyResult> {
        let _op = self.inner.session.enter(methods::PING)?;
        self.inner
            .protocol
            .request(methods::PING, None, self.inner.config.request_timeout)
            .await
    }
}
