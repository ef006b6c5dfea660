//! Protocol client for JSON-RPC communication
//!
//! `ProtocolClient` turns a method name and parameters into a correlated round
//! trip. It never reads the transport itself; the dispatcher's routing task is
//! the only consumer of `transport.receive()`:
//!
//! ```text
//! ProtocolClient::request()
//!     ↓
//!   1. Register pending call with dispatcher
//!   2. Send request via transport
//!   3. Wait on oneshot channel (bounded)
//!     ↓
//! MessageDispatcher (background task)
//!     ↓
//!   Routes the matching response → oneshot channel
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use syncmcp_protocol::{
    JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, McpError, McpResult,
    MessageId,
};
use syncmcp_transport_traits::{Transport, TransportMessage};

use super::dispatcher::{Delivery, MessageDispatcher};

/// Removes the pending entry if the waiting future is dropped or gives up.
struct PendingGuard<'a> {
    dispatcher: &'a MessageDispatcher,
    id: MessageId,
    armed: bool,
}

impl PendingGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.dispatcher.abandon(&self.id);
        }
    }
}

/// JSON-RPC protocol handler for MCP communication
///
/// Handles id assignment, request/response correlation and serialization.
#[derive(Debug)]
pub(crate) struct ProtocolClient<T: Transport> {
    transport: Arc<T>,
    dispatcher: Arc<MessageDispatcher>,
    next_id: AtomicU64,
}

impl<T: Transport + 'static> ProtocolClient<T> {
    /// Create a new protocol client; starts the routing task.
    pub(crate) fn new(transport: T) -> Self {
        let transport = Arc::new(transport);
        let dispatcher = MessageDispatcher::new(Arc::clone(&transport));

        Self {
            transport,
            dispatcher,
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn dispatcher(&self) -> &Arc<MessageDispatcher> {
        &self.dispatcher
    }

    fn next_request_id(&self) -> McpResult<MessageId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        i64::try_from(id)
            .map(MessageId::Number)
            .map_err(|_| McpError::internal("Request id space exhausted"))
    }

    /// Send a request and wait at most `timeout` for its typed result.
    ///
    /// A JSON-RPC error object becomes an [`ErrorKind::Remote`] error carrying
    /// the server's code. A response that arrives after the bound is dropped
    /// by the dispatcher.
    ///
    /// [`ErrorKind::Remote`]: syncmcp_protocol::ErrorKind::Remote
    pub(crate) async fn request<R: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> McpResult<R> {
        let id = self.next_request_id()?;
        let request = JsonRpcRequest::new(method, params, id.clone());
        let payload = JsonRpcMessage::from(request)
            .to_vec()
            .map_err(|e| McpError::serialization(format!("Failed to serialize request: {e}")))?;

        // Register BEFORE sending so a fast response cannot be missed
        let receiver = self.dispatcher.register(id.clone(), method, timeout)?;
        let mut guard = PendingGuard {
            dispatcher: &self.dispatcher,
            id: id.clone(),
            armed: true,
        };

        trace!(id = %id, method, "Sending request");
        self.transport
            .send(TransportMessage::new(id.clone(), payload))
            .await
            .map_err(|e| {
                McpError::from(e)
                    .with_operation(method)
                    .with_request_id(&id)
            })?;

        let delivery = match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(delivery)) => delivery,
            Ok(Err(_)) => {
                return Err(McpError::transport("Response channel closed")
                    .with_operation(method)
                    .with_request_id(&id));
            }
            Err(_) => {
                debug!(id = %id, method, timeout_ms = timeout.as_millis() as u64, "Request timed out");
                return Err(McpError::timeout(format!(
                    "No response to '{}' within {:?}",
                    method, timeout
                ))
                .with_operation(method)
                .with_request_id(&id));
            }
        };
        // The dispatcher removed the entry before delivering
        guard.disarm();

        let response = match delivery {
            Delivery::Response(response) => response,
            Delivery::Failed(err) => return Err(err),
        };

        if let Some(error) = response.error() {
            debug!(id = %id, method, code = error.code, "Received JSON-RPC error");
            return Err(McpError::from(error.clone())
                .with_operation(method)
                .with_request_id(&id));
        }

        let result = response.result().cloned().unwrap_or(Value::Null);
        serde_json::from_value(result).map_err(|e| {
            McpError::invalid_response(format!("Failed to deserialize '{}' result: {}", method, e))
                .with_operation(method)
                .with_request_id(&id)
        })
    }

    /// Send a JSON-RPC notification (no response expected)
    pub(crate) async fn notify(&self, method: &str, params: Option<Value>) -> McpResult<()> {
        let payload = JsonRpcMessage::from(JsonRpcNotification::new(method, params))
            .to_vec()
            .map_err(|e| {
                McpError::serialization(format!("Failed to serialize notification: {e}"))
            })?;

        self.transport
            .send(TransportMessage::new(MessageId::from("notification"), payload))
            .await
            .map_err(|e| McpError::from(e).with_operation(method))
    }

    /// Answer a server-initiated request
    pub(crate) async fn send_response(&self, response: JsonRpcResponse) -> McpResult<()> {
        let id = response
            .request_id()
            .cloned()
            .unwrap_or_else(|| MessageId::from("response"));
        let payload = JsonRpcMessage::from(response)
            .to_vec()
            .map_err(|e| McpError::serialization(format!("Failed to serialize response: {e}")))?;

        self.transport
            .send(TransportMessage::new(id, payload))
            .await
            .map_err(McpError::from)
    }

    /// Connect the transport unless it already is
    pub(crate) async fn ensure_connected(&self) -> McpResult<()> {
        if self.transport.is_connected().await {
            return Ok(());
        }
        let state = self.transport.state().await;
        debug!(state = %state, "Connecting transport");
        self.transport
            .connect()
            .await
            .map_err(|e| McpError::transport(format!("Failed to connect transport: {e}")))
    }

    pub(crate) async fn disconnect(&self) -> McpResult<()> {
        self.transport
            .disconnect()
            .await
            .map_err(|e| McpError::transport(format!("Transport disconnect failed: {e}")))
    }
}
