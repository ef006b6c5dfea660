//! Message dispatcher for routing JSON-RPC messages
//!
//! The dispatcher is the correlation engine of the client. It owns the table of
//! pending calls and runs the single background task that reads every message
//! from the transport:
//!
//! - **Responses** are matched by id against the pending table and handed to the
//!   waiting caller through a oneshot channel
//! - **Requests** from the server go to the registered request handler
//! - **Notifications** go to the registered notification handler
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │          MessageDispatcher                   │
//! │                                              │
//! │  Background Task (tokio::spawn):             │
//! │  loop {                                      │
//! │    msg = transport.receive().await           │
//! │    match parse(msg) {                        │
//! │      Response => complete pending call       │
//! │      Request => call request_handler         │
//! │      Notification => call notif_handler      │
//! │    }                                         │
//! │  }                                           │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Every pending call is removed from the table exactly once: by its response,
//! by its caller giving up (timeout, send failure), or by `cancel_all`/`fail_all`.
//! Whoever removes the entry owns the only sender, so a caller can never be
//! completed twice.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{Notify, oneshot};
use tracing::{debug, error, info, trace, warn};

use syncmcp_protocol::{
    JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, McpError, McpResult,
    MessageId,
};
use syncmcp_transport_traits::{Transport, TransportMessage, TransportState};

/// Handler for server-initiated requests. Must not block; it is called from
/// the routing task.
pub(crate) type RequestHandler = Arc<dyn Fn(JsonRpcRequest) + Send + Sync>;

/// Handler for server notifications. Must not block.
pub(crate) type NotificationHandler = Arc<dyn Fn(JsonRpcNotification) + Send + Sync>;

/// What a waiting caller eventually receives
#[derive(Debug)]
pub(crate) enum Delivery {
    /// The matching response arrived
    Response(JsonRpcResponse),
    /// The call was cancelled or the transport failed before a response arrived
    Failed(McpError),
}

/// An outstanding request awaiting its response
#[derive(Debug)]
struct PendingCall {
    method: String,
    issued_at: Instant,
    /// `None` when the timeout is too large to represent
    deadline: Option<Instant>,
    sender: oneshot::Sender<Delivery>,
}

impl PendingCall {
    fn complete(self, delivery: Delivery) {
        // The receiver is gone only if the caller's future was dropped.
        let _ = self.sender.send(delivery);
    }
}

#[derive(Debug, Default)]
struct PendingTable {
    calls: HashMap<MessageId, PendingCall>,
    /// Set once the table stops accepting registrations
    terminated: Option<McpError>,
}

/// Routes incoming messages and tracks outstanding requests
pub(crate) struct MessageDispatcher {
    pending: Mutex<PendingTable>,
    request_handler: Mutex<Option<RequestHandler>>,
    notification_handler: Mutex<Option<NotificationHandler>>,
    shutdown: Notify,
}

impl std::fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDispatcher")
            .field("pending", &self.pending_count())
            .field("terminated", &self.pending.lock().terminated.is_some())
            .finish()
    }
}

impl MessageDispatcher {
    /// Create a new dispatcher and start the background routing task.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn new<T: Transport + 'static>(transport: Arc<T>) -> Arc<Self> {
        let dispatcher = Arc::new(Self {
            pending: Mutex::new(PendingTable::default()),
            request_handler: Mutex::new(None),
            notification_handler: Mutex::new(None),
            shutdown: Notify::new(),
        });

        Self::spawn_routing_task(Arc::clone(&dispatcher), transport);

        dispatcher
    }

    pub(crate) fn set_request_handler(&self, handler: RequestHandler) {
        *self.request_handler.lock() = Some(handler);
        debug!("Request handler registered with dispatcher");
    }

    pub(crate) fn set_notification_handler(&self, handler: NotificationHandler) {
        *self.notification_handler.lock() = Some(handler);
        debug!("Notification handler registered with dispatcher");
    }

    /// Register a pending call before its request is sent.
    ///
    /// Fails once the dispatcher has been cancelled or its transport has ended,
    /// so no caller can wait on a table that will never be drained.
    pub(crate) fn register(
        &self,
        id: MessageId,
        method: &str,
        timeout: Duration,
    ) -> McpResult<oneshot::Receiver<Delivery>> {
        let (sender, receiver) = oneshot::channel();
        let now = Instant::now();

        let mut table = self.pending.lock();
        if let Some(reason) = &table.terminated {
            return Err(reason.clone().with_operation(method));
        }
        if table.calls.contains_key(&id) {
            return Err(McpError::internal(format!("Request id {} already pending", id)));
        }
        table.calls.insert(
            id.clone(),
            PendingCall {
                method: method.to_string(),
                issued_at: now,
                deadline: now.checked_add(timeout),
                sender,
            },
        );
        trace!(id = %id, method, "Registered pending call");
        Ok(receiver)
    }

    /// Remove a pending call whose caller stopped waiting. Returns `true` if
    /// the entry was still present.
    pub(crate) fn abandon(&self, id: &MessageId) -> bool {
        let removed = self.pending.lock().calls.remove(id);
        match removed {
            Some(call) => {
                debug!(
                    id = %id,
                    method = %call.method,
                    elapsed_ms = call.issued_at.elapsed().as_millis() as u64,
                    "Abandoned pending call"
                );
                true
            }
            None => false,
        }
    }

    /// Fail every pending call with "session closed" and refuse new ones.
    /// Returns the number of calls that were cancelled.
    pub(crate) fn cancel_all(&self) -> usize {
        self.fail_all(McpError::session_closed())
    }

    /// Fail every pending call with `reason` and refuse new registrations.
    /// The first terminal reason wins.
    pub(crate) fn fail_all(&self, reason: McpError) -> usize {
        let drained: Vec<(MessageId, PendingCall)> = {
            let mut table = self.pending.lock();
            if table.terminated.is_none() {
                table.terminated = Some(reason.clone());
            }
            table.calls.drain().collect()
        };

        let count = drained.len();
        for (id, call) in drained {
            let err = reason
                .clone()
                .with_operation(call.method.as_str())
                .with_request_id(&id);
            call.complete(Delivery::Failed(err));
        }
        if count > 0 {
            debug!(count, reason = %reason, "Failed all pending calls");
        }
        count
    }

    /// Number of calls currently awaiting a response
    pub(crate) fn pending_count(&self) -> usize {
        self.pending.lock().calls.len()
    }

    /// Signal the routing task to stop.
    ///
    /// Safe to call more than once and before the task first polls.
    pub(crate) fn shutdown(&self) {
        self.shutdown.notify_one();
        debug!("Message dispatcher shutdown initiated");
    }

    fn spawn_routing_task<T: Transport + 'static>(dispatcher: Arc<Self>, transport: Arc<T>) {
        tokio::spawn(async move {
            info!(endpoint = ?transport.endpoint(), "Message dispatcher routing task started");

            let mut consecutive_errors = 0u32;
            let max_consecutive_errors = 20;

            loop {
                tokio::select! {
                    _ = dispatcher.shutdown.notified() => {
                        info!("Message dispatcher routing task shutting down");
                        break;
                    }

                    result = transport.receive() => {
                        match result {
                            Ok(Some(msg)) => {
                                consecutive_errors = 0;
                                dispatcher.route_message(msg);
                            }
                            Ok(None) => {
                                warn!("Transport stream ended; failing pending calls");
                                dispatcher.fail_all(McpError::transport("Transport stream ended"));
                                break;
                            }
                            Err(e) => {
                                consecutive_errors += 1;

                                let state = transport.state().await;
                                if let TransportState::Failed { reason } = &state {
                                    error!(reason = %reason, "Transport failed: {}", e);
                                    dispatcher.fail_all(McpError::transport(format!(
                                        "Transport failed: {}",
                                        e
                                    )));
                                    break;
                                }

                                if consecutive_errors == 1 {
                                    error!("Transport receive error: {}", e);
                                } else if consecutive_errors <= max_consecutive_errors {
                                    warn!("Transport receive error (attempt {}): {}", consecutive_errors, e);
                                } else if consecutive_errors == max_consecutive_errors + 1 {
                                    error!(
                                        "Transport unavailable ({}), suppressing further error logs",
                                        state
                                    );
                                }

                                let delay_ms = if matches!(state, TransportState::Disconnected) {
                                    if consecutive_errors > max_consecutive_errors {
                                        5000
                                    } else {
                                        1000
                                    }
                                } else {
                                    100u64.saturating_mul(2u64.saturating_pow(consecutive_errors.min(5)))
                                };

                                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                            }
                        }
                    }
                }
            }

            info!("Message dispatcher routing task terminated");
        });
    }

    /// Parse one transport message and route it. Malformed input is dropped.
    fn route_message(&self, msg: TransportMessage) {
        let message = match JsonRpcMessage::from_slice(&msg.payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(size = msg.size(), "Dropping message that is not JSON-RPC: {}", e);
                return;
            }
        };

        match message {
            JsonRpcMessage::Response(response) => self.route_response(response),

            JsonRpcMessage::Request(request) => {
                debug!(method = %request.method, id = %request.id, "Routing server-initiated request");
                let handler = self.request_handler.lock().clone();
                match handler {
                    Some(handler) => handler(request),
                    None => warn!(
                        method = %request.method,
                        "Received server request but no handler registered"
                    ),
                }
            }

            JsonRpcMessage::Notification(notification) => {
                trace!(method = %notification.method, "Routing notification");
                let handler = self.notification_handler.lock().clone();
                match handler {
                    Some(handler) => handler(notification),
                    None => debug!(
                        method = %notification.method,
                        "Received notification but no handler registered"
                    ),
                }
            }
        }
    }

    fn route_response(&self, response: JsonRpcResponse) {
        let Some(id) = response.request_id().cloned() else {
            warn!("Received response with null id");
            return;
        };

        let Some(call) = self.pending.lock().calls.remove(&id) else {
            warn!(id = %id, "Received response for unknown or expired request id");
            return;
        };

        if call.deadline.is_some_and(|deadline| Instant::now() > deadline) {
            debug!(id = %id, method = %call.method, "Response arrived after its deadline");
            let err = McpError::timeout(format!("Request '{}' timed out", call.method))
                .with_operation(call.method.as_str())
                .with_request_id(&id);
            call.complete(Delivery::Failed(err));
            return;
        }

        trace!(
            id = %id,
            method = %call.method,
            elapsed_ms = call.issued_at.elapsed().as_millis() as u64,
            "Routing response"
        );
        call.complete(Delivery::Response(response));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dispatcher_without_task() -> MessageDispatcher {
        MessageDispatcher {
            pending: Mutex::new(PendingTable::default()),
            request_handler: Mutex::new(None),
            notification_handler: Mutex::new(None),
            shutdown: Notify::new(),
        }
    }

    fn response_bytes(id: i64, result: serde_json::Value) -> TransportMessage {
        let payload = serde_json::to_vec(&JsonRpcResponse::success(result, MessageId::Number(id)))
            .unwrap();
        TransportMessage::new(MessageId::Number(id), payload)
    }

    #[tokio::test]
    async fn test_response_completes_matching_call_only() {
        let dispatcher = dispatcher_without_task();
        let one = dispatcher
            .register(MessageId::Number(1), "tools/call", Duration::from_secs(5))
            .unwrap();
        let mut two = dispatcher
            .register(MessageId::Number(2), "tools/call", Duration::from_secs(5))
            .unwrap();

        dispatcher.route_message(response_bytes(1, json!({"n": 1})));

        match one.await.unwrap() {
            Delivery::Response(resp) => assert_eq!(resp.result(), Some(&json!({"n": 1}))),
            other => panic!("unexpected delivery: {other:?}"),
        }
        assert!(two.try_recv().is_err());
        assert_eq!(dispatcher.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_and_unknown_responses_are_dropped() {
        let dispatcher = dispatcher_without_task();
        let rx = dispatcher
            .register(MessageId::Number(7), "ping", Duration::from_secs(5))
            .unwrap();

        dispatcher.route_message(response_bytes(7, json!({})));
        dispatcher.route_message(response_bytes(7, json!({"second": true})));
        dispatcher.route_message(response_bytes(99, json!({})));

        assert!(matches!(rx.await.unwrap(), Delivery::Response(_)));
        assert_eq!(dispatcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_call_ignores_late_response() {
        let dispatcher = dispatcher_without_task();
        let rx = dispatcher
            .register(MessageId::Number(3), "tools/list", Duration::from_secs(5))
            .unwrap();

        assert!(dispatcher.abandon(&MessageId::Number(3)));
        assert!(!dispatcher.abandon(&MessageId::Number(3)));
        dispatcher.route_message(response_bytes(3, json!({"tools": []})));

        // Sender was dropped with the entry; nothing was delivered
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_response_past_deadline_is_a_timeout() {
        let dispatcher = dispatcher_without_task();
        let rx = dispatcher
            .register(MessageId::Number(4), "ping", Duration::ZERO)
            .unwrap();
        std::thread::sleep(Duration::from_millis(2));

        dispatcher.route_message(response_bytes(4, json!({})));
        match rx.await.unwrap() {
            Delivery::Failed(err) => assert!(err.is_timeout()),
            other => panic!("unexpected delivery: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unbounded_timeout_still_delivers() {
        let dispatcher = dispatcher_without_task();
        let rx = dispatcher
            .register(MessageId::Number(5), "initialize", Duration::MAX)
            .unwrap();

        dispatcher.route_message(response_bytes(5, json!({"ok": true})));
        match rx.await.unwrap() {
            Delivery::Response(resp) => assert_eq!(resp.result(), Some(&json!({"ok": true}))),
            other => panic!("unexpected delivery: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_all_fails_waiters_and_rejects_new_calls() {
        let dispatcher = dispatcher_without_task();
        let a = dispatcher
            .register(MessageId::Number(1), "tools/call", Duration::from_secs(5))
            .unwrap();
        let b = dispatcher
            .register(MessageId::Number(2), "ping", Duration::from_secs(5))
            .unwrap();

        assert_eq!(dispatcher.cancel_all(), 2);

        for rx in [a, b] {
            match rx.await.unwrap() {
                Delivery::Failed(err) => assert!(err.is_session_closed()),
                other => panic!("unexpected delivery: {other:?}"),
            }
        }

        let err = dispatcher
            .register(MessageId::Number(3), "ping", Duration::from_secs(5))
            .unwrap_err();
        assert!(err.is_session_closed());
        assert_eq!(dispatcher.cancel_all(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_rejected() {
        let dispatcher = dispatcher_without_task();
        let _rx = dispatcher
            .register(MessageId::Number(1), "ping", Duration::from_secs(5))
            .unwrap();
        let err = dispatcher
            .register(MessageId::Number(1), "ping", Duration::from_secs(5))
            .unwrap_err();
        assert_eq!(err.kind, syncmcp_protocol::ErrorKind::Internal);
    }

    #[tokio::test]
    async fn test_malformed_message_is_dropped() {
        let dispatcher = dispatcher_without_task();
        let _rx = dispatcher
            .register(MessageId::Number(1), "ping", Duration::from_secs(5))
            .unwrap();
        dispatcher.route_message(TransportMessage::new(MessageId::Number(0), "not json"));
        assert_eq!(dispatcher.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_notifications_and_requests_reach_handlers() {
        let dispatcher = dispatcher_without_task();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        dispatcher.set_notification_handler(Arc::new(move |n: JsonRpcNotification| {
            sink.lock().push(n.method);
        }));
        let sink = Arc::clone(&seen);
        dispatcher.set_request_handler(Arc::new(move |r: JsonRpcRequest| {
            sink.lock().push(format!("request:{}", r.method));
        }));

        let notification = serde_json::to_vec(&json!({
            "jsonrpc": "2.0",
            "method": "notifications/tools/list_changed"
        }))
        .unwrap();
        let request =
            serde_json::to_vec(&json!({"jsonrpc": "2.0", "id": "s-1", "method": "ping"})).unwrap();
        dispatcher.route_message(TransportMessage::new(MessageId::Number(0), notification));
        dispatcher.route_message(TransportMessage::new(MessageId::Number(0), request));

        assert_eq!(
            *seen.lock(),
            vec![
                "notifications/tools/list_changed".to_string(),
                "request:ping".to_string()
            ]
        );
    }
}
