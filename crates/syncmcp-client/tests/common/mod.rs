//! Shared test support: an in-memory transport driven by a scripted peer.
#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use syncmcp_protocol::MessageId;
use syncmcp_transport_traits::{
    Transport, TransportError, TransportMessage, TransportResult, TransportState,
};

/// Answers a request sent by the client, or `None` to leave it pending
pub type Responder = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

struct Shared {
    incoming: Mutex<Option<mpsc::UnboundedSender<TransportMessage>>>,
    sent: Mutex<Vec<Value>>,
    responder: Mutex<Option<Responder>>,
    fail_sends: AtomicBool,
    connected: AtomicBool,
    disconnects: AtomicUsize,
}

impl Shared {
    fn push(&self, message: &Value) {
        let payload = serde_json::to_vec(message).expect("serializable test message");
        if let Some(tx) = self.incoming.lock().as_ref() {
            let _ = tx.send(TransportMessage::new(MessageId::from("incoming"), payload));
        }
    }
}

/// Client side of the in-memory pair
pub struct MockTransport {
    shared: Arc<Shared>,
    incoming: tokio::sync::Mutex<mpsc::UnboundedReceiver<TransportMessage>>,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("sent", &self.shared.sent.lock().len())
            .finish()
    }
}

/// Test side of the in-memory pair. Usable from any thread.
#[derive(Clone)]
pub struct MockPeer {
    shared: Arc<Shared>,
}

impl MockTransport {
    pub fn pair() -> (Self, MockPeer) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            incoming: Mutex::new(Some(tx)),
            sent: Mutex::new(Vec::new()),
            responder: Mutex::new(None),
            fail_sends: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            disconnects: AtomicUsize::new(0),
        });
        (
            Self {
                shared: Arc::clone(&shared),
                incoming: tokio::sync::Mutex::new(rx),
            },
            MockPeer { shared },
        )
    }

    /// Pair whose peer answers with `responder`
    pub fn scripted(
        responder: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    ) -> (Self, MockPeer) {
        let (transport, peer) = Self::pair();
        peer.set_responder(responder);
        (transport, peer)
    }
}

impl Transport for MockTransport {
    fn state(&self) -> Pin<Box<dyn Future<Output = TransportState> + Send + '_>> {
        Box::pin(async move {
            if self.shared.connected.load(Ordering::SeqCst) {
                TransportState::Connected
            } else {
                TransportState::Disconnected
            }
        })
    }

    fn connect(&self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            self.shared.connected.store(true, Ordering::SeqCst);
            Ok(())
        })
    }

    fn disconnect(&self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            self.shared.connected.store(false, Ordering::SeqCst);
            self.shared.disconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn send(
        &self,
        message: TransportMessage,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            if self.shared.fail_sends.load(Ordering::SeqCst) {
                return Err(TransportError::SendFailed("mock send failure".to_string()));
            }
            let value: Value = serde_json::from_slice(&message.payload)
                .map_err(|e| TransportError::SendFailed(e.to_string()))?;
            self.shared.sent.lock().push(value.clone());

            let is_request = value.get("id").is_some() && value.get("method").is_some();
            if is_request {
                let responder = self.shared.responder.lock().clone();
                if let Some(reply) = responder.and_then(|respond| respond(&value)) {
                    self.shared.push(&reply);
                }
            }
            Ok(())
        })
    }

    fn receive(
        &self,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Option<TransportMessage>>> + Send + '_>> {
        Box::pin(async move { Ok(self.incoming.lock().await.recv().await) })
    }
}

impl MockPeer {
    pub fn set_responder(&self, responder: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static) {
        *self.shared.responder.lock() = Some(Arc::new(responder));
    }

    /// Deliver a raw JSON-RPC message to the client
    pub fn push(&self, message: Value) {
        self.shared.push(&message);
    }

    /// Answer `request` with a result
    pub fn respond(&self, request: &Value, result: Value) {
        self.push(json!({"jsonrpc": "2.0", "id": request["id"].clone(), "result": result}));
    }

    /// Answer `request` with a JSON-RPC error
    pub fn respond_error(&self, request: &Value, code: i32, message: &str) {
        self.push(json!({
            "jsonrpc": "2.0",
            "id": request["id"].clone(),
            "error": {"code": code, "message": message}
        }));
    }

    /// End the incoming stream; the client's next receive sees `None`
    pub fn close_stream(&self) {
        self.shared.incoming.lock().take();
    }

    pub fn fail_sends(&self, fail: bool) {
        self.shared.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn disconnects(&self) -> usize {
        self.shared.disconnects.load(Ordering::SeqCst)
    }

    /// Every message the client sent, in order
    pub fn sent(&self) -> Vec<Value> {
        self.shared.sent.lock().clone()
    }

    pub fn sent_methods(&self) -> Vec<String> {
        self.sent()
            .iter()
            .filter_map(|m| m["method"].as_str().map(str::to_string))
            .collect()
    }

    /// Requests (not notifications) the client sent for `method`
    pub fn requests(&self, method: &str) -> Vec<Value> {
        self.sent()
            .into_iter()
            .filter(|m| m["method"] == method && m.get("id").is_some())
            .collect()
    }

    /// Messages the client sent without a method: its answers to server requests
    pub fn responses(&self) -> Vec<Value> {
        self.sent()
            .into_iter()
            .filter(|m| m.get("method").is_none())
            .collect()
    }

    /// Block until at least `count` requests for `method` were sent
    pub fn wait_for_requests(&self, method: &str, count: usize, timeout: Duration) -> Vec<Value> {
        let deadline = Instant::now() + timeout;
        loop {
            let requests = self.requests(method);
            if requests.len() >= count {
                return requests;
            }
            assert!(
                Instant::now() < deadline,
                "timed out waiting for {count} '{method}' request(s); sent: {:?}",
                self.sent_methods()
            );
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    /// Async variant of [`wait_for_requests`](Self::wait_for_requests)
    pub async fn requests_eventually(
        &self,
        method: &str,
        count: usize,
        timeout: Duration,
    ) -> Vec<Value> {
        let deadline = Instant::now() + timeout;
        loop {
            let requests = self.requests(method);
            if requests.len() >= count {
                return requests;
            }
            assert!(
                Instant::now() < deadline,
                "timed out waiting for {count} '{method}' request(s); sent: {:?}",
                self.sent_methods()
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Wait until the client has answered `count` server requests
    pub async fn responses_eventually(&self, count: usize, timeout: Duration) -> Vec<Value> {
        let deadline = Instant::now() + timeout;
        loop {
            let responses = self.responses();
            if responses.len() >= count {
                return responses;
            }
            assert!(Instant::now() < deadline, "timed out waiting for client responses");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

/// Poll `condition` until it holds or two seconds pass
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Fixtures

pub fn initialize_result() -> Value {
    json!({
        "protocolVersion": "2025-06-18",
        "capabilities": {
            "tools": {"listChanged": true},
            "logging": {}
        },
        "serverInfo": {"name": "mock-calculator", "version": "1.2.3"},
        "instructions": "Use the calculator tool for arithmetic."
    })
}

/// `calculator` descriptor whose output schema requires a numeric `result`
/// and a string `operation`
pub fn calculator_tool() -> Value {
    json!({
        "name": "calculator",
        "description": "Performs mathematical calculations",
        "inputSchema": {
            "type": "object",
            "properties": {"expression": {"type": "string"}},
            "required": ["expression"]
        },
        "outputSchema": {
            "type": "object",
            "properties": {
                "result": {"type": "number"},
                "operation": {"type": "string"}
            },
            "required": ["result", "operation"]
        }
    })
}

/// `calculator` descriptor without an output schema
pub fn unchecked_calculator_tool() -> Value {
    json!({
        "name": "calculator",
        "description": "Performs mathematical calculations",
        "inputSchema": {
            "type": "object",
            "properties": {"expression": {"type": "string"}}
        }
    })
}

pub fn call_result(structured: Value) -> Value {
    json!({
        "content": [{"type": "text", "text": structured.to_string()}],
        "structuredContent": structured,
        "isError": false
    })
}

/// A server that completes the handshake, lists `tools`, answers `ping`, and
/// answers every `tools/call` with `call`. Other requests stay pending.
pub fn server(
    tools: Vec<Value>,
    call: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static,
) -> impl Fn(&Value) -> Option<Value> + Send + Sync + 'static {
    move |request: &Value| {
        let result = match request["method"].as_str()? {
            "initialize" => initialize_result(),
            "tools/list" => json!({"tools": tools.clone()}),
            "ping" => json!({}),
            "tools/call" => match call(request)? {
                reply if reply.get("error").is_some() => {
                    return Some(json!({
                        "jsonrpc": "2.0",
                        "id": request["id"].clone(),
                        "error": reply["error"].clone()
                    }));
                }
                reply => reply,
            },
            _ => return None,
        };
        Some(json!({"jsonrpc": "2.0", "id": request["id"].clone(), "result": result}))
    }
}
