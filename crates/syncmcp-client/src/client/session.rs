//! Session state machine
//!
//! ```text
//! Uninitialized ──initialize──▶ Handshaking ──response──▶ Ready
//!       ▲                           │                       │
//!       └──────── failed ───────────┘                     close
//!                                                           ▼
//!                                   Closed ◀──────────── Closing
//! ```
//!
//! Every operation other than the handshake enters the session through
//! [`Session::enter`], which admits it only while `Ready` and counts it as
//! active until its guard drops. `close_gracefully` waits on that count.

use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

use syncmcp_protocol::{InitializeResult, McpError, McpResult};

/// Lifecycle of a client session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No handshake attempted yet, or the last one failed
    Uninitialized,
    /// `initialize` sent, response pending
    Handshaking,
    /// Handshake complete; operations are accepted
    Ready,
    /// `close` requested; new operations are rejected
    Closing,
    /// Terminal
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Handshaking => "handshaking",
            Self::Ready => "ready",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
struct SessionInner {
    state: SessionState,
    init: Option<InitializeResult>,
    active: usize,
}

/// Owns the session state, the negotiated handshake result and the count of
/// operations in flight
#[derive(Debug)]
pub(crate) struct Session {
    inner: Mutex<SessionInner>,
    idle: Notify,
}

/// An admitted operation; leaves the session when dropped
#[derive(Debug)]
pub(crate) struct ActiveOperation<'a> {
    session: &'a Session,
}

impl Drop for ActiveOperation<'_> {
    fn drop(&mut self) {
        let idle = {
            let mut inner = self.session.inner.lock();
            inner.active = inner.active.saturating_sub(1);
            inner.active == 0
        };
        if idle {
            self.session.idle.notify_waiters();
        }
    }
}

impl Session {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                state: SessionState::Uninitialized,
                init: None,
                active: 0,
            }),
            idle: Notify::new(),
        }
    }

    pub(crate) fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    pub(crate) fn initialize_result(&self) -> Option<InitializeResult> {
        self.inner.lock().init.clone()
    }

    pub(crate) fn active_operations(&self) -> usize {
        self.inner.lock().active
    }

    fn transition(inner: &mut SessionInner, to: SessionState) {
        debug!(from = %inner.state, to = %to, "Session state transition");
        inner.state = to;
    }

    /// Start a handshake.
    ///
    /// Returns `Ok(Some(cached))` when the session is already `Ready`, in which
    /// case no handshake is needed.
    pub(crate) fn begin_handshake(&self) -> McpResult<Option<InitializeResult>> {
        let mut inner = self.inner.lock();
        match inner.state {
            SessionState::Uninitialized => {
                Self::transition(&mut inner, SessionState::Handshaking);
                Ok(None)
            }
            SessionState::Ready => Ok(inner.init.clone()),
            SessionState::Handshaking => Err(McpError::not_ready(
                syncmcp_protocol::methods::INITIALIZE,
                SessionState::Handshaking,
            )),
            SessionState::Closing | SessionState::Closed => Err(McpError::session_closed()
                .with_operation(syncmcp_protocol::methods::INITIALIZE)),
        }
    }

    /// Record the accepted handshake result and become `Ready`.
    ///
    /// Fails if the session was closed while the handshake was running.
    pub(crate) fn complete_handshake(&self, result: InitializeResult) -> McpResult<()> {
        let mut inner = self.inner.lock();
        match inner.state {
            SessionState::Handshaking => {
                inner.init = Some(result);
                Self::transition(&mut inner, SessionState::Ready);
                Ok(())
            }
            SessionState::Closing | SessionState::Closed => Err(McpError::session_closed()
                .with_operation(syncmcp_protocol::methods::INITIALIZE)),
            other => Err(McpError::internal(format!(
                "Handshake completed in unexpected state {}",
                other
            ))),
        }
    }

    /// Return to `Uninitialized` after a failed handshake
    pub(crate) fn abort_handshake(&self) {
        let mut inner = self.inner.lock();
        if inner.state == SessionState::Handshaking {
            Self::transition(&mut inner, SessionState::Uninitialized);
        }
    }

    fn check_ready(inner: &SessionInner, operation: &str) -> McpResult<()> {
        match inner.state {
            SessionState::Ready => Ok(()),
            SessionState::Closing | SessionState::Closed => {
                Err(McpError::session_closed().with_operation(operation))
            }
            state => Err(McpError::not_ready(operation, state)),
        }
    }

    /// Admit an operation if the session is `Ready`
    pub(crate) fn enter(&self, operation: &str) -> McpResult<ActiveOperation<'_>> {
        let mut inner = self.inner.lock();
        Self::check_ready(&inner, operation)?;
        inner.active += 1;
        Ok(ActiveOperation { session: self })
    }

    /// Move to `Closing`. Returns the previous state, or `None` when the
    /// session is already `Closed`.
    pub(crate) fn begin_close(&self) -> Option<SessionState> {
        let mut inner = self.inner.lock();
        let previous = inner.state;
        match previous {
            SessionState::Closed => None,
            SessionState::Closing => Some(previous),
            _ => {
                Self::transition(&mut inner, SessionState::Closing);
                Some(previous)
            }
        }
    }

    pub(crate) fn finish_close(&self) {
        let mut inner = self.inner.lock();
        if inner.state != SessionState::Closed {
            Self::transition(&mut inner, SessionState::Closed);
        }
    }

    /// Wait until no operation is active or `grace` elapses. Returns `true`
    /// if the session drained in time.
    /// A `grace` too large to represent waits without bound.
    pub(crate) async fn wait_idle(&self, grace: Duration) -> bool {
        let deadline = tokio::time::Instant::now().checked_add(grace);
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register interest before checking so a wakeup in between is kept
            notified.as_mut().enable();

            if self.active_operations() == 0 {
                return true;
            }
            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return self.active_operations() == 0;
                    }
                }
                None => notified.await,
            }
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncmcp_protocol::{Implementation, ServerCapabilities};

    fn init_result() -> InitializeResult {
        InitializeResult {
            protocol_version: syncmcp_protocol::PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities::default(),
            server_info: Implementation::new("mock-server", "1.0.0"),
            instructions: None,
            _meta: None,
        }
    }

    #[test]
    fn test_handshake_lifecycle() {
        let session = Session::new();
        assert_eq!(session.state(), SessionState::Uninitialized);

        assert!(session.begin_handshake().unwrap().is_none());
        assert_eq!(session.state(), SessionState::Handshaking);

        let err = session.begin_handshake().unwrap_err();
        assert!(err.is_not_ready());

        session.complete_handshake(init_result()).unwrap();
        assert_eq!(session.state(), SessionState::Ready);

        let cached = session.begin_handshake().unwrap().unwrap();
        assert_eq!(cached.server_info.name, "mock-server");
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn test_failed_handshake_can_be_retried() {
        let session = Session::new();
        session.begin_handshake().unwrap();
        session.abort_handshake();
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(session.begin_handshake().unwrap().is_none());
    }

    #[test]
    fn test_operations_gated_on_ready() {
        let session = Session::new();
        let err = session.enter("tools/call").unwrap_err();
        assert!(err.is_not_ready());
        assert!(err.message.contains("uninitialized"));

        session.begin_handshake().unwrap();
        assert!(session.enter("ping").unwrap_err().is_not_ready());

        session.complete_handshake(init_result()).unwrap();
        let op = session.enter("tools/call").unwrap();
        assert_eq!(session.active_operations(), 1);
        drop(op);
        assert_eq!(session.active_operations(), 0);
    }

    #[test]
    fn test_close_is_terminal_and_idempotent() {
        let session = Session::new();
        session.begin_handshake().unwrap();
        session.complete_handshake(init_result()).unwrap();

        assert_eq!(session.begin_close(), Some(SessionState::Ready));
        assert!(session.enter("ping").unwrap_err().is_session_closed());
        session.finish_close();
        assert_eq!(session.state(), SessionState::Closed);

        assert_eq!(session.begin_close(), None);
        assert!(session.begin_handshake().unwrap_err().is_session_closed());
    }

    #[test]
    fn test_close_during_handshake_rejects_completion() {
        let session = Session::new();
        session.begin_handshake().unwrap();
        session.begin_close();
        assert!(
            session
                .complete_handshake(init_result())
                .unwrap_err()
                .is_session_closed()
        );
    }

    #[tokio::test]
    async fn test_wait_idle() {
        let session = Session::new();
        session.begin_handshake().unwrap();
        session.complete_handshake(init_result()).unwrap();

        assert!(session.wait_idle(Duration::from_millis(10)).await);

        let op = session.enter("tools/call").unwrap();
        assert!(!session.wait_idle(Duration::from_millis(20)).await);
        drop(op);
        assert!(session.wait_idle(Duration::from_millis(20)).await);
    }

    #[tokio::test]
    async fn test_wait_idle_with_unbounded_grace() {
        let session = Session::new();
        session.begin_handshake().unwrap();
        session.complete_handshake(init_result()).unwrap();
        assert!(session.wait_idle(Duration::MAX).await);

        let op = session.enter("tools/call").unwrap();
        let release = async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            drop(op);
        };
        let (idle, ()) = tokio::join!(session.wait_idle(Duration::MAX), release);
        assert!(idle);
    }
}
