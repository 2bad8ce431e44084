use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use payments_mcp::SessionHandler;

/// Lifecycle of a session. Moves forward only: a closed session is never
/// reopened and its id is never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Open,
    Closed,
}

/// One logical client conversation and the handler that owns its protocol state.
pub struct Session<H> {
    id: String,
    handler: H,
    state: Mutex<SessionState>,
    created_at: Instant,
}

impl<H: SessionHandler> Session<H> {
    pub fn new(id: impl Into<String>, handler: H) -> Self {
        Self {
            id: id.into(),
            handler,
            state: Mutex::new(SessionState::Uninitialized),
            created_at: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Uninitialized -> Open. Returns false in any other state.
    pub(crate) fn open(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != SessionState::Uninitialized {
            return false;
        }
        *state = SessionState::Open;
        true
    }

    /// Flip to Closed. Returns true only for the call that made the transition.
    pub(crate) fn mark_closed(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == SessionState::Closed {
            return false;
        }
        *state = SessionState::Closed;
        true
    }

    /// Release the handler. Teardown failures are logged, never propagated:
    /// the session counts as closed either way.
    pub(crate) async fn teardown(&self) {
        if let Err(e) = self.handler.close().await {
            tracing::warn!(session_id = %self.id, error = %e, "session handler teardown failed");
        }
    }
}
