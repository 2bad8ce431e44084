//! Routes transport requests to sessions.
//!
//! The router owns the registry and the handler factory. It decides whether
//! a POST opens a session or continues one, attaches standing streams, and
//! closes sessions. It never looks inside message bodies beyond detecting an
//! initialize request.

use std::sync::Arc;

use payments_mcp::jsonrpc::contains_initialize;
use payments_mcp::{HandlerError, HandlerFactory, MessageStream, SessionHandler};
use serde_json::Value;
use uuid::Uuid;

use crate::error::TransportError;
use crate::metrics::{ACTIVE_SESSIONS, SESSIONS_CLOSED, SESSIONS_OPENED};
use crate::registry::{CloseOutcome, SessionRegistry};
use crate::session::{Session, SessionState};

/// Why a session was closed, for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Explicit DELETE from the client
    Delete,
    /// The standing stream's connection went away
    Disconnect,
    /// Process shutdown
    Shutdown,
}

impl CloseReason {
    pub fn as_str(self) -> &'static str {
        match self {
            CloseReason::Delete => "delete",
            CloseReason::Disconnect => "disconnect",
            CloseReason::Shutdown => "shutdown",
        }
    }
}

/// What a POST produced.
#[derive(Debug)]
pub struct PostOutcome {
    /// Session the request was served by; always echoed to the client
    pub session_id: String,
    /// True when this request opened the session
    pub created: bool,
    /// Handler reply, `None` when nothing needs an answer
    pub body: Option<Value>,
}

pub struct SessionRouter<F: HandlerFactory> {
    factory: F,
    registry: Arc<SessionRegistry<F::Handler>>,
    debug: bool,
}

impl<F: HandlerFactory> SessionRouter<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            registry: Arc::new(SessionRegistry::new()),
            debug: false,
        }
    }

    /// Log every routing decision at info level.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn registry(&self) -> &Arc<SessionRegistry<F::Handler>> {
        &self.registry
    }

    /// Route a request body. Without a session id the body must contain an
    /// initialize request, which opens a new session; with one, the body
    /// goes to that session's handler.
    pub async fn post(
        &self,
        session_id: Option<&str>,
        body: Value,
    ) -> Result<PostOutcome, TransportError> {
        match session_id {
            Some(id) => {
                let session = self
                    .registry
                    .lookup(id)
                    .ok_or(TransportError::SessionNotFound("Invalid session"))?;
                let reply = session.handler().handle(body).await;
                // Closed while the handler ran: same answer as an unknown id
                if session.state() == SessionState::Closed {
                    return Err(TransportError::SessionNotFound("Invalid session"));
                }
                Ok(PostOutcome {
                    session_id: id.to_string(),
                    created: false,
                    body: reply,
                })
            }
            None => {
                if !contains_initialize(&body) {
                    return Err(TransportError::SessionNotFound(
                        "No valid session ID provided",
                    ));
                }
                let session = self.open()?;
                let reply = session.handler().handle(body).await;
                Ok(PostOutcome {
                    session_id: session.id().to_string(),
                    created: true,
                    body: reply,
                })
            }
        }
    }

    /// Create and register a session. Registration happens before the
    /// handler sees any message, so the id is resolvable as soon as a reply
    /// carrying it can exist.
    fn open(&self) -> Result<Arc<Session<F::Handler>>, TransportError> {
        let id = Uuid::new_v4().to_string();
        let session = Arc::new(Session::new(id.clone(), self.factory.create(&id)));
        self.registry
            .register(Arc::clone(&session))
            .map_err(|_| TransportError::DuplicateSession(id.clone()))?;

        SESSIONS_OPENED.inc();
        ACTIVE_SESSIONS.set(self.registry.len() as i64);
        tracing::info!(session_id = %id, "session opened");
        Ok(session)
    }

    /// Attach the standing server-to-client stream of a session.
    pub fn stream(&self, session_id: Option<&str>) -> Result<(String, MessageStream), TransportError> {
        let id = session_id.ok_or(TransportError::MalformedRequest(
            "Missing mcp-session-id header",
        ))?;
        let session = self
            .registry
            .lookup(id)
            .ok_or(TransportError::SessionNotFound("Invalid session"))?;

        let stream = session.handler().stream().map_err(|e| match e {
            HandlerError::StreamAlreadyOpen => TransportError::StreamConflict,
            HandlerError::Closed | HandlerError::Teardown(_) => {
                TransportError::SessionNotFound("Invalid session")
            }
        })?;
        if self.debug {
            tracing::info!(session_id = %id, "standing stream attached");
        }
        Ok((id.to_string(), stream))
    }

    /// Close a session on client request. A repeated close is a no-op; an
    /// id that was never issued is an error.
    pub async fn close(&self, session_id: Option<&str>) -> Result<CloseOutcome, TransportError> {
        let id = session_id.ok_or(TransportError::MalformedRequest(
            "Missing mcp-session-id header",
        ))?;
        match self.close_session(id, CloseReason::Delete).await {
            CloseOutcome::NotFound => Err(TransportError::SessionNotFound("Invalid session")),
            outcome => Ok(outcome),
        }
    }

    /// Close by id for any reason. Never fails.
    pub async fn close_session(&self, id: &str, reason: CloseReason) -> CloseOutcome {
        let outcome = self.registry.close(id).await;
        if outcome == CloseOutcome::Closed {
            SESSIONS_CLOSED.with_label_values(&[reason.as_str()]).inc();
            ACTIVE_SESSIONS.set(self.registry.len() as i64);
            if self.debug {
                tracing::info!(session_id = %id, reason = reason.as_str(), "session torn down");
            }
        }
        outcome
    }

    /// Close every live session.
    pub async fn shutdown(&self) -> usize {
        let closed = self.registry.close_all().await;
        if closed > 0 {
            SESSIONS_CLOSED
                .with_label_values(&[CloseReason::Shutdown.as_str()])
                .inc_by(closed as u64);
        }
        ACTIVE_SESSIONS.set(self.registry.len() as i64);
        closed
    }
}
