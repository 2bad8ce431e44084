//! The boundary between the session transport and the protocol logic.
//!
//! The transport never interprets message bodies. It forwards them to the
//! session's [`SessionHandler`], attaches to its outbound stream, and closes
//! it on teardown. A [`HandlerFactory`] builds one handler per session; no
//! handler instance is ever shared between sessions.

use std::future::Future;

use futures::stream::BoxStream;
use serde_json::Value;
use thiserror::Error;

/// Server-to-client messages for one session, ended by the handler on close.
pub type MessageStream = BoxStream<'static, Value>;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("a stream is already open for this session")]
    StreamAlreadyOpen,

    #[error("session handler is closed")]
    Closed,

    #[error("teardown failed: {0}")]
    Teardown(String),
}

/// Per-session request/response and streaming logic.
///
/// Implementations must be safe to call concurrently from several in-flight
/// requests of the same session and serialize their own state.
pub trait SessionHandler: Send + Sync + 'static {
    /// Process a request body (single message or batch). Returns `None` when
    /// the body carried nothing that needs an answer.
    ///
    /// Protocol-level failures are encoded in the returned body; the
    /// transport forwards them untouched.
    fn handle(&self, body: Value) -> impl Future<Output = Option<Value>> + Send;

    /// Attach the long-lived outbound channel.
    fn stream(&self) -> Result<MessageStream, HandlerError>;

    /// Release all resources and end any pending stream.
    ///
    /// Must be idempotent and must not assume earlier calls succeeded.
    fn close(&self) -> impl Future<Output = Result<(), HandlerError>> + Send;
}

/// Builds a fresh handler for each newly opened session.
pub trait HandlerFactory: Send + Sync + 'static {
    type Handler: SessionHandler;

    fn create(&self, session_id: &str) -> Self::Handler;
}
