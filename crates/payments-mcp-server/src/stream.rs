//! Server-sent events body for the standing stream.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use actix_web::web::Bytes;
use futures::{Stream, StreamExt};
use payments_mcp::{HandlerFactory, MessageStream};
use serde_json::Value;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::metrics::OPEN_STREAMS;
use crate::router::{CloseReason, SessionRouter};

/// SSE comment line; clients ignore it.
pub const KEEPALIVE: &[u8] = b": keepalive\n\n";

/// Encode one message as an SSE `message` event.
pub fn encode_event(message: &Value) -> Bytes {
    Bytes::from(format!("event: message\ndata: {message}\n\n"))
}

/// Streams a session's outbound messages as SSE.
///
/// If the body is dropped before the handler ends the stream, the client
/// went away: the session is closed in the background. A stream that ended
/// because the session was closed does nothing on drop.
///
/// The server only learns about a vanished peer when a write fails, so an
/// idle stream emits a keep-alive comment every `keepalive`.
pub struct EventStream<F: HandlerFactory> {
    messages: MessageStream,
    keepalive: Interval,
    finished: bool,
    router: Arc<SessionRouter<F>>,
    session_id: String,
}

impl<F: HandlerFactory> EventStream<F> {
    pub fn new(
        messages: MessageStream,
        router: Arc<SessionRouter<F>>,
        session_id: String,
        keepalive: Duration,
    ) -> Self {
        let mut keepalive = interval_at(Instant::now() + keepalive, keepalive);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        OPEN_STREAMS.inc();
        Self {
            messages,
            keepalive,
            finished: false,
            router,
            session_id,
        }
    }
}

impl<F: HandlerFactory> Stream for EventStream<F> {
    type Item = Result<Bytes, actix_web::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.messages.poll_next_unpin(cx) {
            Poll::Ready(Some(message)) => {
                self.keepalive.reset();
                Poll::Ready(Some(Ok(encode_event(&message))))
            }
            Poll::Ready(None) => {
                self.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => match self.keepalive.poll_tick(cx) {
                Poll::Ready(_) => Poll::Ready(Some(Ok(Bytes::from_static(KEEPALIVE)))),
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

impl<F: HandlerFactory> Drop for EventStream<F> {
    fn drop(&mut self) {
        OPEN_STREAMS.dec();
        if self.finished {
            return;
        }

        let router = Arc::clone(&self.router);
        let session_id = std::mem::take(&mut self.session_id);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    router
                        .close_session(&session_id, CloseReason::Disconnect)
                        .await;
                });
            }
            Err(_) => {
                tracing::warn!(session_id = %session_id, "stream dropped outside runtime, session left open");
            }
        }
    }
}
