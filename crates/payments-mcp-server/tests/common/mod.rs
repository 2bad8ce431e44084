//! Shared fixtures: a scripted session handler and app builders.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::web;
use futures::StreamExt;
use payments_mcp::{HandlerError, HandlerFactory, MessageStream, SessionHandler};
use payments_mcp_server::{AppState, ServerConfig};
use serde_json::{json, Value};
use tokio::sync::mpsc;

/// Echoes requests back as results. A request with method `notify` also
/// pushes its params onto the session's standing stream.
pub struct Scripted {
    session_id: String,
    outbound: Mutex<Option<mpsc::UnboundedSender<Value>>>,
    inbound: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
    closes: Arc<AtomicUsize>,
    fail_close: bool,
}

impl Scripted {
    fn answer(&self, message: &Value) -> Option<Value> {
        let id = message.get("id").filter(|id| !id.is_null())?.clone();
        let method = message.get("method").and_then(Value::as_str).unwrap_or("");
        if method == "notify" {
            if let Some(tx) = self.outbound.lock().unwrap().as_ref() {
                let _ = tx.send(message["params"].clone());
            }
        }
        Some(json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": { "method": method, "session": self.session_id },
        }))
    }
}

impl SessionHandler for Scripted {
    async fn handle(&self, body: Value) -> Option<Value> {
        match body {
            Value::Array(items) => {
                let replies: Vec<Value> = items.iter().filter_map(|m| self.answer(m)).collect();
                (!replies.is_empty()).then_some(Value::Array(replies))
            }
            single => self.answer(&single),
        }
    }

    fn stream(&self) -> Result<MessageStream, HandlerError> {
        let rx = self
            .inbound
            .lock()
            .unwrap()
            .take()
            .ok_or(HandlerError::StreamAlreadyOpen)?;
        Ok(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|message| (message, rx))
        })
        .boxed())
    }

    async fn close(&self) -> Result<(), HandlerError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.outbound.lock().unwrap().take();
        if self.fail_close {
            return Err(HandlerError::Teardown("upstream already gone".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct ScriptedFactory {
    pub closes: Arc<AtomicUsize>,
    pub fail_close: bool,
}

impl ScriptedFactory {
    pub fn failing() -> Self {
        Self {
            fail_close: true,
            ..Self::default()
        }
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl HandlerFactory for ScriptedFactory {
    type Handler = Scripted;

    fn create(&self, session_id: &str) -> Scripted {
        let (tx, rx) = mpsc::unbounded_channel();
        Scripted {
            session_id: session_id.to_string(),
            outbound: Mutex::new(Some(tx)),
            inbound: Mutex::new(Some(rx)),
            closes: Arc::clone(&self.closes),
            fail_close: self.fail_close,
        }
    }
}

pub fn test_config(metrics_token: Option<&str>) -> ServerConfig {
    let token = metrics_token.map(str::to_string);
    ServerConfig::from_lookup(move |name| match name {
        "MCP_HTTP_PORT" => Some("3000".to_string()),
        "METRICS_TOKEN" => token.clone(),
        _ => None,
    })
    .unwrap()
}

pub fn make_state<F: HandlerFactory>(factory: F) -> web::Data<AppState<F>> {
    web::Data::new(AppState::new(test_config(None), factory))
}

/// State whose standing streams send keep-alives every `keepalive`.
pub fn make_state_with_keepalive<F: HandlerFactory>(
    factory: F,
    keepalive: Duration,
) -> web::Data<AppState<F>> {
    let mut config = test_config(None);
    config.sse_keepalive = keepalive;
    web::Data::new(AppState::new(config, factory))
}

pub fn initialize(id: i64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "initialize",
        "params": {
            "protocolVersion": "2025-06-18",
            "capabilities": {},
            "clientInfo": { "name": "transport-tests", "version": "0.0.0" }
        }
    })
}
