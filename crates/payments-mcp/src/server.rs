//! Per-session MCP protocol handler.
//!
//! One [`PaymentsMcpServer`] is created for every transport session by
//! [`PaymentsHandlerFactory`]. Protocol state (negotiated version, log
//! level) lives inside the instance, so sessions never observe
//! each other. The tool registry is immutable and shared.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::handler::{HandlerError, HandlerFactory, MessageStream, SessionHandler};
use crate::jsonrpc::{
    error_envelope, ErrorObject, Message, Payload, Response, INTERNAL_ERROR, INVALID_PARAMS,
    MALFORMED_REQUEST, METHOD_NOT_FOUND, SESSION_NOT_FOUND,
};
use crate::tools::ToolRegistry;
use crate::{SERVER_NAME, SERVER_VERSION};

/// Protocol revisions this server speaks, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

pub const LATEST_PROTOCOL_VERSION: &str = SUPPORTED_PROTOCOL_VERSIONS[0];

/// Bound on queued server-to-client messages per session.
const OUTBOUND_CAPACITY: usize = 64;

const INSTRUCTIONS: &str = "Payment tools for Pagar.me (Core API v5) and Woovi/OpenPix. \
     Amounts are integers in cents. Tools prefixed pagarme_ need PAGARME_API_KEY, \
     tools prefixed woovi_ need WOOVI_APP_ID.";

/// MCP logging levels (RFC 5424 order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

#[derive(Debug, Default)]
struct ProtocolState {
    protocol_version: Option<String>,
    /// Set once the client sent `notifications/initialized`.
    ready: bool,
    log_level: Option<LogLevel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeParams {
    protocol_version: String,
    #[serde(default)]
    client_info: Option<ClientInfo>,
}

#[derive(Debug, Deserialize)]
struct ClientInfo {
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct SetLevelParams {
    level: LogLevel,
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> Result<T, ErrorObject> {
    serde_json::from_value(params.unwrap_or_else(|| json!({})))
        .map_err(|e| ErrorObject::new(INVALID_PARAMS, format!("invalid params: {e}")))
}

pub struct PaymentsMcpServer {
    session_id: String,
    tools: Arc<ToolRegistry>,
    state: Mutex<ProtocolState>,
    outbound: mpsc::Sender<Value>,
    inbound: Mutex<Option<mpsc::Receiver<Value>>>,
    cancel: CancellationToken,
}

impl PaymentsMcpServer {
    pub fn new(session_id: impl Into<String>, tools: Arc<ToolRegistry>) -> Self {
        let (outbound, inbound) = mpsc::channel(OUTBOUND_CAPACITY);
        Self {
            session_id: session_id.into(),
            tools,
            state: Mutex::new(ProtocolState::default()),
            outbound,
            inbound: Mutex::new(Some(inbound)),
            cancel: CancellationToken::new(),
        }
    }

    /// Negotiated protocol version, once `initialize` succeeded.
    pub fn protocol_version(&self) -> Option<String> {
        self.state().protocol_version.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.state().ready
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn state(&self) -> MutexGuard<'_, ProtocolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn handle_message(&self, value: Value) -> Option<Response> {
        let message = match Message::parse(&value) {
            Ok(m) => m,
            Err(rejection) => return Some(rejection),
        };

        match message {
            Message::Request { id, method, params } => {
                let outcome = self.dispatch(&method, params).await;
                Some(match outcome {
                    Ok(result) => Response::success(id, result),
                    Err(error) => {
                        tracing::debug!(
                            session_id = %self.session_id,
                            method = %method,
                            code = error.code,
                            "request failed"
                        );
                        Response::failure(Some(id), error)
                    }
                })
            }
            Message::Notification { method, .. } => {
                self.on_notification(&method);
                None
            }
            Message::Response => None,
        }
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, ErrorObject> {
        match method {
            "initialize" => self.initialize(params),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.tools.definitions() })),
            "tools/call" => self.call_tool(params).await,
            "logging/setLevel" => self.set_level(params),
            other => Err(ErrorObject::new(
                METHOD_NOT_FOUND,
                format!("method not found: {other}"),
            )),
        }
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, ErrorObject> {
        let params: InitializeParams = parse_params(params)?;

        let version = if SUPPORTED_PROTOCOL_VERSIONS.contains(&params.protocol_version.as_str()) {
            params.protocol_version.clone()
        } else {
            LATEST_PROTOCOL_VERSION.to_string()
        };

        {
            let mut state = self.state();
            if state.protocol_version.is_some() {
                return Err(ErrorObject::new(
                    MALFORMED_REQUEST,
                    "session already initialized",
                ));
            }
            state.protocol_version = Some(version.clone());
        }

        let (client, client_version) = params
            .client_info
            .as_ref()
            .map(|c| (c.name.as_str(), c.version.as_str()))
            .unwrap_or(("unknown", ""));
        tracing::info!(
            session_id = %self.session_id,
            client,
            client_version,
            requested = %params.protocol_version,
            negotiated = %version,
            "session initialized"
        );

        Ok(json!({
            "protocolVersion": version,
            "capabilities": {
                "tools": { "listChanged": false },
                "logging": {},
            },
            "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
            "instructions": INSTRUCTIONS,
        }))
    }

    fn set_level(&self, params: Option<Value>) -> Result<Value, ErrorObject> {
        let params: SetLevelParams = parse_params(params)?;
        self.state().log_level = Some(params.level);
        tracing::debug!(session_id = %self.session_id, level = ?params.level, "log level set");
        Ok(json!({}))
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, ErrorObject> {
        let params: CallToolParams = parse_params(params)?;
        let output = self
            .tools
            .call(&params.name, params.arguments)
            .await
            .ok_or_else(|| {
                ErrorObject::new(INVALID_PARAMS, format!("unknown tool: {}", params.name))
            })?;

        let level = if output.is_error {
            LogLevel::Error
        } else {
            LogLevel::Info
        };
        self.log(
            level,
            json!({ "tool": params.name, "isError": output.is_error }),
        );

        serde_json::to_value(output)
            .map_err(|e| ErrorObject::new(INTERNAL_ERROR, format!("encoding tool result: {e}")))
    }

    fn on_notification(&self, method: &str) {
        match method {
            "notifications/initialized" => self.state().ready = true,
            _ => tracing::debug!(session_id = %self.session_id, method, "notification ignored"),
        }
    }

    /// Queue a `notifications/message` if the client asked for this level.
    /// Never waits: a full queue drops the message.
    fn log(&self, level: LogLevel, data: Value) {
        let enabled = self.state().log_level.is_some_and(|min| level >= min);
        if !enabled {
            return;
        }
        let message = json!({
            "jsonrpc": "2.0",
            "method": "notifications/message",
            "params": { "level": level, "logger": "tools", "data": data },
        });
        if let Err(mpsc::error::TrySendError::Full(_)) = self.outbound.try_send(message) {
            tracing::debug!(session_id = %self.session_id, "outbound queue full, log message dropped");
        }
    }
}

impl SessionHandler for PaymentsMcpServer {
    async fn handle(&self, body: Value) -> Option<Value> {
        if self.is_closed() {
            return Some(error_envelope(SESSION_NOT_FOUND, "Session closed"));
        }

        match Payload::from_body(body) {
            Err(error) => Some(Response::failure(None, error).into_value()),
            Ok(Payload::Single(message)) => self
                .handle_message(message)
                .await
                .map(Response::into_value),
            Ok(Payload::Batch(messages)) => {
                let mut responses = Vec::with_capacity(messages.len());
                for message in messages {
                    if let Some(response) = self.handle_message(message).await {
                        responses.push(response.into_value());
                    }
                }
                (!responses.is_empty()).then_some(Value::Array(responses))
            }
        }
    }

    fn stream(&self) -> Result<MessageStream, HandlerError> {
        if self.is_closed() {
            return Err(HandlerError::Closed);
        }
        let receiver = self
            .inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(HandlerError::StreamAlreadyOpen)?;

        Ok(ReceiverStream::new(receiver)
            .take_until(self.cancel.clone().cancelled_owned())
            .boxed())
    }

    async fn close(&self) -> Result<(), HandlerError> {
        if self.cancel.is_cancelled() {
            return Ok(());
        }
        self.cancel.cancel();
        self.inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        tracing::debug!(session_id = %self.session_id, "protocol handler closed");
        Ok(())
    }
}

/// Creates one [`PaymentsMcpServer`] per session over a shared tool registry.
#[derive(Clone)]
pub struct PaymentsHandlerFactory {
    tools: Arc<ToolRegistry>,
}

impl PaymentsHandlerFactory {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools }
    }
}

impl HandlerFactory for PaymentsHandlerFactory {
    type Handler = PaymentsMcpServer;

    fn create(&self, session_id: &str) -> PaymentsMcpServer {
        PaymentsMcpServer::new(session_id, Arc::clone(&self.tools))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use std::time::Duration;

    fn factory() -> PaymentsHandlerFactory {
        PaymentsHandlerFactory::new(Arc::new(ToolRegistry::new(ProviderConfig::default()).unwrap()))
    }

    fn init(id: i64, version: &str) -> Value {
        json!({
            "jsonrpc": "2.0", "id": id, "method": "initialize",
            "params": {"protocolVersion": version, "capabilities": {}, "clientInfo": {"name": "test", "version": "0"}}
        })
    }

    #[tokio::test]
    async fn test_initialize_negotiates_version() {
        let server = factory().create("s1");
        let resp = server.handle(init(1, "2025-03-26")).await.unwrap();
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(resp["result"]["serverInfo"]["name"], SERVER_NAME);
        assert!(resp["result"]["capabilities"]["tools"].is_object());

        let other = factory().create("s2");
        let resp = other.handle(init(1, "1999-01-01")).await.unwrap();
        assert_eq!(resp["result"]["protocolVersion"], LATEST_PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_initialize_without_client_info() {
        let server = factory().create("s1");
        let resp = server
            .handle(json!({
                "jsonrpc": "2.0", "id": 1, "method": "initialize",
                "params": {"protocolVersion": "2024-11-05", "capabilities": {}}
            }))
            .await
            .unwrap();
        assert_eq!(resp["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(server.protocol_version().as_deref(), Some("2024-11-05"));
    }

    #[tokio::test]
    async fn test_second_initialize_rejected() {
        let server = factory().create("s1");
        server.handle(init(1, LATEST_PROTOCOL_VERSION)).await.unwrap();
        let resp = server.handle(init(2, LATEST_PROTOCOL_VERSION)).await.unwrap();
        assert_eq!(resp["error"]["code"], MALFORMED_REQUEST);
        assert_eq!(resp["id"], 2);
    }

    #[tokio::test]
    async fn test_batch_answers_in_order_and_skips_notifications() {
        let server = factory().create("s1");
        let body = json!([
            init(1, LATEST_PROTOCOL_VERSION),
            {"jsonrpc": "2.0", "method": "notifications/initialized"},
            {"jsonrpc": "2.0", "id": 2, "method": "tools/list"},
        ]);
        let resp = server.handle(body).await.unwrap();
        let items = resp.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["id"], 1);
        assert_eq!(items[1]["id"], 2);
        assert_eq!(items[1]["result"]["tools"].as_array().unwrap().len(), 25);
        assert!(server.is_ready());
    }

    #[tokio::test]
    async fn test_notification_only_body_has_no_answer() {
        let server = factory().create("s1");
        let note = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        assert!(server.handle(note).await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_method_and_tool() {
        let server = factory().create("s1");
        let resp = server
            .handle(json!({"jsonrpc": "2.0", "id": 1, "method": "resources/list"}))
            .await
            .unwrap();
        assert_eq!(resp["error"]["code"], METHOD_NOT_FOUND);

        let resp = server
            .handle(json!({
                "jsonrpc": "2.0", "id": 2, "method": "tools/call",
                "params": {"name": "nope", "arguments": {}}
            }))
            .await
            .unwrap();
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_tool_failure_is_a_result_not_an_error() {
        let server = factory().create("s1");
        let resp = server
            .handle(json!({
                "jsonrpc": "2.0", "id": 3, "method": "tools/call",
                "params": {"name": "woovi_get_charge", "arguments": {"id": "abc"}}
            }))
            .await
            .unwrap();
        assert!(resp.get("error").is_none());
        assert_eq!(resp["result"]["isError"], true);
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("WOOVI_APP_ID"));
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_state() {
        let f = factory();
        let a = f.create("a");
        let b = f.create("b");
        a.handle(init(1, "2024-11-05")).await.unwrap();
        assert_eq!(a.protocol_version().as_deref(), Some("2024-11-05"));
        assert!(b.protocol_version().is_none());
        let resp = b.handle(init(1, LATEST_PROTOCOL_VERSION)).await.unwrap();
        assert!(resp.get("result").is_some());
    }

    #[tokio::test]
    async fn test_log_messages_reach_the_stream() {
        let server = factory().create("s1");
        let mut stream = server.stream().unwrap();
        server
            .handle(json!({
                "jsonrpc": "2.0", "id": 1, "method": "logging/setLevel",
                "params": {"level": "debug"}
            }))
            .await
            .unwrap();
        server
            .handle(json!({
                "jsonrpc": "2.0", "id": 2, "method": "tools/call",
                "params": {
                    "name": "woovi_verify_webhook_hmac",
                    "arguments": {"secret": "s", "signature": "x", "body": "{}"}
                }
            }))
            .await
            .unwrap();

        let message = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message["method"], "notifications/message");
        assert_eq!(message["params"]["level"], "info");
        assert_eq!(message["params"]["data"]["tool"], "woovi_verify_webhook_hmac");
    }

    #[tokio::test]
    async fn test_single_stream_per_session() {
        let server = factory().create("s1");
        let _first = server.stream().unwrap();
        assert!(matches!(
            server.stream(),
            Err(HandlerError::StreamAlreadyOpen)
        ));
    }

    #[tokio::test]
    async fn test_close_ends_pending_stream_and_is_idempotent() {
        let server = factory().create("s1");
        let mut stream = server.stream().unwrap();
        let pending = tokio::spawn(async move { stream.next().await });

        server.close().await.unwrap();
        server.close().await.unwrap();

        let next = tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .expect("stream did not end after close")
            .unwrap();
        assert!(next.is_none());
        assert!(matches!(server.stream(), Err(HandlerError::Closed)));
    }

    #[tokio::test]
    async fn test_requests_after_close_report_closed_session() {
        let server = factory().create("s1");
        server.close().await.unwrap();
        let resp = server
            .handle(json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}))
            .await
            .unwrap();
        assert_eq!(resp["error"]["code"], SESSION_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_bodies() {
        let server = factory().create("s1");
        let resp = server.handle(json!(7)).await.unwrap();
        assert_eq!(resp["error"]["code"], MALFORMED_REQUEST);
        let resp = server
            .handle(json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}))
            .await
            .unwrap();
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
    }
}
