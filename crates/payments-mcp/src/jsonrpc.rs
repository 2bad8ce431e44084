//! JSON-RPC 2.0 envelope used by MCP.
//!
//! The transport only needs two things from this module: the stable error
//! codes it answers with, and [`contains_initialize`] to decide whether a
//! session-less POST is allowed to open a new session. The per-session
//! handler uses the message model to dispatch.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Body is not valid JSON.
pub const PARSE_ERROR: i64 = -32700;
/// Request shape violates the envelope (also: missing session id on GET/DELETE).
pub const MALFORMED_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
/// Session id unknown or already closed; the client must initialize again.
pub const SESSION_NOT_FOUND: i64 = -32000;
/// A standing stream is already attached to the session.
pub const SESSION_STREAM_CONFLICT: i64 = -32002;

/// Request identifier. MCP forbids `null` ids on requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorObject {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Outgoing response. `id` serializes as `null` when the request id could
/// not be recovered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub jsonrpc: &'static str,
    pub id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl Response {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<RequestId>, error: ErrorObject) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// One classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request {
        id: RequestId,
        method: String,
        params: Option<Value>,
    },
    Notification {
        method: String,
        params: Option<Value>,
    },
    /// A reply from the client to a server-initiated request. Accepted and dropped.
    Response,
}

impl Message {
    /// Classify a single JSON value. On failure the returned response echoes
    /// the request id when one could be read.
    pub fn parse(value: &Value) -> Result<Message, Response> {
        let obj = value.as_object().ok_or_else(|| {
            Response::failure(
                None,
                ErrorObject::new(MALFORMED_REQUEST, "message must be a JSON object"),
            )
        })?;

        let id = match obj.get("id") {
            None | Some(Value::Null) => None,
            Some(raw) => Some(serde_json::from_value::<RequestId>(raw.clone()).map_err(|_| {
                Response::failure(
                    None,
                    ErrorObject::new(MALFORMED_REQUEST, "id must be a string or integer"),
                )
            })?),
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(Response::failure(
                id,
                ErrorObject::new(MALFORMED_REQUEST, "jsonrpc must be \"2.0\""),
            ));
        }

        match obj.get("method") {
            Some(Value::String(method)) => {
                let params = obj.get("params").cloned();
                Ok(match id {
                    Some(id) => Message::Request {
                        id,
                        method: method.clone(),
                        params,
                    },
                    None => Message::Notification {
                        method: method.clone(),
                        params,
                    },
                })
            }
            Some(_) => Err(Response::failure(
                id,
                ErrorObject::new(MALFORMED_REQUEST, "method must be a string"),
            )),
            None if obj.contains_key("result") || obj.contains_key("error") => {
                Ok(Message::Response)
            }
            None => Err(Response::failure(
                id,
                ErrorObject::new(MALFORMED_REQUEST, "missing method"),
            )),
        }
    }
}

/// A POST body: one message or a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Single(Value),
    Batch(Vec<Value>),
}

impl Payload {
    /// Split a body into messages. Scalars and empty batches are rejected.
    pub fn from_body(body: Value) -> Result<Payload, ErrorObject> {
        match body {
            Value::Array(items) if items.is_empty() => Err(ErrorObject::new(
                MALFORMED_REQUEST,
                "batch must contain at least one message",
            )),
            Value::Array(items) => Ok(Payload::Batch(items)),
            obj @ Value::Object(_) => Ok(Payload::Single(obj)),
            _ => Err(ErrorObject::new(
                MALFORMED_REQUEST,
                "body must be a JSON-RPC object or batch array",
            )),
        }
    }
}

/// True if `value` is an `initialize` request (not a notification).
pub fn is_initialize_request(value: &Value) -> bool {
    value.get("jsonrpc").and_then(Value::as_str) == Some(JSONRPC_VERSION)
        && value.get("method").and_then(Value::as_str) == Some("initialize")
        && value.get("id").is_some_and(|id| !id.is_null())
}

/// True if the body opens a conversation: an initialize request on its own,
/// or a batch where any item is one.
pub fn contains_initialize(body: &Value) -> bool {
    match body {
        Value::Array(items) => items.iter().any(is_initialize_request),
        other => is_initialize_request(other),
    }
}

/// Transport-level error envelope: `{"jsonrpc":"2.0","error":{..},"id":null}`.
pub fn error_envelope(code: i64, message: impl Into<String>) -> Value {
    Response::failure(None, ErrorObject::new(code, message)).into_value()
}
