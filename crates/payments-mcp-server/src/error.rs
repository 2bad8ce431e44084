use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use payments_mcp::jsonrpc::{
    error_envelope, INTERNAL_ERROR, MALFORMED_REQUEST, PARSE_ERROR, SESSION_NOT_FOUND,
    SESSION_STREAM_CONFLICT,
};
use thiserror::Error;

/// Failures the transport resolves itself. Each maps to a JSON-RPC error
/// envelope with a stable code; none of them touch an existing session.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Body is not JSON
    #[error("parse error: {0}")]
    Parse(String),

    /// Envelope violation, e.g. GET/DELETE without a session id
    #[error("{0}")]
    MalformedRequest(&'static str),

    /// Session id unknown, closed, or missing on a continuation
    #[error("{0}")]
    SessionNotFound(&'static str),

    /// A standing stream is already attached to the session
    #[error("a stream is already open for this session")]
    StreamConflict,

    /// Generated id collided with a live or closed session
    #[error("duplicate session id: {0}")]
    DuplicateSession(String),
}

impl TransportError {
    pub fn code(&self) -> i64 {
        match self {
            TransportError::Parse(_) => PARSE_ERROR,
            TransportError::MalformedRequest(_) => MALFORMED_REQUEST,
            TransportError::SessionNotFound(_) => SESSION_NOT_FOUND,
            TransportError::StreamConflict => SESSION_STREAM_CONFLICT,
            TransportError::DuplicateSession(_) => INTERNAL_ERROR,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Parse(_) => "parse_error",
            TransportError::MalformedRequest(_) => "malformed_request",
            TransportError::SessionNotFound(_) => "session_not_found",
            TransportError::StreamConflict => "stream_conflict",
            TransportError::DuplicateSession(_) => "duplicate_session",
        }
    }
}

impl ResponseError for TransportError {
    fn status_code(&self) -> StatusCode {
        match self {
            TransportError::Parse(_) | TransportError::MalformedRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            TransportError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            TransportError::StreamConflict => StatusCode::CONFLICT,
            TransportError::DuplicateSession(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            TransportError::DuplicateSession(id) => {
                tracing::error!(session_id = %id, "session id collision on register");
                "Internal error".to_string()
            }
            TransportError::Parse(_) => "Parse error: body is not valid JSON".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(error_envelope(self.code(), message))
    }
}
