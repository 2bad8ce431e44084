//! Streamable HTTP endpoint: POST for requests, GET for the standing
//! stream, DELETE to end a session.

use std::sync::Arc;

use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use payments_mcp::jsonrpc::contains_initialize;
use payments_mcp::HandlerFactory;
use serde_json::Value;

use crate::error::TransportError;
use crate::metrics::REQUESTS_TOTAL;
use crate::registry::CloseOutcome;
use crate::state::AppState;
use crate::stream::EventStream;

pub const SESSION_HEADER: &str = "mcp-session-id";

/// Session id from the request header, if present and non-empty.
fn session_id(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn record<T>(method: &str, result: &Result<T, TransportError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    REQUESTS_TOTAL.with_label_values(&[method, outcome]).inc();
}

/// POST /mcp
pub async fn post_mcp<F: HandlerFactory>(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState<F>>,
) -> Result<HttpResponse, TransportError> {
    let result = handle_post(&req, &body, &state).await;
    record("POST", &result);
    result
}

async fn handle_post<F: HandlerFactory>(
    req: &HttpRequest,
    body: &[u8],
    state: &AppState<F>,
) -> Result<HttpResponse, TransportError> {
    let payload: Value =
        serde_json::from_slice(body).map_err(|e| TransportError::Parse(e.to_string()))?;
    let sid = session_id(req);
    if state.config.debug {
        tracing::info!(
            session_id = ?sid,
            resolves = sid.as_deref().is_some_and(|id| state.router.registry().contains(id)),
            batch = payload.is_array(),
            opens = contains_initialize(&payload),
            "POST /mcp"
        );
    }

    let outcome = state.router.post(sid.as_deref(), payload).await?;

    let mut response = match outcome.body {
        Some(_) => HttpResponse::Ok(),
        None => HttpResponse::Accepted(),
    };
    response.insert_header((SESSION_HEADER, outcome.session_id.as_str()));
    Ok(match outcome.body {
        Some(body) => response.json(body),
        None => response.finish(),
    })
}

/// GET /mcp - attach the standing SSE stream
pub async fn get_mcp<F: HandlerFactory>(
    req: HttpRequest,
    state: web::Data<AppState<F>>,
) -> Result<HttpResponse, TransportError> {
    let result = state
        .router
        .stream(session_id(&req).as_deref())
        .map(|(id, messages)| {
            let events = EventStream::new(
                messages,
                Arc::clone(&state.router),
                id.clone(),
                state.config.sse_keepalive,
            );
            HttpResponse::Ok()
                .content_type("text/event-stream")
                .insert_header((header::CACHE_CONTROL, "no-cache"))
                .insert_header((SESSION_HEADER, id))
                .streaming(events)
        });
    record("GET", &result);
    result
}

/// DELETE /mcp - close the session
pub async fn delete_mcp<F: HandlerFactory>(
    req: HttpRequest,
    state: web::Data<AppState<F>>,
) -> Result<HttpResponse, TransportError> {
    let sid = session_id(&req);
    let result = state.router.close(sid.as_deref()).await.map(|outcome| {
        HttpResponse::Ok().json(serde_json::json!({
            "closed": true,
            "alreadyClosed": outcome == CloseOutcome::AlreadyClosed,
        }))
    });
    record("DELETE", &result);
    result
}

pub fn configure<F: HandlerFactory>(cfg: &mut web::ServiceConfig) {
    cfg.route("/mcp", web::post().to(post_mcp::<F>))
        .route("/mcp", web::get().to(get_mcp::<F>))
        .route("/mcp", web::delete().to(delete_mcp::<F>));
}
