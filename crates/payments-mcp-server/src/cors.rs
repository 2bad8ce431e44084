//! CORS for browser-based MCP clients.

use actix_cors::Cors;
use actix_web::http::header::{self, HeaderName};

use crate::routes::mcp::SESSION_HEADER;

/// Build the CORS middleware from allowed origins. `*` admits any origin.
///
/// The session header is both accepted and exposed; without the latter a
/// browser client cannot read the id assigned on initialize.
pub fn build_cors(allowed_origins: &[String]) -> Cors {
    let allowed = allowed_origins.to_vec();
    Cors::default()
        .allowed_origin_fn(move |origin, _req_head| {
            let origin_str = origin.to_str().unwrap_or("");
            allowed.iter().any(|a| a == "*" || a == origin_str)
        })
        .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
            HeaderName::from_static(SESSION_HEADER),
            HeaderName::from_static("mcp-protocol-version"),
        ])
        .expose_headers(vec![HeaderName::from_static(SESSION_HEADER)])
        .max_age(3600)
}
