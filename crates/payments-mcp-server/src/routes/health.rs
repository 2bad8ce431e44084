use actix_web::{web, HttpRequest, HttpResponse};
use payments_mcp::security::constant_time_eq;
use payments_mcp::HandlerFactory;
use prometheus::Encoder;

use crate::metrics::REGISTRY;
use crate::state::AppState;

/// GET /health - liveness, independent of any session
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "ok": true }))
}

/// GET /metrics - Prometheus metrics endpoint (optionally auth-gated)
pub async fn metrics<F: HandlerFactory>(
    req: HttpRequest,
    state: web::Data<AppState<F>>,
) -> HttpResponse {
    if let Some(ref expected_token) = state.config.metrics_token {
        let authorized = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|token| constant_time_eq(token.as_bytes(), expected_token.as_bytes()))
            .unwrap_or(false);

        if !authorized {
            return HttpResponse::Unauthorized().json(serde_json::json!({
                "error": "unauthorized",
                "message": "Valid Bearer token required for /metrics"
            }));
        }
    }

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return HttpResponse::InternalServerError().body("Failed to encode metrics");
    }

    let output = String::from_utf8(buffer).unwrap_or_default();
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(output)
}

pub fn configure<F: HandlerFactory>(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics::<F>));
}
