pub mod health;
pub mod mcp;

use actix_web::web;
use payments_mcp::HandlerFactory;

/// Mount every route. Expects `web::Data<AppState<F>>` in app data.
pub fn configure<F: HandlerFactory>(cfg: &mut web::ServiceConfig) {
    health::configure::<F>(cfg);
    mcp::configure::<F>(cfg);
}
