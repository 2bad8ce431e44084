use std::sync::Arc;

use payments_mcp::HandlerFactory;

use crate::config::ServerConfig;
use crate::router::SessionRouter;

/// Shared application state
pub struct AppState<F: HandlerFactory> {
    pub config: Arc<ServerConfig>,
    pub router: Arc<SessionRouter<F>>,
}

impl<F: HandlerFactory> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            router: Arc::clone(&self.router),
        }
    }
}

impl<F: HandlerFactory> AppState<F> {
    pub fn new(config: ServerConfig, factory: F) -> Self {
        let router = SessionRouter::new(factory).with_debug(config.debug);
        Self {
            config: Arc::new(config),
            router: Arc::new(router),
        }
    }
}
