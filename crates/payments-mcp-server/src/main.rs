use std::sync::Arc;
use std::time::Duration;

use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use payments_mcp::{HandlerFactory, PaymentsHandlerFactory, ProviderConfig, ToolRegistry};
use payments_mcp_server::{
    config::{ConfigError, ServerConfig},
    metrics::register_metrics,
    routes,
    state::AppState,
    stdio,
};

/// Upper bound on how often expired tombstones are swept.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        // stdout carries protocol messages in stdio mode
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let providers = match ProviderConfig::from_env() {
        Ok(providers) => providers,
        Err(e) => {
            tracing::error!("Invalid provider configuration: {e}");
            std::process::exit(1);
        }
    };

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(ConfigError::MissingRequired("MCP_HTTP_PORT")) => return serve_stdio(providers).await,
        Err(e) => {
            tracing::error!("Invalid server configuration: {e}");
            std::process::exit(1);
        }
    };

    let port = config.port;
    let allowed_origins = config.allowed_origins.clone();
    let max_body_bytes = config.max_body_bytes;
    let tombstone_ttl = Duration::from_secs(config.tombstone_ttl_secs);

    tracing::info!(
        "Starting {} v{} on port {}",
        payments_mcp::SERVER_NAME,
        payments_mcp::SERVER_VERSION,
        port
    );
    tracing::debug!(?config, ?providers, "configuration loaded");

    let tools = ToolRegistry::new(providers).map_err(std::io::Error::other)?;
    tracing::info!("{} tools registered", tools.definitions().len());

    register_metrics();

    let state = AppState::new(config, PaymentsHandlerFactory::new(Arc::new(tools)));
    let router = Arc::clone(&state.router);
    let state_data = web::Data::new(state);

    // Forget closed session ids once they can no longer matter
    let sweeper = Arc::clone(&router);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(tombstone_ttl.min(PURGE_INTERVAL));
        loop {
            tick.tick().await;
            let purged = sweeper.registry().purge_tombstones(tombstone_ttl);
            if purged > 0 {
                tracing::debug!("Purged {purged} session tombstones");
            }
        }
    });

    let governor_conf = GovernorConfigBuilder::default()
        .requests_per_minute(state_data.config.rate_limit_rpm as u64)
        .finish()
        .ok_or_else(|| std::io::Error::other("invalid rate limiter config"))?;

    HttpServer::new(move || {
        let cors = payments_mcp_server::cors::build_cors(&allowed_origins);

        App::new()
            .app_data(state_data.clone())
            .app_data(web::PayloadConfig::new(max_body_bytes))
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Governor::new(&governor_conf))
            .configure(routes::configure::<PaymentsHandlerFactory>)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await?;

    let closed = router.shutdown().await;
    tracing::info!("Shut down, closed {closed} open sessions");
    Ok(())
}

/// One session over stdin/stdout, used when no HTTP port is configured.
async fn serve_stdio(providers: ProviderConfig) -> std::io::Result<()> {
    let tools = ToolRegistry::new(providers).map_err(std::io::Error::other)?;
    tracing::info!(
        "Starting {} v{} on stdio with {} tools",
        payments_mcp::SERVER_NAME,
        payments_mcp::SERVER_VERSION,
        tools.definitions().len()
    );

    let server = PaymentsHandlerFactory::new(Arc::new(tools)).create("stdio");
    stdio::serve(&server, tokio::io::stdin(), tokio::io::stdout()).await?;
    tracing::info!("stdin closed, shutting down");
    Ok(())
}
