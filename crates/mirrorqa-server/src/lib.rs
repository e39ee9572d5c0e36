//! HTTP API for the mirrors-qa control plane.
//!
//! Wraps [`mirrorqa_db::Registry`] and [`mirrorqa_auth::JwtManager`] in an
//! axum router implementing the worker handshake, Test lifecycle and
//! health-check endpoints.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::Router;
use mirrorqa_db::{init_database, Pool, Registry};
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::{info, warn};
use utoipa::OpenApi;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use state::AppState;

/// Connects to the registry store, runs pending migrations, and builds the
/// router ready to be served.
pub async fn init_server(config: ServerConfig) -> ServerResult<Router> {
    info!("connecting to registry store");
    let pool = Pool::from_url(&config.database_url).await?;
    init_database(&pool).await?;

    let registry = Registry::new(pool);
    let state = AppState::new(registry, config)?;

    Ok(build_router(state))
}

fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .merge(routes::api_routes())
        .merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", routes::ApiDoc::openapi()),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(cors)
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
}

/// Binds and serves the API, running until the process receives a shutdown signal.
pub async fn serve(config: ServerConfig) -> ServerResult<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Internal(format!("invalid host/port: {e}")))?;

    let app = init_server(config).await?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ServerError::Internal(format!("failed to bind to {addr}: {e}")))?;

    info!("listening on http://{addr}");
    info!("API documentation available at http://{addr}/swagger-ui");

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Internal(format!("server error: {e}")))?;

    warn!("server stopped");
    Ok(())
}
