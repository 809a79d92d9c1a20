//! Weatherlog REST API
//!
//! HTTP API layer for weatherlog, built with Axum.
//!
//! # Endpoints
//!
//! ## Auth
//! - `POST /api/login` - Exchange credentials for an access token
//!
//! ## Sensors (bearer token required)
//! - `POST /api/sensors/upload` - Upload a CSV batch of readings
//! - `POST /api/sensors/search` - Filter, sort and aggregate readings
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use weatherlog::api::{serve, ApiConfig, AppState};
//! use weatherlog::auth::TokenAuthenticator;
//! use weatherlog::storage::StorageEngine;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(StorageEngine::open("./weather.db")?);
//!     let auth = Arc::new(TokenAuthenticator::new(users, b"secret", chrono::Duration::hours(1)));
//!     let config = ApiConfig::default();
//!
//!     let state = AppState::new(store, auth, config.clone());
//!     serve(state, &config).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    let sensor_routes = Router::new()
        .route("/upload", post(routes::upload::upload_readings))
        .route("/search", post(routes::search::search_readings))
        .route_layer(from_fn_with_state(
            Arc::clone(&shared_state),
            middleware::require_auth,
        ));

    let api_routes = Router::new()
        .route("/login", post(routes::auth::login))
        .nest("/sensors", sensor_routes);

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let max_body_size = shared_state.config.max_body_size;
    let timeout = Duration::from_secs(shared_state.config.request_timeout_secs);

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health_routes)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Weatherlog API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Weatherlog API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
