//! Weatherlog API Server
//!
//! Run with: cargo run --bin weatherlog -- --config config.toml
//!
//! # Configuration
//!
//! Settings come from the TOML file given with `--config`, or from the
//! default locations searched by [`Config::load_default`]. `WEATHERLOG_*`
//! environment variables (also read from a `.env` file) override both:
//! - `WEATHERLOG_DATABASE_PATH`: SQLite database file
//! - `WEATHERLOG_API_HOST` / `WEATHERLOG_API_PORT`: bind address
//! - `WEATHERLOG_JWT_SECRET`: token signing secret
//! - `WEATHERLOG_ADMIN_EMAIL` / `WEATHERLOG_ADMIN_PASSWORD_HASH`: adds a login
//! - `RUST_LOG`: overrides the configured log level

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use weatherlog::api::{serve, AppState};
use weatherlog::auth::TokenAuthenticator;
use weatherlog::config::{generate_default_config, Config};
use weatherlog::storage::StorageEngine;

#[derive(Parser)]
#[command(name = "weatherlog")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Weather sensor reading store and search API")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print a default config file and exit
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", generate_default_config());
        return Ok(());
    }

    dotenvy::dotenv().ok();

    let config = match &args.config {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load_default(),
    };

    weatherlog::logging::init(&config.logging);

    tracing::info!("Starting Weatherlog API server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Database: {}", config.storage.database_path);

    // Initialize reading store
    let store = Arc::new(
        StorageEngine::open(&config.storage.database_path)
            .with_context(|| format!("opening database {}", config.storage.database_path))?,
    );

    // Initialize authenticator
    if config.auth.users.is_empty() {
        tracing::warn!(
            "No users configured; set WEATHERLOG_ADMIN_EMAIL and WEATHERLOG_ADMIN_PASSWORD_HASH or add [[auth.users]]"
        );
    }
    let secret = match config.auth.signing_secret() {
        Some(secret) => secret.to_string(),
        None => {
            tracing::warn!("No jwt_secret configured; using a random one, tokens will not survive a restart");
            format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
        }
    };
    let auth = Arc::new(TokenAuthenticator::new(
        config.auth.users.clone(),
        secret.as_bytes(),
        config.auth.token_ttl(),
    ));
    tracing::info!(users = auth.user_count(), ttl_secs = config.auth.token_ttl_secs, "Authenticator ready");

    let api_config = config.api.to_server_config();
    let state = AppState::new(store, auth, api_config.clone())
        .with_max_batch_rows(config.ingest.max_batch_rows);

    // Run server
    tracing::info!("Starting server on {}:{}", api_config.host, api_config.port);
    serve(state, &api_config).await?;

    tracing::info!("Weatherlog API server stopped");
    Ok(())
}
