//! # Weatherlog
//!
//! Weather sensor reading store. Sensors upload batches of readings as CSV;
//! clients search them with a small declarative JSON language.
//!
//! ## Modules
//!
//! - [`storage`]: Reading schema and the SQLite-backed reading store
//! - [`ingest`]: CSV decoding, normalization and atomic batch ingestion
//! - [`query`]: Search document parser, plan and executor
//! - [`auth`]: Login and bearer token verification
//! - [`api`]: REST API server with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use weatherlog::ingest::Ingestor;
//! use weatherlog::query::QueryExecutor;
//! use weatherlog::storage::{ReadingStore, StorageEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store: Arc<dyn ReadingStore> = Arc::new(StorageEngine::open_in_memory()?);
//!
//!     let ingestor = Ingestor::new(Arc::clone(&store), 1_000);
//!     ingestor
//!         .ingest_csv("timestamp,temperature,rainfall,humidity,wind_speed,visibility\n\
//!                      1000,12.5,0.0,80,4.2,G\n")
//!         .await?;
//!
//!     let executor = QueryExecutor::new(store);
//!     let outcome = executor
//!         .execute_str(
//!             r#"{"filters": {"temperature": {"gte": 10}}, "sort": {"column": "timestamp"}}"#,
//!         )
//!         .await?;
//!
//!     println!("Found {} readings", outcome.len());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod query;
pub mod storage;

// Re-export top-level types for convenience
pub use storage::{
    Column, ColumnValue, Reading, ReadingStore, StorageEngine, StorageError, StorageResult,
    Visibility,
};

pub use ingest::{IngestError, IngestSummary, Ingestor};

pub use query::{
    parse_query_spec, parse_query_str, QueryError, QueryExecutor, QueryOutcome, QuerySpec,
};

pub use auth::{AuthError, AuthService, TokenAuthenticator, UserAccount};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use config::{ApiConfig as ConfigApiConfig, Config, ConfigError, LoggingConfig};

pub use error::ErrorClass;
