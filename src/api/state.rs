//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use crate::auth::AuthService;
use crate::ingest::Ingestor;
use crate::query::QueryExecutor;
use crate::storage::ReadingStore;
use std::sync::Arc;
use std::time::Instant;

/// Default cap on data rows per upload
pub const DEFAULT_MAX_BATCH_ROWS: usize = 100_000;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Reading store shared by the ingestor and the executor
    pub store: Arc<dyn ReadingStore>,
    /// CSV ingestion pipeline
    pub ingestor: Arc<Ingestor>,
    /// Search executor
    pub executor: Arc<QueryExecutor>,
    /// Token issuer and verifier
    pub auth: Arc<dyn AuthService>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Wire the ingestor and executor around one store
    pub fn new(store: Arc<dyn ReadingStore>, auth: Arc<dyn AuthService>, config: ApiConfig) -> Self {
        Self {
            ingestor: Arc::new(Ingestor::new(Arc::clone(&store), DEFAULT_MAX_BATCH_ROWS)),
            executor: Arc::new(QueryExecutor::new(Arc::clone(&store))),
            store,
            auth,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Replace the upload row limit
    pub fn with_max_batch_rows(mut self, max_batch_rows: usize) -> Self {
        self.ingestor = Arc::new(Ingestor::new(Arc::clone(&self.store), max_batch_rows));
        self
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            request_timeout_secs: 30,
            max_body_size: 16 * 1024 * 1024, // 16MB
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
