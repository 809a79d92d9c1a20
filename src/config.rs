//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `WEATHERLOG_*` environment variable
//! overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::auth::UserAccount;

/// Prefix for every environment override
pub const ENV_PREFIX: &str = "WEATHERLOG_";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Reading store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("weatherlog").join("readings.db").to_string_lossy().to_string())
        .unwrap_or_else(|| "./weatherlog_data/readings.db".to_string())
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_body_size() -> usize {
    16 * 1024 * 1024 // 16 MB
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_size: default_max_body_size(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    /// Server settings for the HTTP layer
    pub fn to_server_config(&self) -> crate::api::ApiConfig {
        crate::api::ApiConfig {
            host: self.host.clone(),
            port: self.port,
            request_timeout_secs: self.request_timeout_secs,
            max_body_size: self.max_body_size,
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret for access tokens
    #[serde(default)]
    pub jwt_secret: Option<String>,

    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: i64,

    /// Users with bcrypt password hashes
    #[serde(default)]
    pub users: Vec<UserAccount>,
}

fn default_token_ttl() -> i64 {
    3600
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_secs: default_token_ttl(),
            users: Vec::new(),
        }
    }
}

impl AuthConfig {
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_ttl_secs)
    }

    /// Configured signing secret, `None` when unset or blank
    pub fn signing_secret(&self) -> Option<&str> {
        self.jwt_secret.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// Ingestion configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_max_batch_rows")]
    pub max_batch_rows: usize,
}

fn default_max_batch_rows() -> usize {
    crate::api::state::DEFAULT_MAX_BATCH_ROWS
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_batch_rows: default_max_batch_rows(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("weatherlog").join("config.toml")),
            Some(PathBuf::from("/etc/weatherlog/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        // Fall back to environment-only config
        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply `WEATHERLOG_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok());
    }

    /// Apply overrides from a lookup keyed by the unprefixed variable name
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Storage overrides
        if let Some(path) = lookup("DATABASE_PATH") {
            self.storage.database_path = path;
        }

        // API overrides
        if let Some(host) = lookup("API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = lookup("API_PORT").and_then(|p| p.parse().ok()) {
            self.api.port = port;
        }

        // Auth overrides
        if let Some(ttl) = lookup("TOKEN_TTL_SECS").and_then(|t| t.parse().ok()) {
            self.auth.token_ttl_secs = ttl;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }
        if let (Some(email), Some(hash)) = (lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD_HASH")) {
            self.auth.users.retain(|u| u.email != email);
            self.auth.users.push(UserAccount::new(email, hash));
        }

        // Ingest overrides
        if let Some(max) = lookup("MAX_BATCH_ROWS").and_then(|m| m.parse().ok()) {
            self.ingest.max_batch_rows = max;
        }

        // Logging overrides
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Weatherlog Configuration
#
# Environment variables override these settings:
# - WEATHERLOG_DATABASE_PATH
# - WEATHERLOG_API_HOST
# - WEATHERLOG_API_PORT
# - WEATHERLOG_JWT_SECRET
# - WEATHERLOG_TOKEN_TTL_SECS
# - WEATHERLOG_ADMIN_EMAIL + WEATHERLOG_ADMIN_PASSWORD_HASH (adds a user)
# - WEATHERLOG_MAX_BATCH_ROWS
# - WEATHERLOG_LOG_LEVEL
# - WEATHERLOG_LOG_FORMAT

[storage]
# SQLite database file (parent directories are created, no ~ expansion)
database_path = "./weatherlog_data/readings.db"

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 3000

# Maximum request body size (bytes)
max_body_size = 16777216

# Request timeout in seconds
request_timeout_secs = 30

[auth]
# HS256 secret for signing access tokens. When unset a random secret is
# generated at startup and tokens do not survive a restart.
# jwt_secret = "change-me-to-a-long-random-string"

# Access token lifetime in seconds
token_ttl_secs = 3600

# Users allowed to log in. Hash passwords with:
#   weatherlog-cli hash-password <password>
# [[auth.users]]
# email = "ops@example.com"
# password_hash = "$2b$12$..."

[ingest]
# Maximum data rows per uploaded CSV
max_batch_rows = 100000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.port, 3000);
        assert_eq!(config.auth.token_ttl_secs, 3600);
        assert_eq!(config.ingest.max_batch_rows, 100_000);
        assert_eq!(config.logging.format, "pretty");
        assert!(config.auth.users.is_empty());
    }

    #[test]
    fn test_generated_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.api.port, 3000);
        assert_eq!(config.ingest.max_batch_rows, 100_000);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.auth.signing_secret(), None);
    }

    #[test]
    fn test_generated_database_path_needs_no_expansion() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        let path = &config.storage.database_path;
        assert!(!path.contains('~'), "{path}");
        assert!(!path.contains('$'), "{path}");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[storage]
database_path = "/tmp/weather.db"

[api]
port = 9090

[auth]
jwt_secret = "s3cret-signing-key"

[[auth.users]]
email = "ops@example.com"
password_hash = "$2b$04$abcdefghijklmnopqrstuu0123456789012345678901234567890"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.storage.database_path, "/tmp/weather.db");
        assert_eq!(config.api.port, 9090);
        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(config.auth.users.len(), 1);
        assert_eq!(config.auth.users[0].email, "ops@example.com");
        assert!(config.auth.users[0].password_hash.starts_with("$2b$"));
        assert_eq!(config.auth.signing_secret(), Some("s3cret-signing-key"));
    }

    #[test]
    fn test_plaintext_password_key_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[[auth.users]]\nemail = \"ops@example.com\"\npassword = \"hunter2\""
        )
        .unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_blank_secret_is_unset() {
        let mut config = Config::default();
        config.auth.jwt_secret = Some("  ".into());
        assert_eq!(config.auth.signing_secret(), None);
    }

    #[test]
    fn test_load_errors() {
        let err = Config::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api]\nport = \"not a number\"").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("DATABASE_PATH", "/data/w.db"),
            ("API_PORT", "8443"),
            ("ADMIN_EMAIL", "admin@example.com"),
            ("ADMIN_PASSWORD_HASH", "$2b$04$hash"),
            ("JWT_SECRET", "env-secret"),
            ("MAX_BATCH_ROWS", "500"),
            ("LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.storage.database_path, "/data/w.db");
        assert_eq!(config.api.port, 8443);
        assert_eq!(config.ingest.max_batch_rows, 500);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.auth.signing_secret(), Some("env-secret"));
        assert_eq!(
            config.auth.users,
            vec![UserAccount::new("admin@example.com", "$2b$04$hash")]
        );
    }

    #[test]
    fn test_invalid_numeric_override_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| (key == "API_PORT").then(|| "eighty".to_string()));
        assert_eq!(config.api.port, 3000);
    }
}
