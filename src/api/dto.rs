//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.
//!
//! Search responses are not listed here; they are `QueryOutcome` values
//! serialized directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// AUTH DTOs
// ============================================

/// Login request
///
/// Both fields are optional so a missing field gets the same answer as a
/// wrong password.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Bearer token for the sensor endpoints
    pub access_token: String,
    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
}

// ============================================
// UPLOAD DTOs
// ============================================

/// Upload response
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Always "Success!"
    pub message: String,
    /// Number of readings stored
    pub accepted: usize,
}

impl UploadResponse {
    pub fn success(accepted: usize) -> Self {
        Self {
            message: "Success!".to_string(),
            accepted,
        }
    }
}

// ============================================
// COMMON DTOs
// ============================================

/// Plain message body, used for every error
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================
// HEALTH DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy" or "unhealthy"
    pub status: String,
    /// Store status: "ok" or "error"
    pub storage: String,
    /// Stored readings, when the store answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readings: Option<u64>,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Server version
    pub version: String,
}
