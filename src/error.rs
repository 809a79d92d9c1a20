//! Error classification shared by the ingestion and query paths
//!
//! Every module error maps onto one of these classes, which decides the HTTP
//! status and how much detail reaches the client.

use serde::Serialize;

/// Coarse error class for a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Missing or invalid credentials/token
    Auth,
    /// Empty or undecodable body
    Payload,
    /// Well-formed body that does not fit the reading schema
    SchemaValidation,
    /// Store-level failure
    Execution,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auth => write!(f, "auth"),
            Self::Payload => write!(f, "payload"),
            Self::SchemaValidation => write!(f, "schema_validation"),
            Self::Execution => write!(f, "execution"),
        }
    }
}
