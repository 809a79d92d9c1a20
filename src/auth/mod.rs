//! Authentication
//!
//! Login exchanges an email/password pair for a signed bearer token; every
//! sensor endpoint then verifies that token before any decoding or parsing
//! happens.
//!
//! The HTTP layer only sees the [`AuthService`] trait, so the in-process
//! [`TokenAuthenticator`] can be swapped for an external identity service.

mod token;

pub use token::{Claims, TokenAuthenticator};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by the auth service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown user or wrong password; the two are never distinguished
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("Missing access token")]
    MissingToken,

    #[error("Invalid access token")]
    InvalidToken,

    #[error("Access token expired")]
    Expired,

    /// Hashing or signing failed
    #[error("Auth internal error: {0}")]
    Internal(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// A configured user
///
/// `password_hash` is a bcrypt hash (`$2b$...`); a plaintext value never
/// matches.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct UserAccount {
    pub email: String,
    pub password_hash: String,
}

impl UserAccount {
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password_hash: password_hash.into(),
        }
    }
}

/// Token handed out at login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub email: String,
}

/// Issues and verifies access tokens
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Exchange credentials for a token
    async fn login(&self, email: &str, password: &str) -> AuthResult<AccessToken>;

    /// Resolve a token to the principal it was issued to
    async fn verify(&self, token: &str) -> AuthResult<Principal>;
}

/// Hash a password for the `[[auth.users]]` table
pub fn hash_password(password: &str, cost: u32) -> AuthResult<String> {
    bcrypt::hash(password, cost).map_err(|e| AuthError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password() {
        let hash = hash_password("hunter2", 4).unwrap();
        assert!(hash.starts_with("$2"));
        assert!(bcrypt::verify("hunter2", &hash).unwrap());
        assert!(!bcrypt::verify("hunter3", &hash).unwrap());

        let err = hash_password("hunter2", 1).unwrap_err();
        assert!(matches!(err, AuthError::Internal(_)));
    }
}
