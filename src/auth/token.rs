//! Signed token authenticator
//!
//! Users come from configuration with bcrypt password hashes. Tokens are
//! HS256 JWTs carrying the email and an expiry, so any instance holding the
//! same secret accepts them and a restart logs nobody out.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use super::{AccessToken, AuthError, AuthResult, AuthService, Principal, UserAccount};

/// JWT payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User email
    pub sub: String,
    /// Issued at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds
    pub exp: i64,
}

/// Bearer-token authenticator backed by a fixed user list
pub struct TokenAuthenticator {
    users: HashMap<String, String>,
    ttl: Duration,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenAuthenticator {
    pub fn new(users: Vec<UserAccount>, secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            users: users
                .into_iter()
                .map(|u| (u.email, u.password_hash))
                .collect(),
            ttl,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Sign a token for `email` expiring `ttl` from now
    fn issue(&self, email: &str) -> AuthResult<AccessToken> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: email.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        Ok(AccessToken {
            token,
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or(expires_at),
        })
    }
}

/// Check a password against a bcrypt hash off the async workers
async fn verify_password(password: &str, hash: &str) -> AuthResult<bool> {
    let password = password.to_string();
    let hash = hash.to_string();

    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))?;

    match outcome {
        Ok(matched) => Ok(matched),
        Err(e) => {
            warn!(error = %e, "Stored password is not a bcrypt hash");
            Ok(false)
        }
    }
}

#[async_trait]
impl AuthService for TokenAuthenticator {
    async fn login(&self, email: &str, password: &str) -> AuthResult<AccessToken> {
        let valid = match self.users.get(email) {
            Some(hash) => verify_password(password, hash).await?,
            None => {
                // Unknown email: same bcrypt work as a wrong password.
                if let Some(hash) = self.users.values().next() {
                    verify_password(password, hash).await?;
                }
                false
            }
        };

        if !valid {
            warn!("Login failed");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.issue(email)?;
        debug!(email, expires_at = %token.expires_at, "Issued access token");
        Ok(token)
    }

    async fn verify(&self, token: &str) -> AuthResult<Principal> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken,
            })?;

        // Tokens for users removed from the config stop working.
        if !self.users.contains_key(&data.claims.sub) {
            return Err(AuthError::InvalidToken);
        }

        Ok(Principal {
            email: data.claims.sub,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hash_password;

    const SECRET: &[u8] = b"test-signing-secret";

    fn users() -> Vec<UserAccount> {
        vec![UserAccount::new(
            "ops@example.com",
            hash_password("hunter2", 4).unwrap(),
        )]
    }

    fn authenticator(ttl: Duration) -> TokenAuthenticator {
        TokenAuthenticator::new(users(), SECRET, ttl)
    }

    #[tokio::test]
    async fn test_login_and_verify() {
        let auth = authenticator(Duration::hours(1));

        let token = auth.login("ops@example.com", "hunter2").await.unwrap();
        assert!(token.expires_at > Utc::now());
        assert_eq!(token.token.split('.').count(), 3);

        let principal = auth.verify(&token.token).await.unwrap();
        assert_eq!(principal.email, "ops@example.com");
    }

    #[tokio::test]
    async fn test_token_survives_new_instance() {
        let first = authenticator(Duration::hours(1));
        let token = first.login("ops@example.com", "hunter2").await.unwrap();
        drop(first);

        let second = authenticator(Duration::hours(1));
        let principal = second.verify(&token.token).await.unwrap();
        assert_eq!(principal.email, "ops@example.com");
    }

    #[tokio::test]
    async fn test_other_secret_rejected() {
        let auth = authenticator(Duration::hours(1));
        let token = auth.login("ops@example.com", "hunter2").await.unwrap();

        let other = TokenAuthenticator::new(users(), b"another-secret", Duration::hours(1));
        assert_eq!(other.verify(&token.token).await, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_tampered_token_rejected() {
        let auth = authenticator(Duration::hours(1));
        let token = auth.login("ops@example.com", "hunter2").await.unwrap().token;

        // Swap the payload for one naming another user, keep the signature.
        let parts: Vec<&str> = token.split('.').collect();
        let forged_claims = Claims {
            sub: "intruder@example.com".into(),
            iat: 0,
            exp: Utc::now().timestamp() + 3600,
        };
        let forged = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &forged_claims,
            &EncodingKey::from_secret(b"guessed"),
        )
        .unwrap();
        let forged_payload = forged.split('.').nth(1).unwrap();
        let tampered = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert_eq!(auth.verify(&tampered).await, Err(AuthError::InvalidToken));

        let mut truncated = token.clone();
        truncated.pop();
        assert_eq!(auth.verify(&truncated).await, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_login_failures_are_identical() {
        let auth = authenticator(Duration::hours(1));

        let wrong_password = auth.login("ops@example.com", "hunter3").await.unwrap_err();
        let unknown_user = auth.login("nobody@example.com", "hunter2").await.unwrap_err();
        assert_eq!(wrong_password, AuthError::InvalidCredentials);
        assert_eq!(wrong_password, unknown_user);
    }

    #[tokio::test]
    async fn test_plaintext_password_in_config_never_matches() {
        let auth = TokenAuthenticator::new(
            vec![UserAccount::new("ops@example.com", "hunter2")],
            SECRET,
            Duration::hours(1),
        );
        assert_eq!(
            auth.login("ops@example.com", "hunter2").await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn test_no_users_configured() {
        let auth = TokenAuthenticator::new(Vec::new(), SECRET, Duration::hours(1));
        assert_eq!(
            auth.login("ops@example.com", "hunter2").await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn test_verify_rejects_garbage() {
        let auth = authenticator(Duration::hours(1));
        assert_eq!(auth.verify("not-a-token").await, Err(AuthError::InvalidToken));
        assert_eq!(auth.verify("").await, Err(AuthError::MissingToken));
    }

    #[tokio::test]
    async fn test_expired_token() {
        let auth = authenticator(Duration::hours(-1));

        let token = auth.login("ops@example.com", "hunter2").await.unwrap();
        assert_eq!(auth.verify(&token.token).await, Err(AuthError::Expired));
    }

    #[tokio::test]
    async fn test_removed_user_token_rejected() {
        let auth = authenticator(Duration::hours(1));
        let token = auth.login("ops@example.com", "hunter2").await.unwrap();

        let without_user = TokenAuthenticator::new(Vec::new(), SECRET, Duration::hours(1));
        assert_eq!(
            without_user.verify(&token.token).await,
            Err(AuthError::InvalidToken)
        );
    }
}
