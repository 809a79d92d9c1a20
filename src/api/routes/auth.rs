//! Auth Routes
//!
//! - POST /api/login - Exchange email and password for an access token

use axum::{body::Bytes, extract::State, Json};
use std::sync::Arc;

use crate::api::dto::{LoginRequest, LoginResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

/// POST /api/login
///
/// An unreadable body, a missing field, an unknown email and a wrong
/// password all get the same 403.
pub async fn login(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult<Json<LoginResponse>> {
    let req: LoginRequest = serde_json::from_slice(&body).unwrap_or_default();

    let (email, password) = match (req.email, req.password) {
        (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
            (email, password)
        }
        _ => return Err(ApiError::InvalidCredentials),
    };

    let token = state.auth.login(&email, &password).await?;
    tracing::info!(email = %email, "User logged in");

    Ok(Json(LoginResponse {
        access_token: token.token,
        expires_at: token.expires_at,
    }))
}
