//! Upload Routes
//!
//! - POST /api/sensors/upload - Store a CSV batch of readings

use axum::{body::Bytes, extract::State, Extension, Json};
use std::sync::Arc;

use crate::api::dto::UploadResponse;
use crate::api::error::{ApiError, ApiResult, INVALID_CSV_MESSAGE};
use crate::api::state::AppState;
use crate::auth::Principal;

/// POST /api/sensors/upload
///
/// The body is raw CSV text. The first line is a header and is skipped; the
/// columns are `timestamp, temperature, rainfall, humidity, wind_speed,
/// visibility` in that order.
pub async fn upload_readings(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    body: Bytes,
) -> ApiResult<Json<UploadResponse>> {
    let text = std::str::from_utf8(&body).map_err(|_| ApiError::Payload(INVALID_CSV_MESSAGE))?;

    let summary = state.ingestor.ingest_csv(text).await?;
    tracing::info!(
        email = %principal.email,
        accepted = summary.accepted,
        "Sensor readings uploaded"
    );

    Ok(Json(UploadResponse::success(summary.accepted)))
}
