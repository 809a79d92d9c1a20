//! Search Routes
//!
//! - POST /api/sensors/search - Filter, sort and aggregate readings
//!
//! The body is a JSON object with optional `filters`, `sort` and `aggregate`
//! clauses. An empty body searches everything.

use axum::{body::Bytes, extract::State, Json};
use serde_json::Value;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult, INVALID_JSON_MESSAGE};
use crate::api::state::AppState;
use crate::query::QueryOutcome;

/// POST /api/sensors/search
///
/// Returns an array of readings, or `{"_<op>": {"<column>": value}}` when an
/// aggregate is requested.
pub async fn search_readings(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<QueryOutcome>> {
    let request = parse_body(&body)?;
    let outcome = state.executor.execute_json(&request).await?;
    Ok(Json(outcome))
}

fn parse_body(body: &[u8]) -> ApiResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(body).map_err(|_| ApiError::Payload(INVALID_JSON_MESSAGE))
}
