// src/handlers/health.rs

use axum::{Json, response::IntoResponse};

/// Liveness probe. Unauthenticated.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
