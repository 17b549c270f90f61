use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::{JSend, JSendFail};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub session_cache_entries: usize,
    pub status: String,
    pub version: String,
}

/// Liveness check. Served outside the gate.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<JSend<HealthResponse>> {
    JSend::success(HealthResponse {
        session_cache_entries: state.gate.sessions().len(),
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Downstream used when no upstream application is configured
pub async fn not_found() -> (StatusCode, Json<JSendFail>) {
    JSendFail::not_found("Not found")
}
