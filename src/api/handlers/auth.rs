use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::cookies;
use crate::api::response::{ApiError, AppJson, JSend};
use crate::bootstrap::InitOutcome;
use crate::gate::AuthContext;
use crate::AppState;

use super::ActionResponse;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SetupRequest {
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SetupResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_password: Option<String>,
    pub redirect: String,
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn setup(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<SetupRequest>,
) -> Result<Json<JSend<SetupResponse>>, ApiError> {
    match state.actions.setup(req.password.as_deref())? {
        InitOutcome::AlreadyInitialized => Err(ApiError::conflict("System is already initialized")),
        InitOutcome::Initialized { generated_password } => Ok(JSend::success(SetupResponse {
            generated_password,
            redirect: state.config.gate.login_path.clone(),
            success: true,
        })),
    }
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = state.actions.login(&req.password)?;

    let cookie = cookies::session_cookie(
        &token,
        state.tokens.session_ttl(),
        state.config.auth.secure_cookies,
    );
    tracing::info!("Administrator logged in");

    Ok((
        [(header::SET_COOKIE, cookie)],
        JSend::success(ActionResponse::redirect("/")),
    ))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(_context): Extension<AuthContext>,
    headers: HeaderMap,
) -> impl IntoResponse {
    state.actions.logout(cookies::session_token(&headers));

    let cookie = cookies::cleared_session_cookie(state.config.auth.secure_cookies);
    (
        [(header::SET_COOKIE, cookie)],
        JSend::success(ActionResponse::redirect(&state.config.gate.login_path)),
    )
}
