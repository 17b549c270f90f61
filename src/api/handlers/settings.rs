use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson, JSend};
use crate::gate::{AuthContext, AuthMethod};
use crate::AppState;

use super::ActionResponse;

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct ApiTokenResponse {
    pub api_token: String,
    pub success: bool,
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
    AppJson(req): AppJson<ChangePasswordRequest>,
) -> Result<Json<JSend<ActionResponse>>, ApiError> {
    require_session(&context)?;
    state
        .actions
        .change_password(&req.current_password, &req.new_password)?;

    Ok(JSend::success(ActionResponse::ok()))
}

pub async fn regenerate_api_token(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
) -> Result<Json<JSend<ApiTokenResponse>>, ApiError> {
    require_session(&context)?;
    let api_token = state.actions.regenerate_api_token()?;

    Ok(JSend::success(ApiTokenResponse {
        api_token,
        success: true,
    }))
}

/// Settings are only changed from a browser session, never with the
/// machine token they would rotate.
fn require_session(context: &AuthContext) -> Result<(), ApiError> {
    match context.method {
        AuthMethod::SessionCookie | AuthMethod::BearerSession => Ok(()),
        AuthMethod::ApiToken => Err(ApiError::unauthorized()),
    }
}
