mod auth;
mod internal;
mod settings;

use serde::Serialize;

pub use auth::{login, logout, setup, LoginRequest, SetupRequest, SetupResponse};
pub use internal::{health, not_found, HealthResponse};
pub use settings::{change_password, regenerate_api_token, ApiTokenResponse, ChangePasswordRequest};

/// Success flag plus an optional page to go to next
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    pub success: bool,
}

impl ActionResponse {
    pub fn ok() -> Self {
        Self {
            redirect: None,
            success: true,
        }
    }

    pub fn redirect(to: &str) -> Self {
        Self {
            redirect: Some(to.to_string()),
            success: true,
        }
    }
}
