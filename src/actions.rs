//! The mutating entry points exposed to the outside world
//!
//! Setup, login, logout, password change and API token regeneration. The
//! HTTP handlers in [`crate::api`] are thin wrappers around these.

use std::sync::Arc;

use crate::bootstrap::{InitOutcome, InitializationManager};
use crate::error::AuthError;
use crate::gate::RequestGate;
use crate::storage::SecretKey;
use crate::tokens::TokenService;

pub struct AuthActions {
    gate: Arc<RequestGate>,
    setup: Arc<InitializationManager>,
    tokens: Arc<TokenService>,
}

impl AuthActions {
    pub fn new(
        setup: Arc<InitializationManager>,
        tokens: Arc<TokenService>,
        gate: Arc<RequestGate>,
    ) -> Self {
        Self {
            gate,
            setup,
            tokens,
        }
    }

    /// Initialize the system. A blank password is treated as absent, in
    /// which case one is generated and returned in the outcome.
    pub fn setup(&self, password: Option<&str>) -> Result<InitOutcome, AuthError> {
        let password = password.filter(|p| !p.is_empty());
        self.setup.initialize(password)
    }

    /// Exchange the admin password for a new session token
    pub fn login(&self, password: &str) -> Result<String, AuthError> {
        if !self.tokens.verify_admin_password(password)? {
            tracing::warn!("Login attempt with an invalid password");
            return Err(AuthError::Unauthorized);
        }
        self.tokens.issue_session_token()
    }

    /// Forget the cached validity of the caller's session token.
    ///
    /// The token itself stays cryptographically valid until it expires;
    /// clearing the cookie is what ends the browser session.
    pub fn logout(&self, session_token: Option<&str>) {
        if let Some(token) = session_token {
            self.gate.forget_session(token);
        }
    }

    /// Replace the admin password after checking the current one.
    /// Nothing is written unless both checks pass.
    pub fn change_password(&self, current: &str, new_password: &str) -> Result<(), AuthError> {
        if !self.tokens.verify_admin_password(current)? {
            return Err(AuthError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }
        self.setup.update_password(new_password)
    }

    /// Issue a new machine API token, replacing the old one
    pub fn regenerate_api_token(&self) -> Result<String, AuthError> {
        self.setup.regenerate_key(SecretKey::ApiToken)
    }
}
