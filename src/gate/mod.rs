//! Request gating
//!
//! [`RequestGate::evaluate`] decides, for one inbound request, whether it is
//! forwarded to the downstream service, redirected to the setup or login
//! page, or rejected outright. The HTTP adapter lives in
//! [`crate::api::middleware`].

pub mod route_table;

pub use route_table::{same_path, RouteClass, RoutePattern, RouteTable};

use std::sync::Arc;

use crate::bootstrap::InitializationManager;
use crate::cache::SessionValidationCache;
use crate::error::AuthError;
use crate::tokens::{Role, TokenService};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "auth-token";

#[derive(Debug, Clone)]
pub struct GateConfig {
    pub login_path: String,
    pub routes: RouteTable,
    pub setup_path: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            routes: RouteTable::default(),
            setup_path: "/setup".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// Browser session cookie
    SessionCookie,
    /// Session token presented as a bearer token
    BearerSession,
    /// Static machine API token
    ApiToken,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::SessionCookie => "session-cookie",
            AuthMethod::BearerSession => "bearer-session",
            AuthMethod::ApiToken => "api-token",
        }
    }
}

/// Marker attached to a forwarded request once it has been authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub method: AuthMethod,
    pub role: Role,
}

impl AuthContext {
    fn admin(method: AuthMethod) -> Self {
        Self {
            method,
            role: Role::Admin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Forward(Option<AuthContext>),
    Redirect(String),
    /// 401 Unauthorized
    Reject,
}

/// The parts of a request the gate looks at
#[derive(Debug, Clone, Copy, Default)]
pub struct GateRequest<'a> {
    pub authorization: Option<&'a str>,
    pub path: &'a str,
    pub session_cookie: Option<&'a str>,
}

pub struct RequestGate {
    config: GateConfig,
    sessions: SessionValidationCache,
    setup: Arc<InitializationManager>,
    tokens: Arc<TokenService>,
}

impl RequestGate {
    pub fn new(
        config: GateConfig,
        setup: Arc<InitializationManager>,
        tokens: Arc<TokenService>,
        sessions: SessionValidationCache,
    ) -> Self {
        Self {
            config,
            sessions,
            setup,
            tokens,
        }
    }

    pub fn sessions(&self) -> &SessionValidationCache {
        &self.sessions
    }

    pub fn evaluate(&self, request: &GateRequest<'_>) -> Result<GateDecision, AuthError> {
        let on_setup_page = same_path(request.path, &self.config.setup_path);

        if self.setup.is_initialized()? {
            if on_setup_page {
                return Ok(GateDecision::Redirect(self.config.login_path.clone()));
            }
        } else if !on_setup_page {
            return Ok(GateDecision::Redirect(self.config.setup_path.clone()));
        }

        match self.config.routes.classify(request.path) {
            RouteClass::Public => Ok(GateDecision::Forward(None)),
            RouteClass::MachineApi => self.check_bearer(request),
            RouteClass::Protected => self.check_session_cookie(request),
        }
    }

    /// Session validity as seen through the validation cache. A cached
    /// answer is reused until it goes stale, even if the signing key changed
    /// in the meantime.
    pub fn session_is_valid(&self, token: &str) -> Result<bool, AuthError> {
        if let Some(valid) = self.sessions.get(token) {
            return Ok(valid);
        }

        let valid = self.tokens.verify_session_token(token)?;
        self.sessions.insert(token, valid);
        Ok(valid)
    }

    /// Drop a token's cached validity (on logout)
    pub fn forget_session(&self, token: &str) {
        self.sessions.remove(token);
    }

    fn check_bearer(&self, request: &GateRequest<'_>) -> Result<GateDecision, AuthError> {
        let Some(token) = request.authorization.and_then(bearer_token) else {
            tracing::debug!(path = %request.path, "Missing or malformed bearer token");
            return Ok(GateDecision::Reject);
        };

        if self.tokens.verify_machine_token(token)? {
            return Ok(GateDecision::Forward(Some(AuthContext::admin(
                AuthMethod::ApiToken,
            ))));
        }
        if self.tokens.verify_session_token(token)? {
            return Ok(GateDecision::Forward(Some(AuthContext::admin(
                AuthMethod::BearerSession,
            ))));
        }

        tracing::debug!(path = %request.path, "Bearer token rejected");
        Ok(GateDecision::Reject)
    }

    fn check_session_cookie(&self, request: &GateRequest<'_>) -> Result<GateDecision, AuthError> {
        let token = request.session_cookie.filter(|t| !t.is_empty());
        let Some(token) = token else {
            return Ok(GateDecision::Redirect(self.config.login_path.clone()));
        };

        if self.session_is_valid(token)? {
            Ok(GateDecision::Forward(Some(AuthContext::admin(
                AuthMethod::SessionCookie,
            ))))
        } else {
            tracing::debug!(path = %request.path, "Session cookie rejected");
            Ok(GateDecision::Redirect(self.config.login_path.clone()))
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
/// Everything after the prefix is the token, whitespace included.
pub fn bearer_token(header: &str) -> Option<&str> {
    header.strip_prefix("Bearer ").filter(|t| !t.is_empty())
}
