//! Session-token issuance and credential verification
//!
//! Every `verify_*` method fails closed: a malformed, forged, expired or
//! unknown credential is `Ok(false)`. Only a store failure is an error, so
//! callers can tell an outage apart from a bad credential.

pub mod generator;
pub mod session;

pub use generator::{generate_hex, generate_key, generate_password};
pub use session::{Role, SessionClaims};

use chrono::Duration;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::cache::ConfigCache;
use crate::clock::Clock;
use crate::error::AuthError;
use crate::storage::SecretKey;

pub struct TokenService {
    clock: Arc<dyn Clock>,
    secrets: Arc<ConfigCache>,
    session_ttl: Duration,
}

impl TokenService {
    pub fn new(secrets: Arc<ConfigCache>, clock: Arc<dyn Clock>, session_ttl: Duration) -> Self {
        Self {
            clock,
            secrets,
            session_ttl,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Issue a signed admin session token valid for the session TTL
    pub fn issue_session_token(&self) -> Result<String, AuthError> {
        let signing_key = self
            .secrets
            .resolve(SecretKey::SigningKey)?
            .ok_or(AuthError::NotInitialized)?;

        let claims = SessionClaims::admin(self.clock.now(), self.session_ttl);
        let token = session::sign(&claims, &signing_key)?;
        tracing::debug!(exp = claims.exp, "Issued session token");
        Ok(token)
    }

    pub fn verify_session_token(&self, token: &str) -> Result<bool, AuthError> {
        let Some(signing_key) = self.secrets.resolve(SecretKey::SigningKey)? else {
            return Ok(false);
        };
        Ok(session::verify(token, &signing_key, self.clock.now()).is_some())
    }

    pub fn verify_machine_token(&self, token: &str) -> Result<bool, AuthError> {
        self.matches_secret(SecretKey::ApiToken, token)
    }

    pub fn verify_admin_password(&self, candidate: &str) -> Result<bool, AuthError> {
        self.matches_secret(SecretKey::AdminSecret, candidate)
    }

    fn matches_secret(&self, key: SecretKey, candidate: &str) -> Result<bool, AuthError> {
        let Some(stored) = self.secrets.resolve(key)? else {
            tracing::debug!(key = %key, "Secret not set; rejecting credential");
            return Ok(false);
        };
        Ok(constant_time_eq(stored.as_bytes(), candidate.as_bytes()))
    }
}

/// Compare two byte strings without short-circuiting on the first mismatch.
/// Only the length is allowed to leak.
pub fn constant_time_eq(expected: &[u8], candidate: &[u8]) -> bool {
    if expected.len() != candidate.len() {
        return false;
    }
    expected.ct_eq(candidate).into()
}
