//! mail-gate - authentication and request gating for a single-tenant email manager
//!
//! This crate provides:
//! - A redb-backed store for the signing key, machine API token and admin password
//! - One-time initialization and secret rotation
//! - Signed, time-limited admin session tokens
//! - A request gate that routes every path through a public, session or
//!   bearer-token policy, with TTL caches in front of the store
//! - An axum front end that forwards admitted requests to the email application

pub mod actions;
pub mod api;
pub mod bootstrap;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod expiration;
pub mod gate;
pub mod storage;
#[cfg(test)]
pub mod testutil;
pub mod tokens;

use std::sync::Arc;

use actions::AuthActions;
use bootstrap::InitializationManager;
use cache::{ConfigCache, SessionValidationCache};
use clock::Clock;
use config::Config;
use gate::RequestGate;
use storage::SecretStore;
use tokens::TokenService;

/// Shared application state
pub struct AppState {
    pub actions: AuthActions,
    pub config: Config,
    pub gate: Arc<RequestGate>,
    pub secrets: Arc<ConfigCache>,
    pub setup: Arc<InitializationManager>,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    /// Wire every service around one secret store and one clock.
    pub fn new(config: Config, store: Arc<dyn SecretStore>, clock: Arc<dyn Clock>) -> Self {
        let auth = &config.auth;

        let secrets = Arc::new(ConfigCache::new(
            store,
            auth.config_cache_ttl(),
            Arc::clone(&clock),
        ));
        let setup = Arc::new(InitializationManager::new(
            Arc::clone(&secrets),
            auth.min_password_len,
        ));
        let tokens = Arc::new(TokenService::new(
            Arc::clone(&secrets),
            Arc::clone(&clock),
            auth.session_ttl(),
        ));
        let sessions = SessionValidationCache::new(auth.session_cache_ttl(), clock)
            .with_capacity(auth.session_cache_capacity);
        let gate = Arc::new(RequestGate::new(
            config.gate.clone(),
            Arc::clone(&setup),
            Arc::clone(&tokens),
            sessions,
        ));
        let actions = AuthActions::new(Arc::clone(&setup), Arc::clone(&tokens), Arc::clone(&gate));

        Self {
            actions,
            config,
            gate,
            secrets,
            setup,
            tokens,
        }
    }
}
