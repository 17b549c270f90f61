use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::middleware::request_gate;
use crate::AppState;

/// Build the gateway router.
///
/// Every route except the internal health check sits behind the request
/// gate. Anything without a local handler (including `GET /login` and
/// `GET /setup`) goes to `downstream`.
pub fn create_router(state: Arc<AppState>, downstream: Router) -> Router {
    let gate = &state.config.gate;

    // Auth actions -- pages for these paths are served downstream
    let gated = Router::new()
        .route(
            &gate.setup_path,
            post(handlers::setup).fallback_service(downstream.clone()),
        )
        .route(
            &gate.login_path,
            post(handlers::login).fallback_service(downstream.clone()),
        )
        .route("/logout", post(handlers::logout))
        .route("/settings/password", post(handlers::change_password))
        .route("/settings/api-token", post(handlers::regenerate_api_token))
        .fallback_service(downstream)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            request_gate,
        ));

    // Internal routes -- added after the gate layer so they bypass it
    gated
        .route("/_internal/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
