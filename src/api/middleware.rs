//! Request gate middleware
//!
//! Runs [`RequestGate::evaluate`](crate::gate::RequestGate::evaluate) on every
//! inbound request. Admitted requests continue to the handler or downstream
//! service with the [`AuthContext`](crate::gate::AuthContext) attached as a
//! request extension.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::cookies;
use super::response::ApiError;
use crate::error::AuthError;
use crate::gate::{GateDecision, GateRequest};
use crate::AppState;

pub async fn request_gate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let decision = {
        let headers = request.headers();
        let gate_request = GateRequest {
            authorization: headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok()),
            path: request.uri().path(),
            session_cookie: cookies::session_token(headers),
        };
        state.gate.evaluate(&gate_request)
    };

    match decision {
        Ok(GateDecision::Forward(context)) => {
            if let Some(context) = context {
                request.extensions_mut().insert(context);
            }
            next.run(request).await
        }
        Ok(GateDecision::Redirect(location)) => {
            tracing::debug!(path = %request.uri().path(), %location, "Redirecting");
            redirect(&location)
        }
        Ok(GateDecision::Reject) => ApiError::from(AuthError::Unauthorized).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
