//! Upstream forwarding
//!
//! Requests admitted by the gate that no local route handles are proxied to
//! the email application. The authentication method is passed along in the
//! `x-authenticated-via` header; any client-supplied value is discarded.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, Response, StatusCode},
    response::IntoResponse,
    Router,
};
use std::sync::Arc;

use super::response::ApiError;
use crate::gate::AuthContext;

/// Header carrying the authentication method to the upstream
pub const AUTHENTICATED_VIA: HeaderName = HeaderName::from_static("x-authenticated-via");

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

const HOP_BY_HOP: [HeaderName; 5] = [
    header::CONNECTION,
    header::HOST,
    header::TRANSFER_ENCODING,
    header::TE,
    header::UPGRADE,
];

#[derive(Clone)]
pub struct Upstream {
    base_url: String,
    client: reqwest::Client,
}

impl Upstream {
    pub fn new(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }
}

/// A router that sends every request to the upstream
pub fn upstream_router(upstream: Upstream) -> Router {
    Router::new()
        .fallback(forward_to_upstream)
        .with_state(Arc::new(upstream))
}

async fn forward_to_upstream(
    State(upstream): State<Arc<Upstream>>,
    request: Request,
) -> Response<Body> {
    let (parts, body) = request.into_parts();

    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("{}{path}", upstream.base_url);

    let mut headers = forwardable(&parts.headers);
    headers.remove(&AUTHENTICATED_VIA);
    if let Some(context) = parts.extensions.get::<AuthContext>() {
        headers.insert(
            AUTHENTICATED_VIA,
            header::HeaderValue::from_static(context.method.as_str()),
        );
    }

    let body_bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return ApiError::bad_request(format!("Failed to read request body: {e}"))
                .into_response();
        }
    };

    let mut builder = upstream
        .client
        .request(parts.method.clone(), &url)
        .headers(headers);
    if !body_bytes.is_empty() {
        builder = builder.body(body_bytes);
    }

    let response = match builder.send().await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!(error = %e, %url, "Upstream request failed");
            return ApiError::bad_gateway("Failed to reach the email application").into_response();
        }
    };

    let status = response.status();
    let response_headers = forwardable(response.headers());

    match response.bytes().await {
        Ok(bytes) => {
            let mut axum_response = Response::new(Body::from(bytes));
            *axum_response.status_mut() = status;
            *axum_response.headers_mut() = response_headers;
            axum_response
        }
        Err(e) => {
            tracing::warn!(error = %e, %url, "Failed to read upstream response");
            ApiError::from_status(
                StatusCode::BAD_GATEWAY,
                "Failed to read the email application's response",
            )
            .into_response()
        }
    }
}

fn forwardable(headers: &HeaderMap) -> HeaderMap {
    let mut out = headers.clone();
    for name in &HOP_BY_HOP {
        out.remove(name);
    }
    out.remove(header::CONTENT_LENGTH);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwardable_drops_hop_by_hop_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("gate.local"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let out = forwardable(&headers);

        assert!(out.get(header::HOST).is_none());
        assert!(out.get(header::CONNECTION).is_none());
        assert_eq!(out.get(header::CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn test_upstream_base_url_is_normalized() {
        let upstream = Upstream::new("http://mail-app:4321/", reqwest::Client::new());
        assert_eq!(upstream.base_url, "http://mail-app:4321");
    }
}
