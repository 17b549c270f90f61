pub mod cookies;
pub mod handlers;
pub mod middleware;
pub mod proxy;
pub mod response;
pub mod routes;

pub use proxy::{upstream_router, Upstream};
pub use routes::create_router;

use axum::Router;

/// Downstream for deployments without an upstream application
pub fn not_found_router() -> Router {
    Router::new().fallback(handlers::not_found)
}
