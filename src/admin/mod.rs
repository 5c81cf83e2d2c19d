//! Operator-facing admin endpoint.
//!
//! Served on its own bind address, authenticated with a bearer token.
//! Exposes process status, limiter occupancy summaries, and the rate limit
//! debug pages.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use crate::ratelimit::LimiterRegistry;
use self::auth::admin_auth;
use self::handlers::*;

/// State shared by the admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub api_key: Arc<str>,
    pub registry: Arc<LimiterRegistry>,
}

pub fn admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/limiters", get(get_limiters))
        .route("/admin/ratelimit", get(ratelimit_page))
        .route("/admin/ratelimit/{name}", get(ratelimit_dump))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth))
        .with_state(state)
}
