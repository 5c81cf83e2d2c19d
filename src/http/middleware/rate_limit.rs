//! Per-source-address admission middleware.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::server::AppState;
use crate::observability::metrics;

/// Check the listener's rate limit before handling the request.
///
/// The decision is keyed on the connection's peer IP. If no peer address is
/// available the request is admitted: failing open on our own bookkeeping
/// beats denying legitimate traffic. Denied requests get a 429.
pub async fn admit(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(limiter) = &state.limiter else {
        return next.run(request).await;
    };

    let Some(ConnectInfo(peer)) = request.extensions().get::<ConnectInfo<SocketAddr>>() else {
        tracing::error!("No peer address on request, admitting");
        return next.run(request).await;
    };

    let ip = peer.ip();
    if limiter.allow(ip) {
        next.run(request).await
    } else {
        tracing::debug!(client = %ip, "Rate limit exceeded");
        metrics::record_rate_limited("http");
        (StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded").into_response()
    }
}
