use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

use crate::{client_ip::extract_client_ip, error::AppError, state::AppState};

/// Extracts the real IP address from the request headers and extensions.
pub fn extract_real_ip(req: &Request<Body>) -> String {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    extract_client_ip(req.headers(), peer)
}

/// A middleware that rate limits the order-submission endpoints per client IP.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `req` - The incoming request.
/// * `next` - The next middleware in the chain.
///
/// # Returns
///
/// A `429` response when the window's budget is spent, the downstream
/// response otherwise.
pub async fn rate_limit_orders(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = extract_real_ip(&req);

    if !state.rate_limiter.allow(&ip) {
        return AppError::RateLimitExceeded(format!("IP {}", ip)).into_response();
    }

    next.run(req).await
}
