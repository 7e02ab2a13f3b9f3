use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

pub mod client_ip;
pub mod config;
pub mod error;
pub mod idempotency;
pub mod rate_limit;
pub mod record_store;
pub mod retry;
pub mod state;

pub mod models {
    pub mod order;
    pub mod session;
}

pub mod repositories {
    pub mod order;
    pub mod session;
}

pub mod services {
    pub mod checkout;
    pub mod providers;
    pub mod session;
    pub mod sweeper;
}

pub mod handlers {
    pub mod payments;
    pub mod scheduler;
    pub mod session;
}

pub mod middleware_layer {
    pub mod rate_limit;
}

pub mod validation {
    pub mod order;
}

use state::AppState;

/// Assembles the application router.
///
/// Only the order-submission endpoints sit behind the rate limiter; session
/// signals and scheduler control are not admission-controlled.
pub fn router(state: AppState) -> Router {
    let payment_routes = Router::new()
        .route("/api/payments/blackcat", post(handlers::payments::submit_blackcat))
        .route(
            "/api/payments/hypercash",
            post(handlers::payments::submit_hypercash),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::rate_limit::rate_limit_orders,
        ))
        .with_state(state.clone());

    let session_routes = Router::new()
        .route("/api/session/check", get(handlers::session::check))
        .route("/api/session/create", post(handlers::session::create))
        .route("/api/session/update", post(handlers::session::update))
        .route(
            "/api/session/update-status",
            post(handlers::session::update_status),
        )
        .route(
            "/api/session/scheduler",
            post(handlers::scheduler::control).get(handlers::scheduler::status),
        )
        .with_state(state.clone());

    Router::new()
        .merge(payment_routes)
        .merge(session_routes)
        .route("/api/payments/postback", post(handlers::payments::postback))
        .with_state(state)
}
