use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, Result},
    models::order::OrderPayload,
    services::checkout,
    services::providers::Provider,
    state::AppState,
};

/// The envelope the storefront posts to the payment endpoints.
#[derive(Deserialize, Debug)]
pub struct PaymentRequest {
    #[serde(rename = "orderData")]
    pub order_data: OrderPayload,
}

/// A provider postback notifying an order status change.
#[derive(Deserialize, Debug)]
pub struct PostbackRequest {
    #[serde(rename = "externalRef")]
    pub external_ref: String,
    pub status: String,
}

/// Handles an order submission via Black Cat.
pub async fn submit_blackcat(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    submit(state, Provider::BlackCat, headers, body).await
}

/// Handles an order submission via Hyper Cash.
pub async fn submit_hypercash(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    submit(state, Provider::HyperCash, headers, body).await
}

async fn submit(
    state: AppState,
    provider: Provider,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let parsed: PaymentRequest = sonic_rs::from_slice(&body)
        .map_err(|e| AppError::InvalidPayload(vec![format!("malformed payload: {}", e)]))?;

    let idempotency_key = headers
        .get("Idempotency-Key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    tracing::info!(
        "💳 Order submission via {} (externalRef: {})",
        provider.name(),
        parsed.order_data.external_ref
    );

    let response_body =
        checkout::submit_order(&state, provider, idempotency_key, parsed.order_data).await?;

    Ok((
        StatusCode::OK,
        [(http::header::CONTENT_TYPE, "application/json")],
        response_body,
    )
        .into_response())
}

/// Handles a provider postback for an existing order.
pub async fn postback(
    State(state): State<AppState>,
    Json(payload): Json<PostbackRequest>,
) -> Result<Response> {
    if payload.external_ref.is_empty() {
        return Err(AppError::Validation("externalRef is required".to_string()));
    }

    let order_id = checkout::apply_postback(&state, &payload.external_ref, &payload.status).await?;

    Ok((
        StatusCode::OK,
        Json(sonic_rs::json!({
            "success": true,
            "orderId": order_id,
        })),
    )
        .into_response())
}
