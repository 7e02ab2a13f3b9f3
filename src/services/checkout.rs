use crate::error::Result;
use crate::idempotency::{CachedResponse, derive_key};
use crate::models::order::records_from_provider;
use crate::models::order::OrderPayload;
use crate::repositories::order as order_repo;
use crate::services::providers::{self, Provider};
use crate::services::session as session_service;
use crate::state::AppState;
use crate::validation::order::validate_order;

/// Submits an order to `provider` and persists the result.
///
/// The happy path: validate → idempotency lookup → provider transaction →
/// order + customer rows in the record store → best-effort session order
/// flag → response cached under the idempotency key. Returns the serialized
/// response body so a replay is byte-identical to the first answer.
pub async fn submit_order(
    state: &AppState,
    provider: Provider,
    header_key: Option<String>,
    mut payload: OrderPayload,
) -> Result<String> {
    validate_order(&mut payload)?;

    let key = header_key
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| derive_key(&payload));

    if let Some(cached) = state.idempotency.get(&key) {
        tracing::info!("♻️ Replaying cached response for idempotency key {}", key);
        return Ok(cached.body);
    }

    let provider_data = providers::create_transaction(state, provider, &payload).await?;
    tracing::info!(
        "✅ {} accepted transaction for externalRef {}",
        provider.name(),
        payload.external_ref
    );

    let (order, customer) = records_from_provider(&provider_data, &payload);
    let order_id =
        order_repo::create_order(&state.record_store, &state.config.orders_table, &order).await?;
    order_repo::create_customer(&state.record_store, &state.config.customers_table, &customer)
        .await?;
    tracing::info!("✅ Order persisted (record id {})", order_id);

    // Session bookkeeping must never fail the checkout it rides on.
    session_service::mark_order_created(state, &payload.ip).await;

    let body = sonic_rs::to_string(&sonic_rs::json!({
        "success": true,
        "providerData": provider_data,
        "recordStoreOrderId": order_id,
        "productIds": payload.product_ids(),
    }))
    .map_err(|e| crate::error::AppError::Internal(format!("Response encode failed: {}", e)))?;

    state.idempotency.put(&key, CachedResponse { body: body.clone() });
    Ok(body)
}

/// Applies a provider postback to the persisted order: resolves the row by
/// `external_ref`, then patches `status` (and `paid_at` when paid).
pub async fn apply_postback(state: &AppState, external_ref: &str, status: &str) -> Result<i64> {
    let order_id = order_repo::find_id_by_external_ref(
        &state.record_store,
        &state.config.orders_table,
        external_ref,
    )
    .await?
    .ok_or(crate::error::AppError::NotFound)?;

    order_repo::patch_status(
        &state.record_store,
        &state.config.orders_table,
        order_id,
        status,
    )
    .await?;
    tracing::info!(
        "✅ Order {} (externalRef {}) patched to status {}",
        order_id,
        external_ref,
        status
    );
    Ok(order_id)
}
