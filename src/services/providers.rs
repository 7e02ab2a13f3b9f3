use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use sonic_rs::JsonValueTrait;

use crate::error::{AppError, Result};
use crate::models::order::OrderPayload;
use crate::state::AppState;

/// The payment providers this gateway can submit transactions to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    BlackCat,
    HyperCash,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::BlackCat => "blackcat",
            Provider::HyperCash => "hypercash",
        }
    }
}

/// Creates a transaction with `provider`, returning the provider's payment
/// artifact as JSON.
///
/// Transient failures (network, 5xx) are retried by the resilient client; a
/// conclusive non-2xx is passed through with the provider's own status code
/// and the response body as details.
pub async fn create_transaction(
    state: &AppState,
    provider: Provider,
    payload: &OrderPayload,
) -> Result<sonic_rs::Value> {
    let (url, auth, body) = match provider {
        Provider::BlackCat => {
            let public_key = state.config.blackcat_public_key.as_deref().ok_or_else(|| {
                AppError::Configuration("Missing Black Cat credentials".to_string())
            })?;
            let secret_key = state.config.blackcat_secret_key.as_deref().ok_or_else(|| {
                AppError::Configuration("Missing Black Cat credentials".to_string())
            })?;
            (
                format!("{}/v1/transactions", state.config.blackcat_base_url),
                format!(
                    "Basic {}",
                    BASE64.encode(format!("{}:{}", public_key, secret_key))
                ),
                sonic_rs::to_value(payload)
                    .map_err(|e| AppError::Internal(format!("Payload encode failed: {}", e)))?,
            )
        }
        Provider::HyperCash => {
            let secret_key = state.config.hypercash_secret_key.as_deref().ok_or_else(|| {
                AppError::Configuration("Missing Hyper Cash credentials".to_string())
            })?;
            (
                format!("{}/api/user/transactions", state.config.hypercash_base_url),
                format!("Basic {}", BASE64.encode(format!("x:{}", secret_key))),
                hypercash_order_body(payload)?,
            )
        }
    };

    tracing::debug!("Submitting transaction to {} at {}", provider.name(), url);
    let request = state
        .http
        .post(&url)
        .header("Authorization", auth)
        .header("accept", "application/json")
        .json(&body)
        .build()?;

    let response = state.provider_client.execute(request).await?;
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    if !status.is_success() {
        return Err(AppError::Provider {
            status: status.as_u16(),
            details: text,
        });
    }

    let value: sonic_rs::Value = sonic_rs::from_str(&text)
        .map_err(|e| AppError::Upstream(format!("Provider response decode failed: {}", e)))?;

    // Hyper Cash wraps the artifact in a data envelope.
    match provider {
        Provider::HyperCash => Ok(value.get("data").cloned().unwrap_or(value)),
        Provider::BlackCat => Ok(value),
    }
}

/// Reshapes the inbound payload into Hyper Cash's transaction format:
/// BRL currency, PIX with a one-day expiry, CPF documents, and metadata as
/// a JSON object rather than a string.
fn hypercash_order_body(payload: &OrderPayload) -> Result<sonic_rs::Value> {
    let metadata = match payload.metadata.as_str() {
        Some(s) => sonic_rs::from_str(s).unwrap_or_else(|_| payload.metadata.clone()),
        None => payload.metadata.clone(),
    };

    let shipping = sonic_rs::to_value(&payload.shipping)
        .map_err(|e| AppError::Internal(format!("Payload encode failed: {}", e)))?;
    let items = sonic_rs::to_value(&payload.items)
        .map_err(|e| AppError::Internal(format!("Payload encode failed: {}", e)))?;

    Ok(sonic_rs::json!({
        "amount": payload.amount,
        "currency": "BRL",
        "paymentMethod": "PIX",
        "pix": { "expiresInDays": 1 },
        "customer": {
            "name": payload.customer.name,
            "email": payload.customer.email,
            "phone": payload.customer.phone,
            "document": {
                "number": payload.customer.document.number,
                "type": "CPF",
            },
        },
        "shipping": shipping,
        "items": items,
        "metadata": metadata,
        "ip": payload.ip,
    }))
}
