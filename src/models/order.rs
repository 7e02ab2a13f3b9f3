use serde::{Deserialize, Serialize};
use sonic_rs::JsonValueTrait;

/// PIX-specific options on an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixOptions {
    pub expires_in_days: u32,
}

/// A single line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub title: String,
    pub unit_price: f64,
    pub quantity: u32,
    pub tangible: bool,
    pub external_ref: String,
}

/// A shipping address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub street_number: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    #[serde(default)]
    pub complement: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipping {
    pub fee: f64,
    pub address: Address,
}

/// A customer identity document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub number: String,
    #[serde(rename = "type")]
    pub doc_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub document: Document,
}

/// The inbound order-submission payload.
///
/// `metadata` accepts either a string or an object on the wire and is
/// normalized to a string before it leaves the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    pub amount: f64,
    pub payment_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pix: Option<PixOptions>,
    pub items: Vec<OrderItem>,
    pub shipping: Shipping,
    pub customer: Customer,
    #[serde(default)]
    pub metadata: sonic_rs::Value,
    pub external_ref: String,
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postback_url: Option<String>,
}

impl OrderPayload {
    /// The metadata field normalized to a string.
    pub fn metadata_string(&self) -> String {
        match self.metadata.as_str() {
            Some(s) => s.to_string(),
            None => sonic_rs::to_string(&self.metadata).unwrap_or_default(),
        }
    }

    /// The numeric product ids referenced by the line items.
    pub fn product_ids(&self) -> Vec<i64> {
        self.items
            .iter()
            .filter_map(|item| item.external_ref.parse().ok())
            .collect()
    }
}

/// The order row persisted in the record store after a provider accepts a
/// transaction. Only the fields the control layer later reads back are
/// modeled; the rest of the provider artifact travels in `metadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub external_ref: String,
    pub amount: f64,
    pub currency: String,
    pub payment_method: String,
    pub status: String,
    pub paid_at: Option<String>,
    pub ip: String,
    pub secure_id: String,
    pub secure_url: String,
    pub metadata: String,
}

/// The companion customer row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub document_number: String,
    pub document_type: String,
    pub external_ref: String,
}

/// Builds the order and customer rows from a provider artifact, falling back
/// to the submitted payload for fields the provider omits.
pub fn records_from_provider(
    provider_data: &sonic_rs::Value,
    payload: &OrderPayload,
) -> (OrderRecord, CustomerRecord) {
    let str_or = |value: Option<&sonic_rs::Value>, fallback: &str| -> String {
        value
            .and_then(|v| v.as_str())
            .unwrap_or(fallback)
            .to_string()
    };

    let provider_customer = provider_data.get("customer");
    let order = OrderRecord {
        external_ref: str_or(provider_data.get("externalRef"), &payload.external_ref),
        amount: provider_data
            .get("amount")
            .and_then(|v| v.as_f64())
            .unwrap_or(payload.amount),
        currency: str_or(provider_data.get("currency"), "BRL"),
        payment_method: str_or(provider_data.get("paymentMethod"), &payload.payment_method),
        status: str_or(provider_data.get("status"), "pending").to_lowercase(),
        paid_at: provider_data
            .get("paidAt")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        ip: payload.ip.clone(),
        secure_id: str_or(provider_data.get("secureId"), ""),
        secure_url: str_or(provider_data.get("secureUrl"), ""),
        metadata: payload.metadata_string(),
    };

    let customer = CustomerRecord {
        name: str_or(
            provider_customer.and_then(|c| c.get("name")),
            &payload.customer.name,
        ),
        email: str_or(
            provider_customer.and_then(|c| c.get("email")),
            &payload.customer.email,
        ),
        phone: str_or(
            provider_customer.and_then(|c| c.get("phone")),
            &payload.customer.phone,
        ),
        document_number: payload.customer.document.number.clone(),
        document_type: payload.customer.document.doc_type.to_lowercase(),
        external_ref: provider_customer
            .and_then(|c| c.get("id"))
            .and_then(|v| v.as_i64())
            .map(|id| id.to_string())
            .unwrap_or_else(|| payload.customer.document.number.clone()),
    };

    (order, customer)
}

#[cfg(test)]
pub fn test_payload() -> OrderPayload {
    OrderPayload {
        amount: 129.9,
        payment_method: "pix".to_string(),
        pix: Some(PixOptions { expires_in_days: 1 }),
        items: vec![OrderItem {
            title: "Vinyl record".to_string(),
            unit_price: 129.9,
            quantity: 1,
            tangible: true,
            external_ref: "42".to_string(),
        }],
        shipping: Shipping {
            fee: 0.0,
            address: Address {
                street: "Rua A".to_string(),
                street_number: "100".to_string(),
                neighborhood: "Centro".to_string(),
                city: "São Paulo".to_string(),
                state: "SP".to_string(),
                zip_code: "01000-000".to_string(),
                country: "BR".to_string(),
                complement: String::new(),
            },
        },
        customer: Customer {
            name: "Maria Silva".to_string(),
            email: "maria@example.com".to_string(),
            phone: "11999990000".to_string(),
            document: Document {
                number: "12345678909".to_string(),
                doc_type: "cpf".to_string(),
            },
        },
        metadata: sonic_rs::json!({"source": "web"}),
        external_ref: "order-abc-1".to_string(),
        ip: "1.2.3.4".to_string(),
        postback_url: None,
    }
}
