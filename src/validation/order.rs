use crate::error::{AppError, Result};
use crate::models::order::OrderPayload;

/// Validates an inbound order payload against the submission schema and
/// normalizes its metadata to a string.
///
/// All problems are collected so the caller gets the full list of issues in
/// one 400 response instead of one at a time.
pub fn validate_order(payload: &mut OrderPayload) -> Result<()> {
    let mut issues = Vec::new();

    if payload.amount <= 0.0 {
        issues.push("amount must be positive".to_string());
    }
    if payload.payment_method.len() < 2 {
        issues.push("paymentMethod is required".to_string());
    }
    if payload.external_ref.is_empty() {
        issues.push("externalRef is required".to_string());
    }
    if payload.ip.is_empty() {
        issues.push("ip is required".to_string());
    }

    if payload.items.is_empty() {
        issues.push("at least one item is required".to_string());
    }
    for (i, item) in payload.items.iter().enumerate() {
        if item.title.is_empty() {
            issues.push(format!("items[{}].title is required", i));
        }
        if item.unit_price < 0.0 {
            issues.push(format!("items[{}].unitPrice must not be negative", i));
        }
        if item.quantity == 0 {
            issues.push(format!("items[{}].quantity must be positive", i));
        }
        if item.external_ref.is_empty() {
            issues.push(format!("items[{}].externalRef is required", i));
        }
    }

    if payload.shipping.fee < 0.0 {
        issues.push("shipping.fee must not be negative".to_string());
    }
    let address = &payload.shipping.address;
    for (value, name) in [
        (&address.street, "street"),
        (&address.street_number, "streetNumber"),
        (&address.neighborhood, "neighborhood"),
        (&address.city, "city"),
        (&address.state, "state"),
    ] {
        if value.is_empty() {
            issues.push(format!("shipping.address.{} is required", name));
        }
    }
    if address.zip_code.len() < 5 {
        issues.push("shipping.address.zipCode must be at least 5 characters".to_string());
    }
    if address.country.len() < 2 {
        issues.push("shipping.address.country must be at least 2 characters".to_string());
    }

    let customer = &payload.customer;
    if customer.name.is_empty() {
        issues.push("customer.name is required".to_string());
    }
    if !customer.email.contains('@') {
        issues.push("customer.email must be a valid email address".to_string());
    }
    if customer.phone.len() < 8 {
        issues.push("customer.phone must be at least 8 characters".to_string());
    }
    if customer.document.number.is_empty() {
        issues.push("customer.document.number is required".to_string());
    }
    if customer.document.doc_type.len() < 2 {
        issues.push("customer.document.type is required".to_string());
    }

    if let Some(ref url) = payload.postback_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            issues.push("postbackUrl must be a valid URL".to_string());
        }
    }

    if !issues.is_empty() {
        return Err(AppError::InvalidPayload(issues));
    }

    // Metadata travels as a string from here on.
    payload.metadata = sonic_rs::json!(payload.metadata_string());
    Ok(())
}
