use chrono::Utc;
use serde::Serialize;

use crate::error::Result;
use crate::models::order::{CustomerRecord, OrderRecord};
use crate::record_store::{ListQuery, RecordStore};

#[derive(Serialize)]
struct StatusPatch {
    #[serde(rename = "Id")]
    id: i64,
    status: String,
    paid_at: Option<String>,
}

/// Persists the order row, returning its record id.
pub async fn create_order(store: &RecordStore, table: &str, order: &OrderRecord) -> Result<i64> {
    store.create_record(table, order).await
}

/// Persists the companion customer row, returning its record id.
pub async fn create_customer(
    store: &RecordStore,
    table: &str,
    customer: &CustomerRecord,
) -> Result<i64> {
    store.create_record(table, customer).await
}

/// Resolves the record id of the order identified by `external_ref`.
pub async fn find_id_by_external_ref(
    store: &RecordStore,
    table: &str,
    external_ref: &str,
) -> Result<Option<i64>> {
    use sonic_rs::JsonValueTrait;

    let page = store
        .list_records::<sonic_rs::Value>(
            table,
            &ListQuery::filtered(format!("(external_ref,eq,{})", external_ref), 1),
        )
        .await?;
    Ok(page
        .list
        .first()
        .and_then(|row| row.get("Id").and_then(|id| id.as_i64())))
}

/// Patches an order's status. `paid_at` is stamped only when the new status
/// is `paid`, cleared otherwise.
pub async fn patch_status(
    store: &RecordStore,
    table: &str,
    order_id: i64,
    status: &str,
) -> Result<i64> {
    let paid_at = if status == "paid" {
        Some(Utc::now().to_rfc3339())
    } else {
        None
    };
    store
        .patch_record(
            table,
            &StatusPatch {
                id: order_id,
                status: status.to_string(),
                paid_at,
            },
        )
        .await
}
