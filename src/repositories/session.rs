use chrono::Utc;
use serde::Serialize;

use crate::error::Result;
use crate::models::session::{NewSession, SessionPatch, SessionRecord};
use crate::record_store::{ListQuery, RecordStore};

/// Page size when resolving a session by IP.
const LOOKUP_LIMIT: u32 = 200;
/// Page size for the sweep's active-session scan.
const ACTIVE_SCAN_LIMIT: u32 = 1000;

#[derive(Serialize)]
struct CreateBody<'a> {
    #[serde(flatten)]
    attrs: &'a NewSession,
    status: bool,
    #[serde(rename = "createOrder")]
    create_order: bool,
    #[serde(rename = "lastActivity")]
    last_activity: String,
}

/// Counts the sessions recorded for `ip`.
pub async fn count_by_ip(store: &RecordStore, table: &str, ip: &str) -> Result<u64> {
    store
        .count_records(table, &format!("(ip,eq,{})", ip))
        .await
}

/// Fetches the full session for `ip`, if one exists.
pub async fn find_by_ip(store: &RecordStore, table: &str, ip: &str) -> Result<Option<SessionRecord>> {
    let page = store
        .list_records::<SessionRecord>(
            table,
            &ListQuery::filtered(format!("(ip,eq,{})", ip), LOOKUP_LIMIT),
        )
        .await?;
    Ok(page.list.into_iter().next())
}

/// Resolves the durable id of the session for `ip`.
pub async fn find_id_by_ip(store: &RecordStore, table: &str, ip: &str) -> Result<Option<i64>> {
    Ok(find_by_ip(store, table, ip).await?.and_then(|s| s.id))
}

/// Creates a fresh session row: active, order flag unset, activity stamped now.
pub async fn create(store: &RecordStore, table: &str, attrs: &NewSession) -> Result<i64> {
    store
        .create_record(
            table,
            &CreateBody {
                attrs,
                status: true,
                create_order: false,
                last_activity: Utc::now().to_rfc3339(),
            },
        )
        .await
}

/// Applies a patch-by-identity; `patch.id` must be set.
pub async fn patch(store: &RecordStore, table: &str, patch: &SessionPatch) -> Result<i64> {
    store.patch_record(table, patch).await
}

/// Lists currently active sessions (bounded page).
pub async fn list_active(store: &RecordStore, table: &str) -> Result<Vec<SessionRecord>> {
    let page = store
        .list_records::<SessionRecord>(
            table,
            &ListQuery::filtered("(status,eq,true)", ACTIVE_SCAN_LIMIT),
        )
        .await?;
    Ok(page.list)
}
