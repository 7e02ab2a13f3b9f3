use chrono::Utc;

use crate::error::Result;
use crate::models::session::{NewSession, SessionPatch, UpdateOutcome};
use crate::repositories::session as session_repo;
use crate::state::AppState;

/// The result of a first-writer-wins create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A new session row was written with this id.
    Created(i64),
    /// A session for that IP already existed; nothing was written.
    Existing,
}

/// Creates a session on first sight of `attrs.ip`; a no-op when one exists.
///
/// First-writer-wins: the existence check and the create are two round-trips,
/// serialized per IP so concurrent first requests cannot double-create.
pub async fn create_if_absent(state: &AppState, attrs: &NewSession) -> Result<CreateOutcome> {
    let lock = state.session_locks.lock_for(&attrs.ip);
    let _guard = lock.lock().await;

    let existing = session_repo::count_by_ip(
        &state.record_store,
        &state.config.sessions_table,
        &attrs.ip,
    )
    .await?;

    if existing > 0 {
        tracing::debug!("Session already exists for IP {}", attrs.ip);
        return Ok(CreateOutcome::Existing);
    }

    let id = session_repo::create(&state.record_store, &state.config.sessions_table, attrs).await?;
    tracing::info!("✅ Session created for IP {} (Id: {})", attrs.ip, id);
    Ok(CreateOutcome::Created(id))
}

/// Reconciles an incremental update into the session for `ip`.
///
/// Rules, in order:
/// 1. an attempt to write `createOrder` when the stored flag is already true
///    is silently dropped (monotonic latch);
/// 2. no session for `ip` is a benign no-op returning the zero-id sentinel;
/// 3. an absent or `true` status forces the session active; an explicit
///    `false` stays false; `lastActivity` is stamped either way.
pub async fn update(state: &AppState, ip: &str, mut patch: SessionPatch) -> Result<UpdateOutcome> {
    let lock = state.session_locks.lock_for(ip);
    let _guard = lock.lock().await;

    if patch.create_order.is_some() {
        let current =
            session_repo::find_by_ip(&state.record_store, &state.config.sessions_table, ip).await?;
        if let Some(session) = current {
            if session.create_order == Some(true) {
                tracing::warn!(
                    "Ignoring createOrder write for IP {}: flag is already set",
                    ip
                );
                patch.create_order = None;
            }
        }
    }

    let session_id =
        match session_repo::find_id_by_ip(&state.record_store, &state.config.sessions_table, ip)
            .await?
        {
            Some(id) => id,
            None => {
                tracing::warn!("No session found for IP {}. Skipping update.", ip);
                return Ok(UpdateOutcome::NO_OP);
            }
        };

    patch.id = Some(session_id);
    match patch.status {
        None | Some(true) => {
            patch.status = Some(true);
            tracing::debug!("Session {} (IP: {}) revived to active", session_id, ip);
        }
        Some(false) => {
            tracing::debug!("Session {} (IP: {}) set inactive", session_id, ip);
        }
    }
    patch.last_activity = Some(Utc::now().to_rfc3339());

    let id = session_repo::patch(&state.record_store, &state.config.sessions_table, &patch).await?;
    Ok(UpdateOutcome { id })
}

/// Best-effort latch of the session's order flag after a successful checkout.
/// Failures are logged and swallowed: session bookkeeping must never fail the
/// order submission it is attached to.
pub async fn mark_order_created(state: &AppState, ip: &str) {
    let patch = SessionPatch {
        create_order: Some(true),
        ..Default::default()
    };
    match update(state, ip, patch).await {
        Ok(outcome) if outcome.is_no_op() => {
            tracing::warn!("Order created for IP {} with no session to flag", ip);
        }
        Ok(outcome) => {
            tracing::info!("✅ Session {} flagged createOrder for IP {}", outcome.id, ip);
        }
        Err(e) => {
            tracing::error!("❌ Failed to flag createOrder for IP {}: {}", ip, e);
        }
    }
}
