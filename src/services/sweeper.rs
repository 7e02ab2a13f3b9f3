use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::models::session::{SessionPatch, SessionRecord};
use crate::repositories::session as session_repo;
use crate::state::AppState;

/// What one sweep tick accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub processed: usize,
    pub marked_inactive: usize,
}

/// The recurring background task that reclaims sessions whose owners have
/// disappeared. Start is idempotent (a second concurrent start is refused)
/// and performs one eager sweep before the periodic ones.
pub struct Sweeper {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Sweeper {
    pub fn new() -> Self {
        Self {
            task: Mutex::new(None),
        }
    }

    /// Whether a sweep task is currently scheduled.
    pub fn is_running(&self) -> bool {
        let task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        task.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Starts the recurring sweep. Returns `false` if one is already running.
    pub fn start(&self, state: AppState, interval: Duration) -> bool {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if task.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }

        let handle = tokio::spawn(async move {
            // interval's first tick fires immediately: that is the eager sweep.
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let report = run_sweep(&state).await;
                tracing::info!(
                    "✅ Sweep completed: {} sessions processed, {} marked inactive",
                    report.processed,
                    report.marked_inactive
                );
            }
        });
        *task = Some(handle);
        tracing::info!("🚀 Inactivity sweep started (interval {:?})", interval);
        true
    }

    /// Stops the recurring sweep. Returns `false` if none was running.
    pub fn stop(&self) -> bool {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        match task.take() {
            Some(handle) => {
                handle.abort();
                tracing::info!("🛑 Inactivity sweep stopped");
                true
            }
            None => false,
        }
    }
}

/// Scans active sessions and marks the stale ones inactive. Per-session
/// failures are logged and skipped so one bad row never aborts the sweep.
pub async fn run_sweep(state: &AppState) -> SweepReport {
    let sessions =
        match session_repo::list_active(&state.record_store, &state.config.sessions_table).await {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::error!("❌ Failed to list active sessions: {}", e);
                return SweepReport::default();
            }
        };

    tracing::info!("📊 Found {} active sessions", sessions.len());
    let now = Utc::now();
    let timeout = state.config.inactivity_timeout();
    let mut report = SweepReport::default();

    for session in sessions {
        let Some(id) = session.id else {
            tracing::warn!("Skipping active session without an id (IP: {})", session.ip);
            continue;
        };

        report.processed += 1;
        if !is_stale(&session, now, timeout) {
            continue;
        }

        if mark_inactive(state, id, &session.ip).await {
            report.marked_inactive += 1;
        }
    }

    report
}

/// Whether the sweep should retire this session.
///
/// The effective timestamp is `lastActivity`, falling back to the record's
/// update and create stamps. A session with no usable timestamp at all, or
/// one that fails to parse, is stale immediately.
fn is_stale(session: &SessionRecord, now: DateTime<Utc>, timeout: Duration) -> bool {
    let effective = session
        .last_activity
        .as_deref()
        .or(session.updated_at.as_deref())
        .or(session.created_at.as_deref());

    let Some(raw) = effective else {
        tracing::warn!(
            "Session {:?} (IP: {}) has no activity timestamp, treating as stale",
            session.id,
            session.ip
        );
        return true;
    };

    let Some(last_activity) = parse_timestamp(raw) else {
        tracing::warn!(
            "Session {:?} (IP: {}) has unparseable timestamp {:?}, treating as stale",
            session.id,
            session.ip,
            raw
        );
        return true;
    };

    let elapsed = now.signed_duration_since(last_activity);
    elapsed.num_milliseconds() > timeout.as_millis() as i64
}

/// The record store emits RFC 3339 timestamps, but older rows carry a
/// space-separated variant; accept both.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%#z")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

async fn mark_inactive(state: &AppState, session_id: i64, ip: &str) -> bool {
    let lock = state.session_locks.lock_for(ip);
    let _guard = lock.lock().await;

    let patch = SessionPatch {
        id: Some(session_id),
        status: Some(false),
        last_activity: Some(Utc::now().to_rfc3339()),
        ..Default::default()
    };
    match session_repo::patch(&state.record_store, &state.config.sessions_table, &patch).await {
        Ok(_) => {
            tracing::info!("✅ Session {} (IP: {}) marked inactive", session_id, ip);
            true
        }
        Err(e) => {
            tracing::error!("❌ Failed to mark session {} inactive: {}", session_id, e);
            false
        }
    }
}
