use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::idempotency::{IdempotencyStore, InMemoryIdempotencyStore};
use crate::rate_limit::{FixedWindowLimiter, RateLimiter};
use crate::record_store::RecordStore;
use crate::retry::{RetryClient, RetryPolicy};
use crate::services::sweeper::Sweeper;

/// Serializes mutating session calls per IP.
///
/// The existence check, the latch read and the eventual patch are separate
/// record-store round-trips; holding the IP's lock across them is what keeps
/// two concurrent updates for the same visitor from clobbering each other.
pub struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the lock guarding `ip`, creating it on first sight.
    pub fn lock_for(&self, ip: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(ip.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Drops locks nobody currently holds.
    pub fn prune(&self) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Config,
    /// The shared outbound HTTP client.
    pub http: reqwest::Client,
    /// The record store collaborator (wrapped in the retry client).
    pub record_store: RecordStore,
    /// Resilient client for payment provider calls.
    pub provider_client: RetryClient,
    /// Admission control for the order-submission endpoints.
    pub rate_limiter: Arc<dyn RateLimiter>,
    /// Replay cache for idempotent order submission.
    pub idempotency: Arc<dyn IdempotencyStore>,
    /// Per-IP serialization of session mutations.
    pub session_locks: Arc<SessionLocks>,
    /// The inactivity sweep scheduler.
    pub sweeper: Arc<Sweeper>,
}

impl AppState {
    /// Creates a new `AppState` from the configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::new();

        let store_retry = RetryClient::new(
            http.clone(),
            RetryPolicy::new(
                Duration::from_millis(config.record_store_timeout_ms),
                config.outbound_max_retries,
                Duration::from_millis(250),
            ),
        );
        let record_store = RecordStore::new(
            http.clone(),
            store_retry,
            config.record_store_base_url.clone(),
            config.record_store_token.clone(),
        );
        tracing::info!("✅ Record store client initialized");

        let provider_client = RetryClient::new(
            http.clone(),
            RetryPolicy::new(
                Duration::from_millis(config.provider_timeout_ms),
                config.outbound_max_retries,
                Duration::from_millis(config.outbound_base_delay_ms),
            ),
        );

        let rate_limiter: Arc<dyn RateLimiter> = Arc::new(FixedWindowLimiter::new(
            config.rate_limit_max_requests,
            Duration::from_secs(config.rate_limit_window_secs),
        ));
        tracing::info!(
            "✅ Rate limiter initialized ({} req / {}s window)",
            config.rate_limit_max_requests,
            config.rate_limit_window_secs
        );

        let idempotency: Arc<dyn IdempotencyStore> = Arc::new(InMemoryIdempotencyStore::new(
            Duration::from_secs(config.idempotency_ttl_secs),
        ));
        tracing::info!(
            "✅ Idempotency store initialized (TTL {}s)",
            config.idempotency_ttl_secs
        );

        Ok(AppState {
            config: config.clone(),
            http: http.clone(),
            record_store,
            provider_client,
            rate_limiter,
            idempotency,
            session_locks: Arc::new(SessionLocks::new()),
            sweeper: Arc::new(Sweeper::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_locks_prune_keeps_held_locks() {
        let locks = SessionLocks::new();
        let held = locks.lock_for("1.2.3.4");
        let _dropped = locks.lock_for("5.6.7.8");
        drop(_dropped);

        locks.prune();

        let map = locks.locks.lock().unwrap();
        assert!(map.contains_key("1.2.3.4"));
        assert!(!map.contains_key("5.6.7.8"));
        drop(held);
    }

    #[test]
    fn same_ip_gets_the_same_lock() {
        let locks = SessionLocks::new();
        let a = locks.lock_for("1.2.3.4");
        let b = locks.lock_for("1.2.3.4");
        assert!(Arc::ptr_eq(&a, &b));
    }
}
