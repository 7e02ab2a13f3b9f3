use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::models::order::OrderPayload;

/// A previously computed success response, replayed verbatim.
#[derive(Clone, Debug, PartialEq)]
pub struct CachedResponse {
    /// The serialized JSON body exactly as it was first sent.
    pub body: String,
}

/// Short-TTL key → response memo preventing duplicate order creation on
/// client retries. Injected as a trait object for the same reason as
/// [`crate::rate_limit::RateLimiter`].
pub trait IdempotencyStore: Send + Sync {
    /// Returns the stored response for `key` if it is still fresh.
    fn get(&self, key: &str) -> Option<CachedResponse>;

    /// Stores `response` under `key`, overwriting any prior entry.
    fn put(&self, key: &str, response: CachedResponse);

    /// Evicts expired entries.
    fn prune(&self);
}

struct Entry {
    stored_at: Instant,
    response: CachedResponse,
}

/// Process-local idempotency store with lazy expiry.
pub struct InMemoryIdempotencyStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryIdempotencyStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<CachedResponse> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            None => None,
            Some(entry) if now.duration_since(entry.stored_at) > self.ttl => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.response.clone()),
        }
    }

    fn prune_at(&self, now: Instant) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, entry| now.duration_since(entry.stored_at) <= self.ttl);
    }
}

impl IdempotencyStore for InMemoryIdempotencyStore {
    fn get(&self, key: &str) -> Option<CachedResponse> {
        self.get_at(key, Instant::now())
    }

    fn put(&self, key: &str, response: CachedResponse) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key.to_string(),
            Entry {
                stored_at: Instant::now(),
                response,
            },
        );
    }

    fn prune(&self) {
        self.prune_at(Instant::now());
    }
}

/// Derives an idempotency key when the caller did not supply one.
///
/// Prefers the payload's own `externalRef`; otherwise falls back to
/// `"{customer document}-{first item ref}"`. The fallback is a best-effort
/// heuristic and can collide for distinct orders from the same customer
/// placed in quick succession.
pub fn derive_key(payload: &OrderPayload) -> String {
    if !payload.external_ref.is_empty() {
        return payload.external_ref.clone();
    }
    let first_item_ref = payload
        .items
        .first()
        .map(|i| i.external_ref.as_str())
        .unwrap_or("");
    format!("{}-{}", payload.customer.document.number, first_item_ref)
}
