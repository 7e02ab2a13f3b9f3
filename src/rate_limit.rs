use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Admission control for the order-submission endpoints.
///
/// Injected as a trait object so a shared-store implementation can replace
/// the process-local one for multi-instance deployments.
pub trait RateLimiter: Send + Sync {
    /// Returns `true` if a request under `key` is admitted.
    fn allow(&self, key: &str) -> bool;

    /// Drops state that can no longer influence admission decisions.
    fn prune(&self);
}

struct Bucket {
    count: u32,
    window_start: Instant,
}

/// A fixed-window per-key request counter.
///
/// The window resets at fixed boundaries rather than sliding, so a burst
/// around a boundary can admit close to twice the configured maximum.
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl FixedWindowLimiter {
    /// Creates a limiter admitting `max_requests` per `window` per key.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());

        match buckets.get_mut(key) {
            None => {
                buckets.insert(
                    key.to_string(),
                    Bucket {
                        count: 1,
                        window_start: now,
                    },
                );
                true
            }
            Some(bucket) => {
                if now.duration_since(bucket.window_start) > self.window {
                    bucket.count = 1;
                    bucket.window_start = now;
                    true
                } else {
                    bucket.count += 1;
                    bucket.count <= self.max_requests
                }
            }
        }
    }

    fn prune_at(&self, now: Instant) {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        buckets.retain(|_, bucket| now.duration_since(bucket.window_start) <= self.window);
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn prune(&self) {
        self.prune_at(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eleventh_request_in_window_is_rejected() {
        let limiter = FixedWindowLimiter::new(10, Duration::from_secs(60));
        let now = Instant::now();

        for _ in 0..10 {
            assert!(limiter.allow_at("1.2.3.4", now));
        }
        assert!(!limiter.allow_at("1.2.3.4", now));
    }

    #[test]
    fn key_is_admitted_again_after_window_rolls_over() {
        let limiter = FixedWindowLimiter::new(10, Duration::from_secs(60));
        let start = Instant::now();

        for _ in 0..11 {
            limiter.allow_at("1.2.3.4", start);
        }
        assert!(!limiter.allow_at("1.2.3.4", start));

        let later = start + Duration::from_secs(61);
        assert!(limiter.allow_at("1.2.3.4", later));
    }

    #[test]
    fn keys_are_counted_independently() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.allow_at("1.2.3.4", now));
        assert!(!limiter.allow_at("1.2.3.4", now));
        assert!(limiter.allow_at("5.6.7.8", now));
    }

    #[test]
    fn prune_drops_lapsed_buckets_only() {
        let limiter = FixedWindowLimiter::new(10, Duration::from_secs(60));
        let start = Instant::now();

        limiter.allow_at("old", start);
        limiter.allow_at("fresh", start + Duration::from_secs(50));
        limiter.prune_at(start + Duration::from_secs(70));

        let buckets = limiter.buckets.lock().unwrap();
        assert!(!buckets.contains_key("old"));
        assert!(buckets.contains_key("fresh"));
    }
}
