use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Calls between sweeps that drop idle buckets.
const SWEEP_INTERVAL: u64 = 512;

/// Sliding-window limiter keyed by caller.
#[derive(Debug, Clone)]
pub struct ApiRateLimiter {
    window: Duration,
    max_requests: u32,
    trust_forwarded_for: bool,
    buckets: Arc<DashMap<String, Vec<Instant>>>,
    calls: Arc<AtomicU64>,
}

impl ApiRateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            trust_forwarded_for: false,
            buckets: Arc::new(DashMap::new()),
            calls: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    pub fn trusts_forwarded_for(&self) -> bool {
        self.trust_forwarded_for
    }

    /// Records a hit for `key` when under the limit. Returns whether the
    /// request may proceed and how many requests remain in the window.
    pub fn allow(&self, key: &str) -> (bool, u32) {
        self.allow_at(key, Instant::now())
    }

    fn allow_at(&self, key: &str, now: Instant) -> (bool, u32) {
        if self.calls.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            self.sweep(now);
        }

        let window = self.window;
        let mut entry = self.buckets.entry(key.to_string()).or_default();
        entry.retain(|instant| now.saturating_duration_since(*instant) < window);

        let used = u32::try_from(entry.len()).unwrap_or(u32::MAX);
        let remaining = self.max_requests.saturating_sub(used);
        if remaining == 0 {
            return (false, 0);
        }

        entry.push(now);
        (true, remaining - 1)
    }

    /// Drops expired hits and every bucket left empty.
    fn sweep(&self, now: Instant) {
        let window = self.window;
        self.buckets.retain(|_, hits| {
            hits.retain(|instant| now.saturating_duration_since(*instant) < window);
            !hits.is_empty()
        });
    }

    /// Seconds until the oldest hit for `key` leaves the window.
    pub fn retry_after_secs(&self, key: &str) -> u64 {
        let now = Instant::now();
        let oldest = self
            .buckets
            .get(key)
            .and_then(|entry| entry.iter().min().copied());
        match oldest {
            Some(oldest) => self
                .window
                .saturating_sub(now.saturating_duration_since(oldest))
                .as_secs()
                .max(1),
            None => 1,
        }
    }

    pub fn limit(&self) -> u32 {
        self.max_requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_after_limit_within_window() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(60), 2);
        let now = Instant::now();
        assert_eq!(limiter.allow_at("user:a", now), (true, 1));
        assert_eq!(limiter.allow_at("user:a", now), (true, 0));
        assert_eq!(limiter.allow_at("user:a", now), (false, 0));
        assert!(limiter.allow_at("user:b", now).0);
    }

    #[test]
    fn window_slides_forward() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(10), 1);
        let start = Instant::now();
        assert!(limiter.allow_at("ip:1", start).0);
        assert!(!limiter.allow_at("ip:1", start + Duration::from_secs(5)).0);
        assert!(limiter.allow_at("ip:1", start + Duration::from_secs(11)).0);
    }

    #[test]
    fn retry_after_is_at_least_one_second() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(30), 1);
        assert_eq!(limiter.retry_after_secs("nobody"), 1);
        limiter.allow("someone");
        let retry = limiter.retry_after_secs("someone");
        assert!((1..=30).contains(&retry));
        assert_eq!(limiter.limit(), 1);
    }

    #[test]
    fn idle_buckets_are_evicted() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(10), 5);
        let start = Instant::now();
        for n in 0..SWEEP_INTERVAL - 1 {
            assert!(limiter.allow_at(&format!("ip:10.0.{}.{}", n / 256, n % 256), start).0);
        }
        assert_eq!(limiter.buckets.len() as u64, SWEEP_INTERVAL - 1);

        // The next call lands after the window and triggers a sweep.
        let later = start + Duration::from_secs(11);
        assert!(limiter.allow_at("ip:192.0.2.1", later).0);
        assert_eq!(limiter.buckets.len(), 1);
        assert!(limiter.buckets.contains_key("ip:192.0.2.1"));
    }

    #[test]
    fn sweep_keeps_buckets_with_live_hits() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(10), 5);
        let start = Instant::now();
        limiter.allow_at("ip:old", start);
        limiter.allow_at("ip:fresh", start + Duration::from_secs(8));

        limiter.sweep(start + Duration::from_secs(12));
        assert!(!limiter.buckets.contains_key("ip:old"));
        assert!(limiter.buckets.contains_key("ip:fresh"));
    }

    #[test]
    fn forwarded_for_is_untrusted_by_default() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(10), 5);
        assert!(!limiter.trusts_forwarded_for());
        assert!(limiter.trust_forwarded_for(true).trusts_forwarded_for());
    }
}
