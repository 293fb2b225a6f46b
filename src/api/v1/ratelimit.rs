use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Fixed-window request counter keyed by client address. Windows reset
/// lazily on the first request past the boundary.
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    counters: DashMap<String, (Instant, u32)>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            counters: DashMap::new(),
        }
    }

    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entry = self
            .counters
            .entry(key.to_string())
            .or_insert((now, 0));
        let (window_start, count) = *entry;

        if now.duration_since(window_start) >= self.window {
            *entry = (now, 1);
            return true;
        }
        if count >= self.max_requests {
            return false;
        }
        *entry = (window_start, count + 1);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denies_after_window_budget_is_spent() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 3);

        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("1.2.3.4"));
        assert!(!limiter.check("1.2.3.4"));

        // other clients have their own window
        assert!(limiter.check("5.6.7.8"));
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new(Duration::from_millis(20), 1);

        assert!(limiter.check("c"));
        assert!(!limiter.check("c"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check("c"));
    }
}
