use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const MAX_ATTEMPTS: usize = 5;
const WINDOW_SECS: u64 = 900; // 15 minutes

/// Failed-login counter per client IP, shared across workers.
#[derive(Clone)]
pub struct RateLimiter {
    attempts: Arc<Mutex<HashMap<IpAddr, Vec<Instant>>>>,
    max_attempts: usize,
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_limits(MAX_ATTEMPTS, Duration::from_secs(WINDOW_SECS))
    }

    pub fn with_limits(max_attempts: usize, window: Duration) -> Self {
        Self {
            attempts: Arc::new(Mutex::new(HashMap::new())),
            max_attempts,
            window,
        }
    }

    /// Check if the given IP is rate-limited. Returns true if blocked.
    /// Also lazily cleans up stale entries for the checked IP.
    pub fn is_blocked(&self, ip: IpAddr) -> bool {
        let mut map = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        if let Some(timestamps) = map.get_mut(&ip) {
            timestamps.retain(|t| now.duration_since(*t) < self.window);
            if timestamps.is_empty() {
                map.remove(&ip);
                return false;
            }
            timestamps.len() >= self.max_attempts
        } else {
            false
        }
    }

    /// Record a failed login attempt for the given IP.
    pub fn record_failure(&self, ip: IpAddr) {
        let mut map = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(ip).or_default().push(Instant::now());
    }

    /// Clear all recorded attempts for the given IP (call on successful login).
    pub fn clear(&self, ip: IpAddr) {
        let mut map = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(&ip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([10, 0, 0, last])
    }

    #[test]
    fn blocks_after_max_failures() {
        let limiter = RateLimiter::new();
        for _ in 0..4 {
            limiter.record_failure(ip(1));
        }
        assert!(!limiter.is_blocked(ip(1)));
        limiter.record_failure(ip(1));
        assert!(limiter.is_blocked(ip(1)));
        assert!(!limiter.is_blocked(ip(2)));
    }

    #[test]
    fn clear_resets_the_counter() {
        let limiter = RateLimiter::with_limits(1, Duration::from_secs(60));
        limiter.record_failure(ip(3));
        assert!(limiter.is_blocked(ip(3)));
        limiter.clear(ip(3));
        assert!(!limiter.is_blocked(ip(3)));
    }

    #[test]
    fn old_failures_expire() {
        let limiter = RateLimiter::with_limits(1, Duration::from_millis(20));
        limiter.record_failure(ip(4));
        assert!(limiter.is_blocked(ip(4)));
        std::thread::sleep(Duration::from_millis(40));
        assert!(!limiter.is_blocked(ip(4)));
    }
}
