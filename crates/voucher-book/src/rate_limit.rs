//! Per-caller rate limiting of generation requests

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::options::RateLimitOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests left in the current window
    pub remaining: u32,
    /// Time until the window resets
    pub retry_after: Duration,
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check_rate_limit(&self, caller_id: &str) -> RateLimitDecision;
}

struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window counter per caller
pub struct FixedWindowRateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl FixedWindowRateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_options(options: &RateLimitOptions) -> Self {
        Self::new(options.max_requests, Duration::from_secs(options.window_secs))
    }

    /// Count a request made at `now`.
    pub fn check_at(&self, caller_id: &str, now: Instant) -> RateLimitDecision {
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Only running windows are kept.
        windows.retain(|_, window| now.duration_since(window.started) < self.window);

        let window = windows
            .entry(caller_id.to_string())
            .or_insert(Window {
                started: now,
                count: 0,
            });

        let retry_after = self.window.saturating_sub(now.duration_since(window.started));
        if window.count >= self.max_requests {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                retry_after,
            };
        }

        window.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: self.max_requests - window.count,
            retry_after,
        }
    }

    #[cfg(test)]
    fn tracked_callers(&self) -> usize {
        match self.windows.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

#[async_trait]
impl RateLimiter for FixedWindowRateLimiter {
    async fn check_rate_limit(&self, caller_id: &str) -> RateLimitDecision {
        self.check_at(caller_id, Instant::now())
    }
}

/// Allows everything
pub struct Unlimited;

#[async_trait]
impl RateLimiter for Unlimited {
    async fn check_rate_limit(&self, _caller_id: &str) -> RateLimitDecision {
        RateLimitDecision {
            allowed: true,
            remaining: u32::MAX,
            retry_after: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_limit_and_resets() {
        let limiter = FixedWindowRateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();

        let first = limiter.check_at("alice", start);
        assert!(first.allowed);
        assert_eq!(first.remaining, 1);
        assert!(limiter.check_at("alice", start + Duration::from_secs(1)).allowed);

        let blocked = limiter.check_at("alice", start + Duration::from_secs(10));
        assert!(!blocked.allowed);
        assert_eq!(blocked.retry_after, Duration::from_secs(50));

        assert!(limiter.check_at("bob", start + Duration::from_secs(10)).allowed);
        assert!(limiter.check_at("alice", start + Duration::from_secs(60)).allowed);
    }

    #[test]
    fn expired_windows_are_dropped() {
        let limiter = FixedWindowRateLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();

        for n in 0..100 {
            limiter.check_at(&format!("caller-{n}"), start);
        }
        assert_eq!(limiter.tracked_callers(), 100);

        let later = start + Duration::from_secs(61);
        assert!(limiter.check_at("caller-0", later).allowed);
        assert_eq!(limiter.tracked_callers(), 1);
        assert!(!limiter.check_at("caller-0", later + Duration::from_secs(1)).allowed);
    }
}
