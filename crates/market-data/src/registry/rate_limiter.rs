//! Token bucket rate limiter.
//!
//! Each provider gets its own bucket sized from its declared [`RateLimit`]:
//! `burst` tokens of capacity, refilled at `requests_per_minute / 60` per
//! second. Unconfigured providers get a conservative default bucket.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::provider::RateLimit;

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    capacity: f64,
    /// Tokens per second
    rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(limit: &RateLimit) -> Self {
        let capacity = f64::from(limit.burst.max(1));
        Self {
            tokens: capacity,
            capacity,
            rate: f64::from(limit.requests_per_minute.max(1)) / 60.0,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Take a token, or report how long until one is available.
    fn take(&mut self, now: Instant) -> Result<(), Duration> {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64((1.0 - self.tokens) / self.rate))
        }
    }
}

#[derive(Debug, Default)]
struct LimiterState {
    limits: HashMap<String, RateLimit>,
    buckets: HashMap<String, TokenBucket>,
}

impl LimiterState {
    fn bucket(&mut self, provider: &str) -> &mut TokenBucket {
        let limit = self.limits.get(provider).cloned().unwrap_or_default();
        self.buckets
            .entry(provider.to_string())
            .or_insert_with(|| TokenBucket::new(&limit))
    }
}

/// Per-provider token bucket rate limiter.
pub struct RateLimiter {
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LimiterState::default()),
        }
    }

    /// Lock the limiter state, recovering from poison if necessary.
    ///
    /// A poisoned limiter can only over- or under-count a few tokens.
    fn lock_state(&self) -> MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Set the budget for a provider, resetting any existing bucket.
    pub fn configure(&self, provider: &str, limit: RateLimit) {
        let mut state = self.lock_state();
        state.buckets.remove(provider);
        state.limits.insert(provider.to_string(), limit);
    }

    /// Take a token without waiting.
    pub fn try_acquire(&self, provider: &str) -> bool {
        self.lock_state().bucket(provider).take(Instant::now()).is_ok()
    }

    /// Take a token, sleeping until one is available but never longer than
    /// `max_wait` in total. Returns `false` if the budget could not be met.
    pub async fn acquire_within(&self, provider: &str, max_wait: Duration) -> bool {
        let deadline = Instant::now() + max_wait;
        loop {
            let wait = match self.lock_state().bucket(provider).take(Instant::now()) {
                Ok(()) => {
                    debug!("Rate limiter: acquired token for '{}'", provider);
                    return true;
                }
                Err(wait) => wait,
            };

            if Instant::now() + wait > deadline {
                debug!(
                    "Rate limiter: '{}' needs {:?}, more than the remaining budget",
                    provider, wait
                );
                return false;
            }
            tokio::time::sleep(wait).await;
        }
    }

    /// Tokens currently in the provider's bucket.
    pub fn remaining(&self, provider: &str) -> f64 {
        let mut state = self.lock_state();
        let bucket = state.bucket(provider);
        bucket.refill(Instant::now());
        bucket.tokens
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit(requests_per_minute: u32, burst: u32) -> RateLimit {
        RateLimit {
            requests_per_minute,
            burst,
        }
    }

    #[test]
    fn test_burst_then_throttled() {
        let limiter = RateLimiter::new();
        limiter.configure("BINANCE", limit(60, 3));

        for _ in 0..3 {
            assert!(limiter.try_acquire("BINANCE"));
        }
        assert!(!limiter.try_acquire("BINANCE"));
    }

    #[test]
    fn test_unconfigured_provider_uses_default() {
        let limiter = RateLimiter::new();
        let default_burst = RateLimit::default().burst as usize;
        for _ in 0..default_burst {
            assert!(limiter.try_acquire("UNKNOWN"));
        }
        assert!(!limiter.try_acquire("UNKNOWN"));
    }

    #[test]
    fn test_providers_are_isolated() {
        let limiter = RateLimiter::new();
        limiter.configure("A", limit(60, 1));
        limiter.configure("B", limit(60, 1));

        assert!(limiter.try_acquire("A"));
        assert!(!limiter.try_acquire("A"));
        assert!(limiter.try_acquire("B"));
    }

    #[test]
    fn test_bucket_refills_over_time() {
        let mut bucket = TokenBucket::new(&limit(60, 1));
        let start = Instant::now();
        assert!(bucket.take(start).is_ok());
        assert!(bucket.take(start).is_err());

        // One token per second
        assert!(bucket.take(start + Duration::from_millis(1100)).is_ok());
    }

    #[test]
    fn test_remaining_after_use() {
        let limiter = RateLimiter::new();
        limiter.configure("COINGECKO", limit(30, 5));
        limiter.try_acquire("COINGECKO");
        limiter.try_acquire("COINGECKO");
        let remaining = limiter.remaining("COINGECKO");
        assert!((remaining - 3.0).abs() < 0.05);
    }

    #[tokio::test]
    async fn test_acquire_within_waits_for_refill() {
        let limiter = RateLimiter::new();
        // 100 tokens per second
        limiter.configure("FAST", limit(6000, 1));

        assert!(limiter.acquire_within("FAST", Duration::from_secs(1)).await);
        let start = Instant::now();
        assert!(limiter.acquire_within("FAST", Duration::from_secs(1)).await);
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[tokio::test]
    async fn test_acquire_within_gives_up() {
        let limiter = RateLimiter::new();
        // One token per minute
        limiter.configure("SLOW", limit(1, 1));

        assert!(limiter.acquire_within("SLOW", Duration::from_millis(10)).await);
        assert!(!limiter.acquire_within("SLOW", Duration::from_millis(10)).await);
    }
}
