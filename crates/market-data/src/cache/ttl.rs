//! Adaptive TTL policy.
//!
//! Base TTLs follow the volatility of the data: ticks go stale in a minute,
//! news within a quarter hour, symbol metadata in hours. The base is then
//! stretched for large payloads and for quiet market periods, and finally
//! clamped so nothing is served more than two hours old.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};

/// Well-known cache prefixes.
pub mod prefixes {
    pub const CURRENT_PRICE: &str = "current_price";
    pub const PRICE_SERIES: &str = "price_series";
    pub const MARKET_INFO: &str = "market_info";
    pub const NEWS: &str = "news";
    pub const FEED: &str = "feed";
    pub const SEARCH: &str = "search";
    pub const SYMBOL_INFO: &str = "symbol_info";
}

/// Hard ceiling on any entry's lifetime.
pub const MAX_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// TTL for prefixes not in the taxonomy.
const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Payloads above this size get the large-payload boost.
const LARGE_PAYLOAD_BYTES: usize = 50 * 1024;
const LARGE_PAYLOAD_FACTOR: f64 = 1.2;

const WEEKEND_FACTOR: f64 = 2.0;
const OFF_HOURS_FACTOR: f64 = 1.5;

/// Main trading window in UTC hours, [open, close).
const SESSION_OPEN_HOUR_UTC: u32 = 13;
const SESSION_CLOSE_HOUR_UTC: u32 = 21;

/// Computes entry lifetimes from the prefix, payload size and wall clock.
#[derive(Clone, Debug)]
pub struct TtlPolicy {
    base: HashMap<String, Duration>,
    default_ttl: Duration,
    ceiling: Duration,
}

impl TtlPolicy {
    pub fn new() -> Self {
        let base = [
            (prefixes::CURRENT_PRICE, 60),
            (prefixes::PRICE_SERIES, 5 * 60),
            (prefixes::MARKET_INFO, 60 * 60),
            (prefixes::NEWS, 10 * 60),
            (prefixes::FEED, 15 * 60),
            (prefixes::SEARCH, 15 * 60),
            (prefixes::SYMBOL_INFO, 2 * 60 * 60),
        ]
        .into_iter()
        .map(|(prefix, secs)| (prefix.to_string(), Duration::from_secs(secs)))
        .collect();

        Self {
            base,
            default_ttl: DEFAULT_TTL,
            ceiling: MAX_TTL,
        }
    }

    /// Override the base TTL of one prefix.
    pub fn with_base_ttl(mut self, prefix: impl Into<String>, ttl: Duration) -> Self {
        self.base.insert(prefix.into(), ttl);
        self
    }

    pub fn base_ttl(&self, prefix: &str) -> Duration {
        self.base.get(prefix).copied().unwrap_or(self.default_ttl)
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// TTL for a payload of `size_bytes` stored under `prefix` at `now`.
    pub fn adaptive_ttl(&self, prefix: &str, size_bytes: usize, now: DateTime<Utc>) -> Duration {
        let mut secs = self.base_ttl(prefix).as_secs_f64();

        if size_bytes > LARGE_PAYLOAD_BYTES {
            secs *= LARGE_PAYLOAD_FACTOR;
        }

        if is_weekend(now) {
            secs *= WEEKEND_FACTOR;
        } else if is_off_hours(now) {
            secs *= OFF_HOURS_FACTOR;
        }

        self.clamp(Duration::from_millis((secs * 1000.0).round() as u64))
    }

    /// Apply the ceiling; a zero TTL becomes the smallest positive one.
    pub fn clamp(&self, ttl: Duration) -> Duration {
        ttl.clamp(Duration::from_millis(1), self.ceiling)
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::new()
    }
}

fn is_weekend(now: DateTime<Utc>) -> bool {
    matches!(now.weekday(), Weekday::Sat | Weekday::Sun)
}

fn is_off_hours(now: DateTime<Utc>) -> bool {
    let hour = now.hour();
    !(SESSION_OPEN_HOUR_UTC..SESSION_CLOSE_HOUR_UTC).contains(&hour)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // Tuesday 2024-01-02
    fn weekday_at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_base_ttl_taxonomy() {
        let policy = TtlPolicy::new();
        assert_eq!(policy.base_ttl(prefixes::CURRENT_PRICE), Duration::from_secs(60));
        assert_eq!(policy.base_ttl(prefixes::NEWS), Duration::from_secs(600));
        assert_eq!(policy.base_ttl("unknown"), DEFAULT_TTL);
    }

    #[test]
    fn test_session_hours_use_base() {
        let policy = TtlPolicy::new();
        let ttl = policy.adaptive_ttl(prefixes::NEWS, 100, weekday_at(15));
        assert_eq!(ttl, Duration::from_secs(600));
    }

    #[test]
    fn test_large_payload_boost() {
        let policy = TtlPolicy::new();
        let ttl = policy.adaptive_ttl(prefixes::NEWS, LARGE_PAYLOAD_BYTES + 1, weekday_at(15));
        assert_eq!(ttl, Duration::from_secs(720));
    }

    #[test]
    fn test_off_hours_boost() {
        let policy = TtlPolicy::new();
        let ttl = policy.adaptive_ttl(prefixes::NEWS, 100, weekday_at(2));
        assert_eq!(ttl, Duration::from_secs(900));
    }

    #[test]
    fn test_weekend_boost() {
        let policy = TtlPolicy::new();
        // Saturday
        let saturday = Utc.with_ymd_and_hms(2024, 1, 6, 15, 0, 0).unwrap();
        let ttl = policy.adaptive_ttl(prefixes::NEWS, 100, saturday);
        assert_eq!(ttl, Duration::from_secs(1200));
    }

    #[test]
    fn test_ceiling_applies() {
        let policy = TtlPolicy::new();
        let saturday = Utc.with_ymd_and_hms(2024, 1, 6, 3, 0, 0).unwrap();
        let ttl = policy.adaptive_ttl(prefixes::SYMBOL_INFO, LARGE_PAYLOAD_BYTES * 2, saturday);
        assert_eq!(ttl, MAX_TTL);
    }

    #[test]
    fn test_clamp_zero() {
        let policy = TtlPolicy::new();
        assert_eq!(policy.clamp(Duration::ZERO), Duration::from_millis(1));
    }
}
