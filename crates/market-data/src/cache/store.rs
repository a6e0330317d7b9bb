//! Thread-safe key/value store with adaptive TTL.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::key::cache_key;
use super::ttl::TtlPolicy;

/// Default cap on live entries.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// A stored payload and its bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub value: Value,
    pub prefix: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ttl: Duration,
    pub size_bytes: usize,
    pub access_count: u64,
    /// Monotonic deadline; the wall-clock `expires_at` is for reporting.
    expires: Instant,
    last_access: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
    evictions: u64,
    prefix_hits: HashMap<String, u64>,
}

/// Cache construction options.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Maximum number of entries; `None` leaves the cache bounded by TTL only.
    pub max_entries: Option<usize>,
    pub policy: TtlPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: Some(DEFAULT_MAX_ENTRIES),
            policy: TtlPolicy::default(),
        }
    }
}

/// Per-prefix slice of [`CacheStats`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PrefixStats {
    pub entries: usize,
    pub bytes: usize,
    pub hits: u64,
}

/// Snapshot of cache usage.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Live (non-expired) entries
    pub entries: usize,
    /// Expired entries not yet swept
    pub expired_pending: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Serialized size of live entries
    pub bytes: usize,
    pub by_prefix: BTreeMap<String, PrefixStats>,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Adaptive-TTL cache shared by every fetcher and router in the process.
///
/// All reads and writes, including the hit/miss counters, go through a single
/// mutex so that check-then-write sequences are atomic. The cache never
/// performs I/O, so the lock is never held across a network call.
///
/// `get` never fails: a missing or expired entry is a miss, and an entry
/// that has expired stays a miss until it is overwritten.
pub struct Cache {
    state: Mutex<CacheState>,
    policy: TtlPolicy,
    max_entries: Option<usize>,
}

impl Cache {
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            policy: config.policy,
            max_entries: config.max_entries,
        }
    }

    pub fn policy(&self) -> &TtlPolicy {
        &self.policy
    }

    /// Lock the state mutex, recovering from poison if necessary.
    ///
    /// A poisoned cache can at worst serve a stale counter; entries still
    /// carry their own deadlines.
    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Look up a value. Returns `None` on a miss or an expired entry.
    pub fn get(&self, prefix: &str, params: &[(&str, &str)]) -> Option<Value> {
        let key = cache_key(prefix, params);
        let now = Instant::now();
        let mut state = self.lock_state();

        let expired = match state.entries.get_mut(&key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.access_count += 1;
                entry.last_access = now;
                let value = entry.value.clone();
                state.hits += 1;
                *state.prefix_hits.entry(prefix.to_string()).or_insert(0) += 1;
                debug!("Cache hit for {}", key);
                return Some(value);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            state.entries.remove(&key);
            debug!("Cache entry {} expired", key);
        }
        state.misses += 1;
        None
    }

    /// Typed lookup. A payload that no longer deserializes is treated as a miss.
    pub fn get_json<T: DeserializeOwned>(&self, prefix: &str, params: &[(&str, &str)]) -> Option<T> {
        let value = self.get(prefix, params)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                warn!("Discarding undecodable cache entry under '{}': {}", prefix, e);
                None
            }
        }
    }

    /// Store a value under the adaptive TTL for its prefix. Returns the TTL used.
    pub fn set(&self, prefix: &str, value: Value, params: &[(&str, &str)]) -> Duration {
        let size = value.to_string().len();
        let ttl = self.policy.adaptive_ttl(prefix, size, Utc::now());
        self.insert(prefix, value, params, ttl, size);
        ttl
    }

    /// Store a value with an explicit TTL (still subject to the ceiling).
    pub fn set_with_ttl(
        &self,
        prefix: &str,
        value: Value,
        params: &[(&str, &str)],
        ttl: Duration,
    ) -> Duration {
        let size = value.to_string().len();
        let ttl = self.policy.clamp(ttl);
        self.insert(prefix, value, params, ttl, size);
        ttl
    }

    /// Typed store with the adaptive TTL. Returns `None` if `value` cannot
    /// be serialized, in which case nothing is stored.
    pub fn set_json<T: Serialize>(
        &self,
        prefix: &str,
        value: &T,
        params: &[(&str, &str)],
    ) -> Option<Duration> {
        match serde_json::to_value(value) {
            Ok(json) => Some(self.set(prefix, json, params)),
            Err(e) => {
                warn!("Refusing to cache unserializable value under '{}': {}", prefix, e);
                None
            }
        }
    }

    /// Typed store with an explicit TTL.
    pub fn set_json_with_ttl<T: Serialize>(
        &self,
        prefix: &str,
        value: &T,
        params: &[(&str, &str)],
        ttl: Duration,
    ) -> Option<Duration> {
        match serde_json::to_value(value) {
            Ok(json) => Some(self.set_with_ttl(prefix, json, params, ttl)),
            Err(e) => {
                warn!("Refusing to cache unserializable value under '{}': {}", prefix, e);
                None
            }
        }
    }

    fn insert(&self, prefix: &str, value: Value, params: &[(&str, &str)], ttl: Duration, size: usize) {
        let key = cache_key(prefix, params);
        let now = Instant::now();
        let created_at = Utc::now();
        let expires_at = created_at
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::seconds(1));

        let entry = CacheEntry {
            key: key.clone(),
            value,
            prefix: prefix.to_string(),
            created_at,
            expires_at,
            ttl,
            size_bytes: size,
            access_count: 0,
            expires: now + ttl,
            last_access: now,
        };

        let mut state = self.lock_state();
        if !state.entries.contains_key(&key) {
            self.make_room(&mut state, now);
        }
        debug!("Cache set {} (ttl {:?}, {} bytes)", key, ttl, size);
        state.entries.insert(key, entry);
    }

    /// Ensure there is space for one more entry. Expired entries go first,
    /// then the least recently accessed one.
    fn make_room(&self, state: &mut CacheState, now: Instant) {
        let Some(max) = self.max_entries else {
            return;
        };
        if state.entries.len() < max {
            return;
        }

        let before = state.entries.len();
        state.entries.retain(|_, e| !e.is_expired(now));
        if state.entries.len() < before {
            return;
        }

        let victim = state
            .entries
            .values()
            .min_by_key(|e| e.last_access)
            .map(|e| e.key.clone());
        if let Some(victim) = victim {
            state.entries.remove(&victim);
            state.evictions += 1;
            debug!("Cache full ({} entries), evicted {}", max, victim);
        }
    }

    /// Remove entries whose key contains `pattern`, or everything for `None`.
    pub fn invalidate(&self, pattern: Option<&str>) -> usize {
        let mut state = self.lock_state();
        let removed = match pattern {
            None => {
                let count = state.entries.len();
                state.entries.clear();
                count
            }
            Some(pattern) => {
                let before = state.entries.len();
                state.entries.retain(|key, _| !key.contains(pattern));
                before - state.entries.len()
            }
        };
        debug!("Cache invalidated {} entries (pattern: {:?})", removed, pattern);
        removed
    }

    /// Physically remove expired entries. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.lock_state();
        let before = state.entries.len();
        state.entries.retain(|_, e| !e.is_expired(now));
        before - state.entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let state = self.lock_state();

        let mut stats = CacheStats {
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            ..Default::default()
        };

        for entry in state.entries.values() {
            if entry.is_expired(now) {
                stats.expired_pending += 1;
                continue;
            }
            stats.entries += 1;
            stats.bytes += entry.size_bytes;
            let slot = stats.by_prefix.entry(entry.prefix.clone()).or_default();
            slot.entries += 1;
            slot.bytes += entry.size_bytes;
        }

        for (prefix, hits) in &state.prefix_hits {
            stats.by_prefix.entry(prefix.clone()).or_default().hits = *hits;
        }

        stats
    }

    /// Copy of a live entry's bookkeeping, for diagnostics.
    pub fn entry(&self, prefix: &str, params: &[(&str, &str)]) -> Option<CacheEntry> {
        let key = cache_key(prefix, params);
        let state = self.lock_state();
        state
            .entries
            .get(&key)
            .filter(|e| !e.is_expired(Instant::now()))
            .cloned()
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.lock_state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}
