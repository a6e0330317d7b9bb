//! In-memory response cache with adaptive TTL.
//!
//! Keys are derived from a readable prefix and a hashed, order-independent
//! parameter list. Entry lifetimes come from [`TtlPolicy`].

mod key;
mod store;
mod ttl;

pub use key::cache_key;
pub use store::{Cache, CacheConfig, CacheEntry, CacheStats, PrefixStats, DEFAULT_MAX_ENTRIES};
pub use ttl::{prefixes, TtlPolicy, MAX_TTL};
