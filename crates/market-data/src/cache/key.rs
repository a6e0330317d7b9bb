//! Deterministic cache key derivation.

/// Derive the cache key for a prefix and a set of query parameters.
///
/// Parameters are sorted before hashing, so the key does not depend on the
/// order in which the caller listed them. The prefix stays readable in the
/// key so that pattern invalidation can target a whole category.
///
/// ```
/// use pulsefeed_market_data::cache::cache_key;
///
/// let a = cache_key("price_series", &[("symbol", "BTC"), ("timeframe", "1h")]);
/// let b = cache_key("price_series", &[("timeframe", "1h"), ("symbol", "BTC")]);
/// assert_eq!(a, b);
/// assert!(a.starts_with("price_series:"));
/// ```
pub fn cache_key(prefix: &str, params: &[(&str, &str)]) -> String {
    let mut pairs = params.to_vec();
    pairs.sort_unstable();

    let mut raw = String::with_capacity(prefix.len() + pairs.len() * 16);
    raw.push_str(prefix);
    // Length prefixes keep separators inside names or values unambiguous
    for (name, value) in pairs {
        raw.push_str(&format!("|{}:{}={}:{}", name.len(), name, value.len(), value));
    }

    format!("{}:{:x}", prefix, md5::compute(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_without_params() {
        let key = cache_key("status", &[]);
        assert!(key.starts_with("status:"));
        assert_eq!(key, cache_key("status", &[]));
    }

    #[test]
    fn test_different_values_give_different_keys() {
        let a = cache_key("current_price", &[("symbol", "BTC")]);
        let b = cache_key("current_price", &[("symbol", "ETH")]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_prefix_is_part_of_identity() {
        let a = cache_key("news", &[("limit", "10")]);
        let b = cache_key("feed", &[("limit", "10")]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_separator_prevents_collisions() {
        let a = cache_key("p", &[("ab", "c")]);
        let b = cache_key("p", &[("a", "bc")]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_embedded_separators_do_not_collide() {
        let packed = cache_key("news", &[("a", "1|b=2")]);
        let split = cache_key("news", &[("a", "1"), ("b", "2")]);
        assert_ne!(packed, split);

        let shifted = cache_key("news", &[("a=1", "")]);
        let plain = cache_key("news", &[("a", "1")]);
        assert_ne!(shifted, plain);
    }
}
