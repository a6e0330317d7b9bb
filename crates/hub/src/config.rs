//! Environment-driven configuration.

use std::time::Duration;

use crate::errors::{HubError, Result};

/// Providers enabled when `PULSEFEED_PROVIDERS` is unset.
pub const DEFAULT_PROVIDERS: [&str; 4] = ["BINANCE", "COINGECKO", "YAHOO", "NEWSAPI"];

#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Concurrent fetch tasks
    pub workers: usize,
    /// Budget for one source or provider call
    pub task_deadline: Duration,
    /// Timeout for one HTTP exchange with a feed
    pub request_timeout: Duration,
    /// Cache capacity; `None` leaves it unbounded
    pub cache_max_entries: Option<usize>,
    /// Lifetime of aggregated news; `None` uses the adaptive TTL
    pub news_cache_ttl: Option<Duration>,
    /// Provider ids to register, in priority order
    pub providers: Vec<String>,
    pub newsapi_key: Option<String>,
    /// Seed the source registry with the built-in feed catalog
    pub default_sources: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            task_deadline: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
            cache_max_entries: Some(pulsefeed_market_data::cache::DEFAULT_MAX_ENTRIES),
            news_cache_ttl: None,
            providers: DEFAULT_PROVIDERS.iter().map(|p| p.to_string()).collect(),
            newsapi_key: None,
            default_sources: true,
        }
    }
}

impl HubConfig {
    /// Load `.env` if present, then read `PULSEFEED_*` variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Unset or blank keys keep their
    /// defaults; malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let workers = match get("PULSEFEED_WORKERS") {
            Some(raw) => parse_number::<usize>("PULSEFEED_WORKERS", &raw)?,
            None => defaults.workers,
        };
        if workers == 0 {
            return Err(HubError::Config("PULSEFEED_WORKERS must be at least 1".to_string()));
        }

        let task_deadline = match get("PULSEFEED_TASK_DEADLINE_SECS") {
            Some(raw) => parse_seconds("PULSEFEED_TASK_DEADLINE_SECS", &raw)?,
            None => defaults.task_deadline,
        };
        let request_timeout = match get("PULSEFEED_REQUEST_TIMEOUT_SECS") {
            Some(raw) => parse_seconds("PULSEFEED_REQUEST_TIMEOUT_SECS", &raw)?,
            None => defaults.request_timeout,
        };

        // 0 disables the cap
        let cache_max_entries = match get("PULSEFEED_CACHE_MAX_ENTRIES") {
            Some(raw) => match parse_number::<usize>("PULSEFEED_CACHE_MAX_ENTRIES", &raw)? {
                0 => None,
                n => Some(n),
            },
            None => defaults.cache_max_entries,
        };

        let news_cache_ttl = get("PULSEFEED_NEWS_CACHE_TTL_SECS")
            .map(|raw| parse_seconds("PULSEFEED_NEWS_CACHE_TTL_SECS", &raw))
            .transpose()?;

        let providers = match get("PULSEFEED_PROVIDERS") {
            Some(raw) => {
                let providers: Vec<String> = raw
                    .split(',')
                    .map(|p| p.trim().to_ascii_uppercase())
                    .filter(|p| !p.is_empty())
                    .collect();
                if let Some(unknown) = providers
                    .iter()
                    .find(|p| !DEFAULT_PROVIDERS.contains(&p.as_str()))
                {
                    return Err(HubError::Config(format!(
                        "Unknown provider '{}' in PULSEFEED_PROVIDERS",
                        unknown
                    )));
                }
                providers
            }
            None => defaults.providers,
        };

        let default_sources = match get("PULSEFEED_DEFAULT_SOURCES") {
            Some(raw) => parse_bool("PULSEFEED_DEFAULT_SOURCES", &raw)?,
            None => defaults.default_sources,
        };

        Ok(Self {
            workers,
            task_deadline,
            request_timeout,
            cache_max_entries,
            news_cache_ttl,
            providers,
            newsapi_key: get("PULSEFEED_NEWSAPI_KEY"),
            default_sources,
        })
    }

    pub fn provider_enabled(&self, id: &str) -> bool {
        self.providers.iter().any(|p| p.eq_ignore_ascii_case(id))
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| HubError::Config(format!("{} must be a non-negative integer, got '{}'", key, raw)))
}

fn parse_seconds(key: &str, raw: &str) -> Result<Duration> {
    let secs: u64 = parse_number(key, raw)?;
    if secs == 0 {
        return Err(HubError::Config(format!("{} must be greater than zero", key)));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(HubError::Config(format!("{} must be a boolean, got '{}'", key, raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<HubConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        HubConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.workers, 5);
        assert_eq!(config.task_deadline, Duration::from_secs(30));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.cache_max_entries, Some(10_000));
        assert_eq!(config.news_cache_ttl, None);
        assert_eq!(config.providers.len(), 4);
        assert!(config.newsapi_key.is_none());
        assert!(config.default_sources);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("PULSEFEED_WORKERS", "8"),
            ("PULSEFEED_TASK_DEADLINE_SECS", "12"),
            ("PULSEFEED_CACHE_MAX_ENTRIES", "0"),
            ("PULSEFEED_NEWS_CACHE_TTL_SECS", "120"),
            ("PULSEFEED_PROVIDERS", "yahoo, binance"),
            ("PULSEFEED_NEWSAPI_KEY", "  secret "),
            ("PULSEFEED_DEFAULT_SOURCES", "off"),
        ])
        .unwrap();

        assert_eq!(config.workers, 8);
        assert_eq!(config.task_deadline, Duration::from_secs(12));
        assert_eq!(config.cache_max_entries, None);
        assert_eq!(config.news_cache_ttl, Some(Duration::from_secs(120)));
        assert_eq!(config.providers, vec!["YAHOO", "BINANCE"]);
        assert!(config.provider_enabled("binance"));
        assert!(!config.provider_enabled("COINGECKO"));
        assert_eq!(config.newsapi_key.as_deref(), Some("secret"));
        assert!(!config.default_sources);
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let cases: &[(&str, &str)] = &[
            ("PULSEFEED_WORKERS", "0"),
            ("PULSEFEED_WORKERS", "many"),
            ("PULSEFEED_TASK_DEADLINE_SECS", "-1"),
            ("PULSEFEED_REQUEST_TIMEOUT_SECS", "0"),
            ("PULSEFEED_PROVIDERS", "YAHOO,BLOOMBERG"),
            ("PULSEFEED_DEFAULT_SOURCES", "maybe"),
        ];
        for (key, value) in cases {
            let result = config(&[(*key, *value)]);
            assert!(
                matches!(result, Err(HubError::Config(_))),
                "{}={} was accepted",
                key,
                value
            );
        }
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let config = config(&[("PULSEFEED_WORKERS", "  "), ("PULSEFEED_NEWSAPI_KEY", "")]).unwrap();
        assert_eq!(config.workers, 5);
        assert!(config.newsapi_key.is_none());
    }
}
