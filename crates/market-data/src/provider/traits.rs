//! Market data provider trait definitions.
//!
//! This module defines the core `MarketDataProvider` trait that all
//! price and news providers implement.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{CurrentPrice, MarketInfo, NewsItem, PriceSeries, ProviderStatus, Timeframe};

use super::capabilities::{Capability, ProviderCapabilities, RateLimit, SymbolFormat};

/// Trait for market data and news providers.
///
/// Implement this trait to add support for a new data source. Every
/// implementation must be safe to call concurrently; callers add no
/// synchronization of their own.
///
/// Operations a provider does not declare in its [`ProviderCapabilities`]
/// keep the default implementation, which returns
/// [`MarketDataError::NotSupported`].
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use pulsefeed_market_data::provider::{
///     Capability, MarketDataProvider, ProviderCapabilities, RateLimit,
/// };
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl MarketDataProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     fn capabilities(&self) -> ProviderCapabilities {
///         ProviderCapabilities {
///             markets: &[MarketType::Equities],
///             features: &[Capability::PriceSeries, Capability::CurrentPrice],
///         }
///     }
///
///     fn rate_limit(&self) -> RateLimit {
///         RateLimit::default()
///     }
///
///     // ... implement get_price_data and get_current_price
/// }
/// ```
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Should be a constant string like "BINANCE", "YAHOO", etc.
    /// Used for routing, logging, rate limiting and circuit breaker tracking.
    fn id(&self) -> &'static str;

    /// Describes the markets and operations this provider serves.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Rate limiting budget applied by the registry.
    fn rate_limit(&self) -> RateLimit;

    /// How symbols must be spelled before calling this provider.
    fn symbol_format(&self) -> SymbolFormat {
        SymbolFormat::PassThrough
    }

    /// Cheap syntactic check on a caller-supplied symbol.
    ///
    /// The default accepts 1-20 characters of ASCII letters, digits and the
    /// separators `/ - . = ^`.
    fn validate_symbol(&self, symbol: &str) -> bool {
        let symbol = symbol.trim();
        !symbol.is_empty()
            && symbol.len() <= 20
            && symbol
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '.' | '=' | '^'))
    }

    /// Whether the provider is configured well enough to be called.
    ///
    /// Providers that need credentials report `false` when they are missing.
    fn is_available(&self) -> bool {
        true
    }

    /// Descriptor-level status. The registry overlays circuit breaker and
    /// rate limiter state on top of this.
    fn get_status(&self) -> ProviderStatus {
        let caps = self.capabilities();
        let limit = self.rate_limit();
        ProviderStatus {
            name: self.id().to_string(),
            available: self.is_available(),
            circuit_state: "Closed".to_string(),
            capabilities: caps.features.to_vec(),
            markets: caps.markets.to_vec(),
            requests_per_minute: limit.requests_per_minute,
            remaining_requests: limit.burst as f64,
            message: None,
        }
    }

    /// Fetch up to `limit` candles of `timeframe`, ordered oldest first.
    ///
    /// `symbol` is already adapted to [`symbol_format`](Self::symbol_format).
    async fn get_price_data(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<PriceSeries, MarketDataError>;

    /// Fetch the latest traded price.
    async fn get_current_price(&self, symbol: &str) -> Result<CurrentPrice, MarketDataError>;

    /// Fetch 24h market statistics.
    async fn get_market_info(&self, symbol: &str) -> Result<MarketInfo, MarketDataError> {
        let _ = symbol;
        Err(self.not_supported(Capability::MarketInfo))
    }

    /// Fetch recent news, optionally about one symbol.
    async fn get_news(
        &self,
        symbol: Option<&str>,
        limit: usize,
    ) -> Result<Vec<NewsItem>, MarketDataError> {
        let _ = (symbol, limit);
        Err(self.not_supported(Capability::News))
    }

    /// Full-text news search.
    async fn search_news(&self, query: &str, limit: usize) -> Result<Vec<NewsItem>, MarketDataError> {
        let _ = (query, limit);
        Err(self.not_supported(Capability::Search))
    }

    #[doc(hidden)]
    fn not_supported(&self, capability: Capability) -> MarketDataError {
        MarketDataError::NotSupported {
            operation: capability.as_str().to_string(),
            provider: self.id().to_string(),
        }
    }
}
