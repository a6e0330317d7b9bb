//! PulseFeed Market Data Crate
//!
//! Provider-agnostic market data access with caching and routing.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Multiple market types: crypto, forex, equities, indices
//! - Multiple providers: Binance, CoinGecko, Yahoo Finance, NewsAPI
//! - An adaptive-TTL response cache shared by every component
//! - Rate limiting and circuit breaking per provider
//! - Market-type-aware routing with primary/fallback chains
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |     Symbol       |  ("BTC/USDT", "AAPL", "EURUSD")
//! +------------------+
//!          |
//!          v
//! +------------------+     +------------------+
//! |  ProviderRouter  | <-> |      Cache       |  (prefix + hashed params)
//! +------------------+     +------------------+
//!          |  classify -> route -> adapt symbol
//!          v
//! +------------------+
//! | ProviderRegistry |  (rate limiter, circuit breaker)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |    Provider      |  (Binance, CoinGecko, Yahoo, NewsAPI)
//! +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`Cache`] - Thread-safe adaptive-TTL cache
//! - [`MarketDataProvider`] - Uniform provider interface
//! - [`ProviderRegistry`] - Validated provider set with call guards
//! - [`ProviderRouter`] - Symbol classification and provider selection
//! - [`PriceSeries`], [`CurrentPrice`], [`MarketInfo`], [`NewsItem`] - Provider records

pub mod cache;
pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;
pub mod router;

pub use cache::{Cache, CacheConfig, CacheStats, TtlPolicy};
pub use errors::{MarketDataError, RetryClass};

pub use models::{
    sort_by_recency, CurrentPrice, HealthLevel, MarketInfo, MarketType, NewsItem, PricePoint,
    PriceSeries, ProviderStatus, Timeframe,
};

pub use provider::binance::BinanceProvider;
pub use provider::coingecko::CoinGeckoProvider;
pub use provider::newsapi::NewsApiProvider;
pub use provider::yahoo::YahooProvider;
pub use provider::{Capability, MarketDataProvider, ProviderCapabilities, RateLimit, SymbolFormat};

pub use registry::{CircuitBreaker, CircuitBreakerConfig, CircuitState, ProviderRegistry, RateLimiter};
pub use router::{classify, MarketRoute, ProviderRouter, ProviderSelection, RouteTable};
