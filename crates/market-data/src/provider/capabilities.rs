//! Provider capabilities, rate limiting and symbol format descriptors.
//!
//! Providers declare what they can do up front; the registry, router and
//! manager consult these declarations instead of probing at call time.

use serde::{Deserialize, Serialize};

use crate::models::MarketType;

/// One operation a provider may implement.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    PriceSeries,
    CurrentPrice,
    MarketInfo,
    News,
    Search,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PriceSeries => "price_series",
            Self::CurrentPrice => "current_price",
            Self::MarketInfo => "market_info",
            Self::News => "news",
            Self::Search => "search",
        }
    }
}

/// Describes the capabilities of a provider.
///
/// Used by the registry to validate registrations and by the router and
/// manager to pick providers for an operation.
#[derive(Clone, Debug)]
pub struct ProviderCapabilities {
    /// Market types this provider can serve.
    pub markets: &'static [MarketType],

    /// Operations this provider implements.
    pub features: &'static [Capability],
}

impl ProviderCapabilities {
    pub fn supports(&self, capability: Capability) -> bool {
        self.features.contains(&capability)
    }

    pub fn covers(&self, market: MarketType) -> bool {
        self.markets.contains(&market)
    }
}

/// Rate limiting budget for a provider.
///
/// Controls how aggressively we can call a provider to avoid
/// hitting their rate limits and getting blocked.
#[derive(Clone, Debug)]
pub struct RateLimit {
    /// Maximum requests allowed per minute.
    pub requests_per_minute: u32,

    /// Requests that may be issued back to back before throttling.
    pub burst: u32,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            burst: 5,
        }
    }
}

/// How a provider expects symbols to be spelled on the wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SymbolFormat {
    /// Use the caller's symbol as-is; the provider maps it internally.
    PassThrough,

    /// Base asset followed by a quote currency, e.g. `BTCUSDT`.
    QuoteSuffix(&'static str),

    /// Internal coin identifier, e.g. `bitcoin`.
    CoinId,
}
