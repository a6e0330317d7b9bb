//! Market data models
//!
//! This module contains the core data types for market data operations:
//! - `market` - Market type classification and timeframes
//! - `price` - Price series, current price and market info records
//! - `news` - Provider-native news items
//! - `status` - Provider health reporting

mod market;
mod news;
mod price;
mod status;

pub use market::{MarketType, Timeframe};
pub use news::{sort_by_recency, NewsItem};
pub use price::{CurrentPrice, MarketInfo, PricePoint, PriceSeries};
pub use status::{HealthLevel, ProviderStatus};
