//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataProvider` trait that all providers implement
//! - Provider capabilities, rate limits and symbol formats
//! - Concrete providers: Binance, CoinGecko, Yahoo Finance, NewsAPI
//!
//! Providers receive symbols already adapted to their declared
//! [`SymbolFormat`]; the router does the adaptation before dispatch.

mod capabilities;
mod http;
mod traits;

pub mod binance;
pub mod coingecko;
pub mod newsapi;
pub mod yahoo;

pub use capabilities::{Capability, ProviderCapabilities, RateLimit, SymbolFormat};
pub use traits::MarketDataProvider;
