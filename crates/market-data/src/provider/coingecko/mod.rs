//! CoinGecko crypto market data provider.
//!
//! Uses the public v3 API:
//! - Candles via /coins/{id}/ohlc
//! - Spot price via /simple/price
//! - Market statistics via /coins/markets
//!
//! Symbols are CoinGecko coin ids (`bitcoin`, `ethereum`), not tickers.
//! The public tier allows roughly 30 calls per minute.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use log::debug;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::MarketDataError;
use crate::models::{CurrentPrice, MarketInfo, MarketType, PricePoint, PriceSeries, Timeframe};
use crate::provider::http;
use crate::provider::{
    Capability, MarketDataProvider, ProviderCapabilities, RateLimit, SymbolFormat,
};

const BASE_URL: &str = "https://api.coingecko.com/api/v3";
const PROVIDER_ID: &str = "COINGECKO";
const VS_CURRENCY: &str = "usd";

/// `days` values accepted by the OHLC endpoint.
const OHLC_DAYS: [u32; 7] = [1, 7, 14, 30, 90, 180, 365];

/// One row of /coins/markets
#[derive(Debug, Deserialize)]
struct MarketRow {
    id: String,
    name: Option<String>,
    current_price: Option<f64>,
    market_cap: Option<f64>,
    total_volume: Option<f64>,
    high_24h: Option<f64>,
    low_24h: Option<f64>,
    price_change_percentage_24h: Option<f64>,
}

/// CoinGecko crypto market data provider.
pub struct CoinGeckoProvider {
    client: Client,
    base_url: String,
}

impl CoinGeckoProvider {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: http::build_client(),
            base_url: base_url.into(),
        }
    }
}

impl Default for CoinGeckoProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn to_decimal(value: f64) -> Option<Decimal> {
    Decimal::try_from(value).ok()
}

/// Smallest accepted `days` window that covers `limit` candles.
fn ohlc_days(timeframe: Timeframe, limit: usize) -> u32 {
    let candles = u64::try_from(limit.max(1)).unwrap_or(u64::MAX);
    let span_secs = timeframe.duration().as_secs().saturating_mul(candles);
    let needed = u32::try_from(span_secs.div_ceil(86_400)).unwrap_or(u32::MAX);
    OHLC_DAYS
        .iter()
        .copied()
        .find(|d| *d >= needed)
        .unwrap_or(OHLC_DAYS[OHLC_DAYS.len() - 1])
}

/// Parse an OHLC payload: an array of `[time_ms, open, high, low, close]`.
fn parse_ohlc(body: &str) -> Result<Vec<PricePoint>, MarketDataError> {
    let rows: Vec<[f64; 5]> =
        serde_json::from_str(body).map_err(|e| MarketDataError::parse(PROVIDER_ID, e))?;

    let points = rows
        .into_iter()
        .filter_map(|[ms, open, high, low, close]| {
            Some(PricePoint {
                timestamp: Utc.timestamp_millis_opt(ms as i64).single()?,
                open: to_decimal(open)?,
                high: to_decimal(high)?,
                low: to_decimal(low)?,
                close: to_decimal(close)?,
                volume: None,
            })
        })
        .collect();

    Ok(points)
}

/// Parse a /simple/price payload for one coin id.
fn parse_simple_price(body: &str, coin_id: &str) -> Result<(f64, Option<f64>), MarketDataError> {
    let prices: HashMap<String, HashMap<String, f64>> =
        serde_json::from_str(body).map_err(|e| MarketDataError::parse(PROVIDER_ID, e))?;

    let entry = prices
        .get(coin_id)
        .ok_or_else(|| MarketDataError::SymbolNotFound(coin_id.to_string()))?;
    let price = entry
        .get(VS_CURRENCY)
        .copied()
        .ok_or_else(|| MarketDataError::parse(PROVIDER_ID, "missing usd price"))?;
    let change = entry.get(&format!("{}_24h_change", VS_CURRENCY)).copied();

    Ok((price, change))
}

#[async_trait]
impl MarketDataProvider for CoinGeckoProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            markets: &[MarketType::Crypto],
            features: &[
                Capability::PriceSeries,
                Capability::CurrentPrice,
                Capability::MarketInfo,
            ],
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 30,
            burst: 5,
        }
    }

    fn symbol_format(&self) -> SymbolFormat {
        SymbolFormat::CoinId
    }

    fn validate_symbol(&self, symbol: &str) -> bool {
        !symbol.is_empty()
            && symbol
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    }

    async fn get_price_data(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<PriceSeries, MarketDataError> {
        let days = ohlc_days(timeframe, limit).to_string();
        debug!("Fetching {} days of OHLC for {} from CoinGecko", days, symbol);

        let url = format!("{}/coins/{}/ohlc", self.base_url, symbol);
        let request = self
            .client
            .get(&url)
            .query(&[("vs_currency", VS_CURRENCY), ("days", days.as_str())]);
        let body = http::send(PROVIDER_ID, request, Some(symbol)).await?;

        let points = parse_ohlc(&body)?;
        if points.is_empty() {
            return Err(MarketDataError::NoData {
                provider: PROVIDER_ID.to_string(),
            });
        }

        // Granularity is chosen by the API; keep the most recent `limit` candles
        let mut series = PriceSeries::new(symbol, timeframe, PROVIDER_ID).with_points(points);
        series.truncate_to_latest(limit);
        Ok(series)
    }

    async fn get_current_price(&self, symbol: &str) -> Result<CurrentPrice, MarketDataError> {
        let url = format!("{}/simple/price", self.base_url);
        let request = self.client.get(&url).query(&[
            ("ids", symbol),
            ("vs_currencies", VS_CURRENCY),
            ("include_24hr_change", "true"),
        ]);
        let body = http::send(PROVIDER_ID, request, Some(symbol)).await?;
        let (price, change) = parse_simple_price(&body, symbol)?;

        Ok(CurrentPrice {
            symbol: symbol.to_string(),
            price: to_decimal(price)
                .ok_or_else(|| MarketDataError::parse(PROVIDER_ID, "price out of range"))?,
            currency: "USD".to_string(),
            change_percent: change.and_then(to_decimal),
            timestamp: Utc::now(),
            source: PROVIDER_ID.to_string(),
        })
    }

    async fn get_market_info(&self, symbol: &str) -> Result<MarketInfo, MarketDataError> {
        let url = format!("{}/coins/markets", self.base_url);
        let request = self
            .client
            .get(&url)
            .query(&[("vs_currency", VS_CURRENCY), ("ids", symbol)]);
        let body = http::send(PROVIDER_ID, request, Some(symbol)).await?;

        let rows: Vec<MarketRow> =
            serde_json::from_str(&body).map_err(|e| MarketDataError::parse(PROVIDER_ID, e))?;
        let row = rows
            .into_iter()
            .find(|r| r.id == symbol)
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        Ok(MarketInfo {
            symbol: row.id,
            name: row.name,
            last_price: row.current_price.and_then(to_decimal),
            high_24h: row.high_24h.and_then(to_decimal),
            low_24h: row.low_24h.and_then(to_decimal),
            volume_24h: row.total_volume.and_then(to_decimal),
            market_cap: row.market_cap.and_then(to_decimal),
            change_percent_24h: row.price_change_percentage_24h.and_then(to_decimal),
            source: PROVIDER_ID.to_string(),
        })
    }
}
