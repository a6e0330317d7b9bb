//! Binance spot market data provider.
//!
//! Public REST endpoints, no API key required:
//! - Candles via /api/v3/klines
//! - Last price and 24h statistics via /api/v3/ticker/24hr
//!
//! Symbols are spelled base + quote, e.g. `BTCUSDT`.
//! API documentation: https://binance-docs.github.io/apidocs/spot/en/

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use log::debug;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::MarketDataError;
use crate::models::{CurrentPrice, MarketInfo, MarketType, PricePoint, PriceSeries, Timeframe};
use crate::provider::http;
use crate::provider::{
    Capability, MarketDataProvider, ProviderCapabilities, RateLimit, SymbolFormat,
};

const BASE_URL: &str = "https://api.binance.com";
const PROVIDER_ID: &str = "BINANCE";

/// Largest candle count a single klines request may ask for.
const MAX_KLINES: usize = 1000;

/// Response from /api/v3/ticker/24hr
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24h {
    symbol: String,
    last_price: String,
    price_change_percent: String,
    high_price: String,
    low_price: String,
    volume: String,
    close_time: i64,
}

/// Binance spot market data provider.
pub struct BinanceProvider {
    client: Client,
    base_url: String,
}

impl BinanceProvider {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    /// Point the provider at another host (testnet or a local stub).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: http::build_client(),
            base_url: base_url.into(),
        }
    }

    async fn ticker(&self, symbol: &str) -> Result<Ticker24h, MarketDataError> {
        let url = format!("{}/api/v3/ticker/24hr", self.base_url);
        let request = self.client.get(&url).query(&[("symbol", symbol)]);
        let body = http::send(PROVIDER_ID, request, Some(symbol)).await?;
        serde_json::from_str(&body).map_err(|e| MarketDataError::parse(PROVIDER_ID, e))
    }
}

impl Default for BinanceProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Binance encodes decimals as JSON strings.
fn decimal(value: &str) -> Result<Decimal, MarketDataError> {
    Decimal::from_str(value.trim())
        .map_err(|e| MarketDataError::parse(PROVIDER_ID, format!("'{}': {}", value, e)))
}

fn value_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => n.as_f64().and_then(|f| Decimal::try_from(f).ok()),
        _ => None,
    }
}

/// Parse a klines payload: an array of
/// `[open_time_ms, open, high, low, close, volume, close_time_ms, ...]`.
fn parse_klines(body: &str) -> Result<Vec<PricePoint>, MarketDataError> {
    let rows: Vec<Vec<Value>> =
        serde_json::from_str(body).map_err(|e| MarketDataError::parse(PROVIDER_ID, e))?;

    rows.iter()
        .map(|row| {
            if row.len() < 6 {
                return Err(MarketDataError::parse(
                    PROVIDER_ID,
                    format!("kline row has {} fields", row.len()),
                ));
            }
            let open_ms = row[0]
                .as_i64()
                .ok_or_else(|| MarketDataError::parse(PROVIDER_ID, "kline open time"))?;
            let timestamp = Utc
                .timestamp_millis_opt(open_ms)
                .single()
                .ok_or_else(|| MarketDataError::parse(PROVIDER_ID, "kline timestamp"))?;
            let field = |i: usize, name: &str| {
                value_decimal(&row[i])
                    .ok_or_else(|| MarketDataError::parse(PROVIDER_ID, format!("kline {}", name)))
            };

            Ok(PricePoint {
                timestamp,
                open: field(1, "open")?,
                high: field(2, "high")?,
                low: field(3, "low")?,
                close: field(4, "close")?,
                volume: value_decimal(&row[5]),
            })
        })
        .collect()
}

#[async_trait]
impl MarketDataProvider for BinanceProvider {
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
        // Binance allows 6000 request weight per minute; klines cost up to 5
        RateLimit {
            requests_per_minute: 1200,
            burst: 20,
        }
    }

    fn symbol_format(&self) -> SymbolFormat {
        SymbolFormat::QuoteSuffix("USDT")
    }

    async fn get_price_data(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<PriceSeries, MarketDataError> {
        let limit = limit.clamp(1, MAX_KLINES).to_string();
        debug!("Fetching {} {} klines for {} from Binance", limit, timeframe, symbol);

        let url = format!("{}/api/v3/klines", self.base_url);
        let request = self.client.get(&url).query(&[
            ("symbol", symbol),
            ("interval", timeframe.as_str()),
            ("limit", limit.as_str()),
        ]);
        let body = http::send(PROVIDER_ID, request, Some(symbol)).await?;

        let points = parse_klines(&body)?;
        if points.is_empty() {
            return Err(MarketDataError::NoData {
                provider: PROVIDER_ID.to_string(),
            });
        }

        Ok(PriceSeries::new(symbol, timeframe, PROVIDER_ID).with_points(points))
    }

    async fn get_current_price(&self, symbol: &str) -> Result<CurrentPrice, MarketDataError> {
        let ticker = self.ticker(symbol).await?;

        Ok(CurrentPrice {
            symbol: ticker.symbol,
            price: decimal(&ticker.last_price)?,
            currency: "USDT".to_string(),
            change_percent: decimal(&ticker.price_change_percent).ok(),
            timestamp: Utc
                .timestamp_millis_opt(ticker.close_time)
                .single()
                .unwrap_or_else(Utc::now),
            source: PROVIDER_ID.to_string(),
        })
    }

    async fn get_market_info(&self, symbol: &str) -> Result<MarketInfo, MarketDataError> {
        let ticker = self.ticker(symbol).await?;

        Ok(MarketInfo {
            symbol: ticker.symbol,
            last_price: Some(decimal(&ticker.last_price)?),
            high_24h: decimal(&ticker.high_price).ok(),
            low_24h: decimal(&ticker.low_price).ok(),
            volume_24h: decimal(&ticker.volume).ok(),
            change_percent_24h: decimal(&ticker.price_change_percent).ok(),
            source: PROVIDER_ID.to_string(),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_klines() {
        let body = r#"[
            [1704067200000, "42000.10", "42500.00", "41900.00", "42300.50", "123.456", 1704070799999, "0", 10, "0", "0", "0"],
            [1704070800000, "42300.50", "42400.00", "42100.00", "42150.00", "98.7", 1704074399999, "0", 8, "0", "0", "0"]
        ]"#;

        let points = parse_klines(body).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].open, dec!(42000.10));
        assert_eq!(points[0].close, dec!(42300.50));
        assert_eq!(points[0].volume, Some(dec!(123.456)));
        assert_eq!(points[1].timestamp.timestamp(), 1704070800);
    }

    #[test]
    fn test_parse_klines_rejects_short_rows() {
        let err = parse_klines(r#"[[1704067200000, "1"]]"#).unwrap_err();
        assert!(matches!(err, MarketDataError::Parse { .. }));
    }

    #[test]
    fn test_parse_klines_empty() {
        assert!(parse_klines("[]").unwrap().is_empty());
    }

    #[test]
    fn test_ticker_parsing() {
        let json = r#"{
            "symbol": "BTCUSDT",
            "priceChange": "-94.99",
            "priceChangePercent": "-0.223",
            "lastPrice": "42300.10",
            "highPrice": "42800.00",
            "lowPrice": "41800.00",
            "volume": "25000.5",
            "quoteVolume": "1057000000.0",
            "closeTime": 1704067200000
        }"#;

        let ticker: Ticker24h = serde_json::from_str(json).unwrap();
        assert_eq!(ticker.symbol, "BTCUSDT");
        assert_eq!(decimal(&ticker.last_price).unwrap(), dec!(42300.10));
        assert_eq!(decimal(&ticker.price_change_percent).unwrap(), dec!(-0.223));
    }

    #[test]
    fn test_descriptor() {
        let provider = BinanceProvider::new();
        assert_eq!(provider.id(), "BINANCE");
        assert_eq!(provider.symbol_format(), SymbolFormat::QuoteSuffix("USDT"));
        assert!(provider.capabilities().covers(MarketType::Crypto));
        assert!(!provider.capabilities().supports(Capability::News));
        assert!(provider.validate_symbol("BTCUSDT"));
        assert!(!provider.validate_symbol("BTC USDT"));
    }
}
