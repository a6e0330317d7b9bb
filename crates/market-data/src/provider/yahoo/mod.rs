//! Yahoo Finance market data provider.
//!
//! This provider uses the Yahoo Finance API to fetch market data for:
//! - Equities/ETFs (e.g., AAPL, SHOP.TO)
//! - Indices (e.g., ^GSPC)
//! - Cryptocurrencies (e.g., BTC-USD)
//! - Foreign exchange rates (e.g., EURUSD=X)
//!
//! Headlines come from the search endpoint's news section.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use log::{debug, warn};
use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use urlencoding::encode;
use yahoo_finance_api as yahoo;

use crate::errors::MarketDataError;
use crate::models::{
    CurrentPrice, MarketInfo, MarketType, NewsItem, PricePoint, PriceSeries, Timeframe,
};
use crate::provider::{Capability, MarketDataProvider, ProviderCapabilities, RateLimit};
use crate::router::{classify, symbols};

const PROVIDER_ID: &str = "YAHOO";

/// Query used when news is requested without a symbol.
const GENERAL_NEWS_QUERY: &str = "stock market";

/// Range strings accepted by the chart endpoint, with their span in days.
const RANGES: [(&str, u64); 9] = [
    ("1d", 1),
    ("5d", 5),
    ("1mo", 30),
    ("3mo", 90),
    ("6mo", 180),
    ("1y", 365),
    ("2y", 730),
    ("5y", 1825),
    ("10y", 3650),
];

/// Yahoo Finance market data provider.
///
/// Symbols are passed through by the router and translated here into
/// Yahoo's own spelling.
pub struct YahooProvider {
    connector: yahoo::YahooConnector,
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider.
    pub fn new() -> Result<Self, MarketDataError> {
        let connector =
            yahoo::YahooConnector::new().map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to initialize Yahoo connector: {}", e),
            })?;
        Ok(Self { connector })
    }

    fn map_error(symbol: &str, e: yahoo::YahooError) -> MarketDataError {
        if matches!(e, yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult) {
            MarketDataError::SymbolNotFound(symbol.to_string())
        } else {
            MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: e.to_string(),
            }
        }
    }

    /// Fetch raw candles for a Yahoo symbol.
    async fn fetch_quotes(
        &self,
        yahoo_symbol: &str,
        interval: &str,
        range: &str,
    ) -> Result<Vec<yahoo::Quote>, MarketDataError> {
        let response = self
            .connector
            .get_quote_range(yahoo_symbol, interval, range)
            .await
            .map_err(|e| Self::map_error(yahoo_symbol, e))?;

        match response.quotes() {
            Ok(quotes) => Ok(quotes),
            Err(yahoo::YahooError::NoQuotes) => Err(MarketDataError::NoData {
                provider: PROVIDER_ID.to_string(),
            }),
            Err(e) => Err(Self::map_error(yahoo_symbol, e)),
        }
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<NewsItem>, MarketDataError> {
        let encoded_query = encode(query);
        debug!("Searching Yahoo news for '{}'", query);

        let result = self
            .connector
            .search_ticker(&encoded_query)
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: e.to_string(),
            })?;

        let items = result
            .news
            .iter()
            .take(limit)
            .map(|item| {
                let mut news = NewsItem::new(&item.title, &item.link, &item.publisher, PROVIDER_ID);
                if let Some(published) = Utc.timestamp_opt(item.provider_publish_time as i64, 0).single() {
                    news = news.with_published_at(published);
                }
                news
            })
            .collect();

        Ok(items)
    }
}

/// Yahoo spelling of a caller symbol.
fn to_yahoo_symbol(symbol: &str) -> String {
    let upper = symbol.trim().to_ascii_uppercase();
    if upper.ends_with("=X") || upper.starts_with('^') {
        return upper;
    }
    match classify(&upper) {
        MarketType::Crypto => format!("{}-USD", symbols::crypto_base(&upper)),
        MarketType::Forex => format!("{}=X", upper.replace('/', "")),
        MarketType::Index => symbols::yahoo_index(&upper)
            .map(str::to_string)
            .unwrap_or(upper),
        MarketType::Equities => upper,
    }
}

/// Chart interval for a timeframe, and how many native candles make one.
///
/// Yahoo has no 4h interval, so 4h candles are built from hourly ones.
fn interval_for(timeframe: Timeframe) -> (&'static str, usize) {
    match timeframe {
        Timeframe::M1 => ("1m", 1),
        Timeframe::M5 => ("5m", 1),
        Timeframe::M15 => ("15m", 1),
        Timeframe::H1 => ("1h", 1),
        Timeframe::H4 => ("1h", 4),
        Timeframe::D1 => ("1d", 1),
        Timeframe::W1 => ("1wk", 1),
    }
}

/// Smallest chart range covering `limit` candles, with slack for closed
/// sessions.
fn range_for(timeframe: Timeframe, limit: usize) -> &'static str {
    let candles = u64::try_from(limit.max(1)).unwrap_or(u64::MAX);
    let span_secs = timeframe.duration().as_secs().saturating_mul(candles);
    // Markets trade roughly a third of wall-clock time on weekdays
    let slack = if timeframe.is_intraday() { 3 } else { 2 };
    let needed_days = span_secs.saturating_mul(slack).div_ceil(86_400);
    RANGES
        .iter()
        .find(|(_, days)| *days >= needed_days)
        .map(|(range, _)| *range)
        .unwrap_or("max")
}

fn to_point(quote: &yahoo::Quote) -> Option<PricePoint> {
    Some(PricePoint {
        timestamp: Utc.timestamp_opt(quote.timestamp as i64, 0).single()?,
        open: Decimal::from_f64_retain(quote.open)?,
        high: Decimal::from_f64_retain(quote.high)?,
        low: Decimal::from_f64_retain(quote.low)?,
        close: Decimal::from_f64_retain(quote.close)?,
        volume: Decimal::from_u64(quote.volume),
    })
}

/// Merge consecutive groups of `factor` candles into one.
fn resample(points: Vec<PricePoint>, factor: usize) -> Vec<PricePoint> {
    if factor <= 1 {
        return points;
    }
    points
        .chunks(factor)
        .filter_map(|chunk| {
            let first = chunk.first()?;
            let last = chunk.last()?;
            let volume = chunk
                .iter()
                .try_fold(Decimal::ZERO, |acc, p| p.volume.map(|v| acc + v));
            Some(PricePoint {
                timestamp: first.timestamp,
                open: first.open,
                high: chunk.iter().map(|p| p.high).max()?,
                low: chunk.iter().map(|p| p.low).min()?,
                close: last.close,
                volume,
            })
        })
        .collect()
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            markets: &[
                MarketType::Equities,
                MarketType::Index,
                MarketType::Forex,
                MarketType::Crypto,
            ],
            features: &[
                Capability::PriceSeries,
                Capability::CurrentPrice,
                Capability::MarketInfo,
                Capability::News,
                Capability::Search,
            ],
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 2000,
            burst: 10,
        }
    }

    async fn get_price_data(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<PriceSeries, MarketDataError> {
        let yahoo_symbol = to_yahoo_symbol(symbol);
        let (interval, factor) = interval_for(timeframe);
        let range = range_for(timeframe, limit);

        debug!(
            "Fetching {} candles ({} over {}) for {} from Yahoo",
            limit, interval, range, yahoo_symbol
        );

        let quotes = self.fetch_quotes(&yahoo_symbol, interval, range).await?;
        let points: Vec<PricePoint> = quotes
            .iter()
            .filter_map(|q| {
                let point = to_point(q);
                if point.is_none() {
                    warn!("Skipping unconvertible Yahoo candle for {}", yahoo_symbol);
                }
                point
            })
            .collect();

        let mut series =
            PriceSeries::new(symbol, timeframe, PROVIDER_ID).with_points(resample(points, factor));
        if series.is_empty() {
            return Err(MarketDataError::NoData {
                provider: PROVIDER_ID.to_string(),
            });
        }
        series.truncate_to_latest(limit);
        Ok(series)
    }

    async fn get_current_price(&self, symbol: &str) -> Result<CurrentPrice, MarketDataError> {
        let yahoo_symbol = to_yahoo_symbol(symbol);
        debug!("Fetching latest quote for {} from Yahoo", yahoo_symbol);

        let quotes = self.fetch_quotes(&yahoo_symbol, "1d", "5d").await?;
        let last = quotes
            .last()
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;
        let price = Decimal::from_f64_retain(last.close)
            .ok_or_else(|| MarketDataError::parse(PROVIDER_ID, "close price out of range"))?;

        let change_percent = quotes
            .iter()
            .rev()
            .nth(1)
            .and_then(|prev| Decimal::from_f64_retain(prev.close))
            .filter(|prev| !prev.is_zero())
            .map(|prev| ((price - prev) / prev * Decimal::ONE_HUNDRED).round_dp(4));

        Ok(CurrentPrice {
            symbol: symbol.to_string(),
            price,
            currency: "USD".to_string(),
            change_percent,
            timestamp: Utc
                .timestamp_opt(last.timestamp as i64, 0)
                .single()
                .unwrap_or_else(Utc::now),
            source: PROVIDER_ID.to_string(),
        })
    }

    async fn get_market_info(&self, symbol: &str) -> Result<MarketInfo, MarketDataError> {
        let yahoo_symbol = to_yahoo_symbol(symbol);
        let quotes = self.fetch_quotes(&yahoo_symbol, "1d", "5d").await?;
        let last = quotes
            .last()
            .and_then(to_point)
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;
        let prev_close = quotes
            .iter()
            .rev()
            .nth(1)
            .and_then(|q| Decimal::from_f64_retain(q.close))
            .filter(|c| !c.is_zero());

        Ok(MarketInfo {
            symbol: symbol.to_string(),
            last_price: Some(last.close),
            high_24h: Some(last.high),
            low_24h: Some(last.low),
            volume_24h: last.volume,
            change_percent_24h: prev_close
                .map(|prev| ((last.close - prev) / prev * Decimal::ONE_HUNDRED).round_dp(4)),
            source: PROVIDER_ID.to_string(),
            ..Default::default()
        })
    }

    async fn get_news(
        &self,
        symbol: Option<&str>,
        limit: usize,
    ) -> Result<Vec<NewsItem>, MarketDataError> {
        let query = symbol
            .map(to_yahoo_symbol)
            .unwrap_or_else(|| GENERAL_NEWS_QUERY.to_string());
        self.search(&query, limit).await
    }

    async fn search_news(&self, query: &str, limit: usize) -> Result<Vec<NewsItem>, MarketDataError> {
        self.search(query, limit).await
    }
}
