use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::market::Timeframe;

/// A single OHLCV candle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Candle open time
    pub timestamp: DateTime<Utc>,

    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,

    /// Trading volume (not every provider reports it)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,
}

/// An ordered price series as served by one provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    /// Symbol as requested by the caller (not the provider-adapted form)
    pub symbol: String,

    pub timeframe: Timeframe,

    /// Points ordered by timestamp ascending
    pub points: Vec<PricePoint>,

    /// Provider that served the series
    pub source: String,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, source: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            points: Vec::new(),
            source: source.into(),
        }
    }

    pub fn with_points(mut self, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.timestamp);
        self.points = points;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Keep only the most recent `limit` points.
    pub fn truncate_to_latest(&mut self, limit: usize) {
        if self.points.len() > limit {
            let excess = self.points.len() - limit;
            self.points.drain(..excess);
        }
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }
}

/// Latest traded price for a symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurrentPrice {
    pub symbol: String,
    pub price: Decimal,
    pub currency: String,

    /// 24h (or session) change in percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<Decimal>,

    pub timestamp: DateTime<Utc>,
    pub source: String,
}

/// Descriptive market statistics for a symbol.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketInfo {
    pub symbol: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_price: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_24h: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_24h: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_24h: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_percent_24h: Option<Decimal>,

    pub source: String,
}
