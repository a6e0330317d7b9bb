use pulsefeed_market_data::MarketDataError;
use pulsefeed_news::NewsError;
use thiserror::Error;

/// Errors raised while configuring or assembling the hub.
#[derive(Error, Debug)]
pub enum HubError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Market data setup failed: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("News setup failed: {0}")]
    News(#[from] NewsError),
}

pub type Result<T> = std::result::Result<T, HubError>;
