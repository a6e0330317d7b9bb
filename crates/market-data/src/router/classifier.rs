use crate::models::MarketType;

use super::symbols::{yahoo_index, CRYPTO_TICKERS};

/// Classify a symbol into a market type.
///
/// Rules are checked in order and the first match wins:
/// 1. contains a known crypto ticker
/// 2. forex pair: `EUR/USD`, or exactly six letters such as `EURUSD`
/// 3. known index ticker
/// 4. anything else is an equity
///
/// ```
/// use pulsefeed_market_data::models::MarketType;
/// use pulsefeed_market_data::router::classify;
///
/// assert_eq!(classify("BTC/USDT"), MarketType::Crypto);
/// assert_eq!(classify("EURUSD"), MarketType::Forex);
/// assert_eq!(classify("^GSPC"), MarketType::Index);
/// assert_eq!(classify("AAPL"), MarketType::Equities);
/// ```
pub fn classify(symbol: &str) -> MarketType {
    let upper = symbol.trim().to_ascii_uppercase();

    if CRYPTO_TICKERS.iter().any(|ticker| upper.contains(ticker)) {
        return MarketType::Crypto;
    }

    if is_forex_pair(&upper) {
        return MarketType::Forex;
    }

    if yahoo_index(&upper).is_some() {
        return MarketType::Index;
    }

    MarketType::Equities
}

fn is_forex_pair(symbol: &str) -> bool {
    if let Some((base, quote)) = symbol.split_once('/') {
        return !base.is_empty() && !quote.is_empty();
    }
    symbol.len() == 6 && symbol.chars().all(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_wins_over_forex_shape() {
        // Six letters, but contains a crypto ticker
        assert_eq!(classify("ETHUSD"), MarketType::Crypto);
        assert_eq!(classify("btc"), MarketType::Crypto);
    }

    #[test]
    fn test_forex_patterns() {
        assert_eq!(classify("EUR/USD"), MarketType::Forex);
        assert_eq!(classify("gbpjpy"), MarketType::Forex);
        assert_eq!(classify("EURUSD1"), MarketType::Equities);
    }

    #[test]
    fn test_index_and_equities() {
        assert_eq!(classify("SPX"), MarketType::Index);
        assert_eq!(classify("NDX"), MarketType::Index);
        assert_eq!(classify("MSFT"), MarketType::Equities);
        assert_eq!(classify("BRK.B"), MarketType::Equities);
    }
}
