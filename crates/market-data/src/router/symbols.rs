//! Symbol tables and per-provider symbol adaptation.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::provider::SymbolFormat;

/// Crypto tickers recognised by the classifier.
pub const CRYPTO_TICKERS: &[&str] = &[
    "BTC", "ETH", "BNB", "SOL", "XRP", "ADA", "DOGE", "DOT", "AVAX", "MATIC", "LINK", "LTC",
    "TRX", "ATOM", "SHIB", "USDT", "USDC",
];

/// Quote currencies that may trail a crypto pair. `USDT` must precede `USD`.
const QUOTE_CURRENCIES: &[&str] = &["USDT", "USDC", "BUSD", "USD", "EUR"];

/// Common index tickers and their Yahoo spelling.
pub const INDEX_TICKERS: &[(&str, &str)] = &[
    ("SPX", "^GSPC"),
    ("GSPC", "^GSPC"),
    ("DJI", "^DJI"),
    ("DJIA", "^DJI"),
    ("IXIC", "^IXIC"),
    ("NDX", "^NDX"),
    ("RUT", "^RUT"),
    ("VIX", "^VIX"),
    ("FTSE", "^FTSE"),
    ("DAX", "^GDAXI"),
    ("N225", "^N225"),
    ("HSI", "^HSI"),
];

lazy_static! {
    /// Ticker to CoinGecko coin id.
    static ref COIN_IDS: HashMap<&'static str, &'static str> = [
        ("BTC", "bitcoin"),
        ("ETH", "ethereum"),
        ("BNB", "binancecoin"),
        ("SOL", "solana"),
        ("XRP", "ripple"),
        ("ADA", "cardano"),
        ("DOGE", "dogecoin"),
        ("DOT", "polkadot"),
        ("AVAX", "avalanche-2"),
        ("MATIC", "matic-network"),
        ("LINK", "chainlink"),
        ("LTC", "litecoin"),
        ("TRX", "tron"),
        ("ATOM", "cosmos"),
        ("SHIB", "shiba-inu"),
        ("USDT", "tether"),
        ("USDC", "usd-coin"),
    ]
    .into_iter()
    .collect();
}

/// Base asset of a crypto symbol: `BTC/USDT`, `BTC-USD`, `BTCUSDT` and
/// `btc` all give `BTC`.
pub fn crypto_base(symbol: &str) -> String {
    let upper = symbol.trim().to_ascii_uppercase();
    if let Some((base, _)) = upper.split_once(['/', '-']) {
        return base.to_string();
    }
    for quote in QUOTE_CURRENCIES {
        if let Some(base) = upper.strip_suffix(*quote) {
            if !base.is_empty() {
                return base.to_string();
            }
        }
    }
    upper
}

/// CoinGecko id for a crypto symbol; unknown tickers fall back to the
/// lowercased base.
pub fn coin_id(symbol: &str) -> String {
    let base = crypto_base(symbol);
    COIN_IDS
        .get(base.as_str())
        .map(|id| id.to_string())
        .unwrap_or_else(|| base.to_ascii_lowercase())
}

/// Yahoo spelling of an index ticker, if it is one we know.
pub fn yahoo_index(symbol: &str) -> Option<&'static str> {
    let upper = symbol.trim().trim_start_matches('^').to_ascii_uppercase();
    INDEX_TICKERS
        .iter()
        .find(|(ticker, _)| *ticker == upper)
        .map(|(_, yahoo)| *yahoo)
}

/// Rewrite a caller symbol into the spelling a provider expects.
pub fn adapt_symbol(symbol: &str, format: SymbolFormat) -> String {
    match format {
        SymbolFormat::PassThrough => symbol.trim().to_string(),
        SymbolFormat::QuoteSuffix(quote) => format!("{}{}", crypto_base(symbol), quote),
        SymbolFormat::CoinId => coin_id(symbol),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_base() {
        assert_eq!(crypto_base("BTC/USDT"), "BTC");
        assert_eq!(crypto_base("eth-usd"), "ETH");
        assert_eq!(crypto_base("SOLUSDT"), "SOL");
        assert_eq!(crypto_base("BTC"), "BTC");
        assert_eq!(crypto_base("USDT"), "USDT");
    }

    #[test]
    fn test_adapt_symbol_per_format() {
        assert_eq!(adapt_symbol("BTC", SymbolFormat::QuoteSuffix("USDT")), "BTCUSDT");
        assert_eq!(adapt_symbol("BTC/USDT", SymbolFormat::QuoteSuffix("USDT")), "BTCUSDT");
        assert_eq!(adapt_symbol("ETH-USD", SymbolFormat::CoinId), "ethereum");
        assert_eq!(adapt_symbol("PEPE", SymbolFormat::CoinId), "pepe");
        assert_eq!(adapt_symbol(" AAPL ", SymbolFormat::PassThrough), "AAPL");
    }

    #[test]
    fn test_yahoo_index() {
        assert_eq!(yahoo_index("SPX"), Some("^GSPC"));
        assert_eq!(yahoo_index("^dji"), Some("^DJI"));
        assert_eq!(yahoo_index("AAPL"), None);
    }
}
