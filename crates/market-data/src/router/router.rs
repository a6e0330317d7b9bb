//! Market-type-aware provider routing.

use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::classifier::classify;
use super::routes::RouteTable;
use super::symbols::adapt_symbol;
use crate::cache::{prefixes, Cache};
use crate::models::{CurrentPrice, MarketType, PriceSeries, Timeframe};
use crate::provider::{Capability, MarketDataProvider};
use crate::registry::ProviderRegistry;

/// Outcome of provider resolution for a symbol.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSelection {
    pub provider: String,
    pub market: MarketType,
    /// True when no provider from the market's chain was usable and an
    /// arbitrary capable provider was picked instead.
    pub degraded: bool,
}

/// Routes price requests to a provider based on the symbol's market type.
///
/// Each call makes a single attempt against the selected provider. An empty
/// answer or an error is logged and reported as `None`; the next scheduled
/// refresh is the retry.
pub struct ProviderRouter {
    registry: Arc<ProviderRegistry>,
    cache: Arc<Cache>,
    routes: RouteTable,
}

impl ProviderRouter {
    pub fn new(registry: Arc<ProviderRegistry>, cache: Arc<Cache>) -> Self {
        Self::with_routes(registry, cache, RouteTable::default())
    }

    pub fn with_routes(registry: Arc<ProviderRegistry>, cache: Arc<Cache>, routes: RouteTable) -> Self {
        Self {
            registry,
            cache,
            routes,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn classify(&self, symbol: &str) -> MarketType {
        classify(symbol)
    }

    /// Pick the provider that would serve a price series for `symbol`.
    pub fn resolve_provider(&self, symbol: &str) -> Option<ProviderSelection> {
        self.select(symbol, Capability::PriceSeries)
            .map(|(_, selection)| selection)
    }

    fn usable(&self, provider: &Arc<dyn MarketDataProvider>, capability: Capability) -> bool {
        provider.capabilities().supports(capability) && self.registry.is_available(provider.id())
    }

    fn select(
        &self,
        symbol: &str,
        capability: Capability,
    ) -> Option<(Arc<dyn MarketDataProvider>, ProviderSelection)> {
        let market = classify(symbol);

        if let Some(route) = self.routes.route(market) {
            for name in route.chain() {
                match self.registry.get(name) {
                    Some(provider) if self.usable(&provider, capability) => {
                        let selection = ProviderSelection {
                            provider: provider.id().to_string(),
                            market,
                            degraded: false,
                        };
                        return Some((provider, selection));
                    }
                    Some(_) => debug!("Provider '{}' unavailable for {}", name, symbol),
                    None => debug!("Provider '{}' not registered", name),
                }
            }
        }

        // Nothing from the chain: any capable provider, preferring ones that
        // cover the market
        let candidates = self.registry.providers();
        let fallback = candidates
            .iter()
            .find(|p| p.capabilities().covers(market) && self.usable(p, capability))
            .or_else(|| candidates.iter().find(|p| self.usable(p, capability)));

        match fallback {
            Some(provider) => {
                warn!(
                    "No configured provider available for {} ({}), degrading to '{}'",
                    symbol,
                    market,
                    provider.id()
                );
                let selection = ProviderSelection {
                    provider: provider.id().to_string(),
                    market,
                    degraded: true,
                };
                Some((Arc::clone(provider), selection))
            }
            None => {
                warn!("No provider available for {} ({})", symbol, market);
                None
            }
        }
    }

    /// Price series for `symbol`, served from cache when possible.
    ///
    /// The cache key covers symbol, timeframe and limit only, so a hit does
    /// not depend on which provider filled it.
    pub async fn get_price_series(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Option<PriceSeries> {
        let symbol = symbol.trim().to_ascii_uppercase();
        let limit_param = limit.to_string();
        let params = [
            ("symbol", symbol.as_str()),
            ("timeframe", timeframe.as_str()),
            ("limit", limit_param.as_str()),
        ];

        if let Some(series) = self.cache.get_json::<PriceSeries>(prefixes::PRICE_SERIES, &params) {
            return Some(series);
        }

        let (provider, selection) = self.select(&symbol, Capability::PriceSeries)?;
        let adapted = adapt_symbol(&symbol, provider.symbol_format());
        if !provider.validate_symbol(&adapted) {
            warn!("'{}' rejected symbol '{}'", selection.provider, adapted);
            return None;
        }

        debug!("Routing {} {} to {} as '{}'", symbol, timeframe, selection.provider, adapted);
        let result = self
            .registry
            .execute(provider.id(), || provider.get_price_data(&adapted, timeframe, limit))
            .await;

        match result {
            Ok(mut series) if !series.is_empty() => {
                series.symbol = symbol.clone();
                self.cache.set_json(prefixes::PRICE_SERIES, &series, &params);
                Some(series)
            }
            Ok(_) => {
                warn!("{} returned no candles for {}", selection.provider, symbol);
                None
            }
            Err(e) => {
                warn!("{} failed for {}: {}", selection.provider, symbol, e);
                None
            }
        }
    }

    /// Latest price for `symbol`, routed the same way as price series.
    pub async fn get_current_price(&self, symbol: &str) -> Option<CurrentPrice> {
        let symbol = symbol.trim().to_ascii_uppercase();
        let params = [("symbol", symbol.as_str())];

        if let Some(price) = self.cache.get_json::<CurrentPrice>(prefixes::CURRENT_PRICE, &params) {
            return Some(price);
        }

        let (provider, selection) = self.select(&symbol, Capability::CurrentPrice)?;
        let adapted = adapt_symbol(&symbol, provider.symbol_format());
        if !provider.validate_symbol(&adapted) {
            warn!("'{}' rejected symbol '{}'", selection.provider, adapted);
            return None;
        }

        let result = self
            .registry
            .execute(provider.id(), || provider.get_current_price(&adapted))
            .await;

        match result {
            Ok(mut price) => {
                price.symbol = symbol.clone();
                self.cache.set_json(prefixes::CURRENT_PRICE, &price, &params);
                Some(price)
            }
            Err(e) => {
                warn!("{} failed for {}: {}", selection.provider, symbol, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MarketDataError;
    use crate::models::PricePoint;
    use crate::provider::{ProviderCapabilities, RateLimit, SymbolFormat};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockProvider {
        id: &'static str,
        markets: &'static [MarketType],
        format: SymbolFormat,
        fail: bool,
        calls: AtomicUsize,
        last_symbol: Mutex<Option<String>>,
    }

    impl MockProvider {
        fn new(id: &'static str, markets: &'static [MarketType], format: SymbolFormat) -> Self {
            Self {
                id,
                markets,
                format,
                fail: false,
                calls: AtomicUsize::new(0),
                last_symbol: Mutex::new(None),
            }
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }
    }

    #[async_trait]
    impl MarketDataProvider for MockProvider {
        fn id(&self) -> &'static str {
            self.id
        }

        fn capabilities(&self) -> ProviderCapabilities {
            ProviderCapabilities {
                markets: self.markets,
                features: &[Capability::PriceSeries, Capability::CurrentPrice],
            }
        }

        fn rate_limit(&self) -> RateLimit {
            RateLimit {
                requests_per_minute: 6000,
                burst: 100,
            }
        }

        fn symbol_format(&self) -> SymbolFormat {
            self.format
        }

        async fn get_price_data(
            &self,
            symbol: &str,
            timeframe: Timeframe,
            _limit: usize,
        ) -> Result<PriceSeries, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_symbol.lock().unwrap() = Some(symbol.to_string());
            if self.fail {
                return Err(MarketDataError::ProviderError {
                    provider: self.id.to_string(),
                    message: "boom".to_string(),
                });
            }
            let point = PricePoint {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
                open: dec!(1),
                high: dec!(2),
                low: dec!(1),
                close: dec!(2),
                volume: None,
            };
            Ok(PriceSeries::new(symbol, timeframe, self.id).with_points(vec![point]))
        }

        async fn get_current_price(&self, symbol: &str) -> Result<CurrentPrice, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CurrentPrice {
                symbol: symbol.to_string(),
                price: dec!(42),
                currency: "USD".to_string(),
                change_percent: None,
                timestamp: Utc::now(),
                source: self.id.to_string(),
            })
        }
    }

    const CRYPTO: &[MarketType] = &[MarketType::Crypto];
    const ALL: &[MarketType] = &MarketType::ALL;

    fn router(providers: Vec<Arc<dyn MarketDataProvider>>) -> ProviderRouter {
        let mut registry = ProviderRegistry::new();
        for provider in providers {
            registry.register(provider).unwrap();
        }
        ProviderRouter::new(Arc::new(registry), Arc::new(Cache::new()))
    }

    #[test]
    fn test_primary_selected_when_present() {
        let router = router(vec![
            Arc::new(MockProvider::new("YAHOO", ALL, SymbolFormat::PassThrough)),
            Arc::new(MockProvider::new("BINANCE", CRYPTO, SymbolFormat::QuoteSuffix("USDT"))),
        ]);
        let selection = router.resolve_provider("BTC").unwrap();
        assert_eq!(selection.provider, "BINANCE");
        assert_eq!(selection.market, MarketType::Crypto);
        assert!(!selection.degraded);
    }

    #[test]
    fn test_first_fallback_when_primary_absent() {
        // Registration order puts YAHOO first, but the chain says COINGECKO
        let router = router(vec![
            Arc::new(MockProvider::new("YAHOO", ALL, SymbolFormat::PassThrough)),
            Arc::new(MockProvider::new("COINGECKO", CRYPTO, SymbolFormat::CoinId)),
        ]);
        let selection = router.resolve_provider("ETH/USDT").unwrap();
        assert_eq!(selection.provider, "COINGECKO");
        assert!(!selection.degraded);
    }

    #[test]
    fn test_degraded_when_chain_exhausted() {
        let router = router(vec![Arc::new(MockProvider::new(
            "KRAKEN",
            CRYPTO,
            SymbolFormat::PassThrough,
        ))]);
        let selection = router.resolve_provider("AAPL").unwrap();
        assert_eq!(selection.provider, "KRAKEN");
        assert_eq!(selection.market, MarketType::Equities);
        assert!(selection.degraded);
    }

    #[test]
    fn test_none_when_registry_empty() {
        let router = router(vec![]);
        assert!(router.resolve_provider("AAPL").is_none());
    }

    #[tokio::test]
    async fn test_price_series_adapts_symbol_and_caches() {
        let binance = Arc::new(MockProvider::new(
            "BINANCE",
            CRYPTO,
            SymbolFormat::QuoteSuffix("USDT"),
        ));
        let router = router(vec![binance.clone()]);

        let series = router.get_price_series("btc", Timeframe::H1, 50).await.unwrap();
        assert_eq!(series.symbol, "BTC");
        assert_eq!(series.source, "BINANCE");
        assert_eq!(binance.last_symbol.lock().unwrap().as_deref(), Some("BTCUSDT"));

        // Second call is a cache hit
        let again = router.get_price_series("BTC", Timeframe::H1, 50).await.unwrap();
        assert_eq!(again, series);
        assert_eq!(binance.calls.load(Ordering::SeqCst), 1);

        // A different limit is a different query
        router.get_price_series("BTC", Timeframe::H1, 10).await.unwrap();
        assert_eq!(binance.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_single_attempt_on_failure() {
        let binance = Arc::new(
            MockProvider::new("BINANCE", CRYPTO, SymbolFormat::QuoteSuffix("USDT")).failing(),
        );
        let coingecko = Arc::new(MockProvider::new("COINGECKO", CRYPTO, SymbolFormat::CoinId));
        let router = router(vec![binance.clone(), coingecko.clone()]);

        assert!(router.get_price_series("BTC", Timeframe::D1, 30).await.is_none());
        assert_eq!(binance.calls.load(Ordering::SeqCst), 1);
        assert_eq!(coingecko.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_current_price_uses_coin_id() {
        let coingecko = Arc::new(MockProvider::new("COINGECKO", CRYPTO, SymbolFormat::CoinId));
        let router = router(vec![coingecko.clone()]);

        let price = router.get_current_price("ETH").await.unwrap();
        assert_eq!(price.symbol, "ETH");
        assert_eq!(price.price, dec!(42));

        router.get_current_price("eth").await.unwrap();
        assert_eq!(coingecko.calls.load(Ordering::SeqCst), 1);
    }
}
