//! Provider manager façade.
//!
//! One entry point over the provider registry, the router and the news
//! aggregator. Like the components it wraps, it never surfaces provider
//! failures: they are logged and degrade to `None` or an empty list.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use pulsefeed_market_data::cache::prefixes;
use pulsefeed_market_data::router::adapt_symbol;
use pulsefeed_market_data::{
    classify, sort_by_recency, Cache, CacheStats, Capability, CurrentPrice, HealthLevel,
    MarketDataError, MarketDataProvider, MarketInfo, NewsItem, PriceSeries, ProviderRegistry,
    ProviderRouter, ProviderSelection, ProviderStatus, Timeframe,
};
use pulsefeed_news::{Article, NewsAggregator, NewsBatch, NewsRequest};
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Aggregate view returned by [`ProviderManager::get_status`].
#[derive(Clone, Debug, Serialize)]
pub struct SystemStatus {
    pub health: HealthLevel,
    pub providers: Vec<ProviderStatus>,
    pub cache: CacheStats,
}

#[derive(Clone, Debug)]
pub struct ManagerConfig {
    /// Providers queried at once for news and search
    pub workers: usize,
    /// Budget for one provider call in a fan-out
    pub task_deadline: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            task_deadline: Duration::from_secs(30),
        }
    }
}

pub struct ProviderManager {
    registry: Arc<ProviderRegistry>,
    router: Arc<ProviderRouter>,
    aggregator: Arc<NewsAggregator>,
    cache: Arc<Cache>,
    config: ManagerConfig,
}

impl ProviderManager {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        router: Arc<ProviderRouter>,
        aggregator: Arc<NewsAggregator>,
        cache: Arc<Cache>,
        config: ManagerConfig,
    ) -> Self {
        Self {
            registry,
            router,
            aggregator,
            cache,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Providers eligible for `capability`, in registration order.
    ///
    /// A named provider must exist and declare the capability. Without a
    /// name, only available providers are eligible, and they must cover the
    /// symbol's market when a symbol is given.
    fn candidates(
        &self,
        capability: Capability,
        symbol: Option<&str>,
        provider: Option<&str>,
    ) -> Vec<Arc<dyn MarketDataProvider>> {
        if let Some(name) = provider {
            return match self.registry.get(name) {
                Some(p) if p.capabilities().supports(capability) => vec![p],
                Some(_) => {
                    warn!("Provider '{}' does not support {}", name, capability.as_str());
                    Vec::new()
                }
                None => {
                    warn!("Unknown provider '{}'", name);
                    Vec::new()
                }
            };
        }

        let market = symbol.map(classify);
        self.registry
            .with_capability(capability)
            .into_iter()
            .filter(|p| market.map_or(true, |m| p.capabilities().covers(m)))
            .collect()
    }

    /// Whether `symbol` is acceptable to the named provider, or to any
    /// provider that could price it.
    pub fn validate_symbol(&self, symbol: &str, provider: Option<&str>) -> bool {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return false;
        }
        self.candidates(Capability::PriceSeries, Some(symbol), provider)
            .iter()
            .any(|p| p.validate_symbol(&adapt_symbol(symbol, p.symbol_format())))
    }

    /// Try candidates in order until one returns an acceptable value.
    async fn first_success<T, F, Fut>(
        &self,
        capability: Capability,
        symbol: &str,
        provider: Option<&str>,
        call: F,
        accept: impl Fn(&T) -> bool,
    ) -> Option<T>
    where
        F: Fn(Arc<dyn MarketDataProvider>, String) -> Fut,
        Fut: Future<Output = Result<T, MarketDataError>>,
    {
        for candidate in self.candidates(capability, Some(symbol), provider) {
            let id = candidate.id();

            let adapted = adapt_symbol(symbol, candidate.symbol_format());
            if !candidate.validate_symbol(&adapted) {
                debug!("'{}' rejected symbol '{}'", id, adapted);
                continue;
            }

            match self
                .registry
                .execute(id, || call(candidate.clone(), adapted.clone()))
                .await
            {
                Ok(value) if accept(&value) => return Some(value),
                Ok(_) => debug!("'{}' returned no data for {}", id, symbol),
                Err(e) => warn!("'{}' failed for {}: {}", id, symbol, e),
            }
        }

        warn!("No provider returned {} for {}", capability.as_str(), symbol);
        None
    }

    pub async fn get_price_data(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
        provider: Option<&str>,
    ) -> Option<PriceSeries> {
        let symbol = symbol.trim().to_ascii_uppercase();
        let mut series = self
            .first_success(
                Capability::PriceSeries,
                &symbol,
                provider,
                |p, s| async move { p.get_price_data(&s, timeframe, limit).await },
                |series: &PriceSeries| !series.is_empty(),
            )
            .await?;
        series.symbol = symbol;
        Some(series)
    }

    pub async fn get_current_price(&self, symbol: &str, provider: Option<&str>) -> Option<CurrentPrice> {
        let symbol = symbol.trim().to_ascii_uppercase();
        let mut price = self
            .first_success(
                Capability::CurrentPrice,
                &symbol,
                provider,
                |p, s| async move { p.get_current_price(&s).await },
                |_: &CurrentPrice| true,
            )
            .await?;
        price.symbol = symbol;
        Some(price)
    }

    /// Market snapshot, cached per symbol and provider choice.
    pub async fn get_market_info(&self, symbol: &str, provider: Option<&str>) -> Option<MarketInfo> {
        let symbol = symbol.trim().to_ascii_uppercase();
        let provider_param = provider.map(str::to_ascii_uppercase).unwrap_or_default();
        let params = [("symbol", symbol.as_str()), ("provider", provider_param.as_str())];

        if let Some(info) = self.cache.get_json::<MarketInfo>(prefixes::MARKET_INFO, &params) {
            return Some(info);
        }

        let mut info = self
            .first_success(
                Capability::MarketInfo,
                &symbol,
                provider,
                |p, s| async move { p.get_market_info(&s).await },
                |_: &MarketInfo| true,
            )
            .await?;
        info.symbol = symbol.clone();
        self.cache.set_json(prefixes::MARKET_INFO, &info, &params);
        Some(info)
    }

    /// Query every eligible provider concurrently and merge, newest first.
    async fn fan_out<F, Fut>(
        &self,
        capability: Capability,
        provider: Option<&str>,
        limit: usize,
        call: F,
    ) -> Vec<NewsItem>
    where
        F: Fn(Arc<dyn MarketDataProvider>) -> Fut,
        Fut: Future<Output = Result<Vec<NewsItem>, MarketDataError>>,
    {
        if limit == 0 {
            return Vec::new();
        }

        let candidates = self.candidates(capability, None, provider);
        if candidates.is_empty() {
            warn!("No provider available for {}", capability.as_str());
            return Vec::new();
        }

        let deadline = self.config.task_deadline;
        let call = &call;
        let batches: Vec<Vec<NewsItem>> = stream::iter(candidates)
            .map(|p| async move {
                let id = p.id();
                match timeout(deadline, self.registry.execute(id, || call(p.clone()))).await {
                    Ok(Ok(items)) => items,
                    Ok(Err(e)) => {
                        warn!("'{}' {} failed: {}", id, capability.as_str(), e);
                        Vec::new()
                    }
                    Err(_) => {
                        warn!("'{}' {} exceeded {:?}", id, capability.as_str(), deadline);
                        Vec::new()
                    }
                }
            })
            .buffered(self.config.workers.max(1))
            .collect()
            .await;

        let mut items: Vec<NewsItem> = batches.into_iter().flatten().collect();
        sort_by_recency(&mut items);
        items.truncate(limit);
        items
    }

    pub async fn get_news(
        &self,
        symbol: Option<&str>,
        limit: usize,
        provider: Option<&str>,
    ) -> Vec<NewsItem> {
        let symbol = symbol.map(|s| s.trim().to_ascii_uppercase());
        self.fan_out(Capability::News, provider, limit, |p| {
            let symbol = symbol.clone();
            async move { p.get_news(symbol.as_deref(), limit).await }
        })
        .await
    }

    pub async fn search_news(&self, query: &str, limit: usize, provider: Option<&str>) -> Vec<NewsItem> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        let query = query.to_string();
        self.fan_out(Capability::Search, provider, limit, |p| {
            let query = query.clone();
            async move { p.search_news(&query, limit).await }
        })
        .await
    }

    /// Per-provider status plus aggregate health, for every provider or
    /// only the named one. An unknown name reports no providers.
    pub fn get_status(&self, provider: Option<&str>) -> SystemStatus {
        let providers = match provider {
            None => self.registry.statuses(),
            Some(name) => match self.registry.status(name) {
                Some(status) => vec![status],
                None => {
                    warn!("Unknown provider '{}'", name);
                    Vec::new()
                }
            },
        };
        let available = providers.iter().filter(|s| s.available).count();
        let health = HealthLevel::from_counts(available, providers.len());
        info!("Provider health: {:?} ({}/{} available)", health, available, providers.len());

        SystemStatus {
            health,
            providers,
            cache: self.cache.stats(),
        }
    }

    pub async fn get_recent_news(&self, request: &NewsRequest) -> Vec<Article> {
        self.aggregator.get_recent(request).await
    }

    pub async fn get_recent_news_with_report(&self, request: &NewsRequest) -> NewsBatch {
        self.aggregator.get_recent_with_report(request).await
    }

    pub fn resolve_provider(&self, symbol: &str) -> Option<ProviderSelection> {
        self.router.resolve_provider(symbol)
    }

    /// Routed, cached price series.
    pub async fn get_price_series(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Option<PriceSeries> {
        self.router.get_price_series(symbol, timeframe, limit).await
    }
}
