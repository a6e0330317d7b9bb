//! Application assembly root.

use std::sync::Arc;

use pulsefeed_market_data::{
    BinanceProvider, Cache, CacheConfig, Capability, CoinGeckoProvider, MarketDataProvider,
    NewsApiProvider, ProviderRegistry, ProviderRouter, TtlPolicy, YahooProvider,
};
use pulsefeed_news::{
    AggregatorConfig, FeedFetcher, FeedTransport, FetcherConfig, HttpTransport, NewsAggregator,
    ProviderNewsSource, SourceRegistry,
};
use tracing::{info, warn};

use crate::config::HubConfig;
use crate::errors::{HubError, Result};
use crate::manager::{ManagerConfig, ProviderManager};

/// Owns every long-lived component and hands out shared handles.
pub struct Hub {
    pub config: HubConfig,
    pub cache: Arc<Cache>,
    pub sources: Arc<SourceRegistry>,
    pub providers: Arc<ProviderRegistry>,
    pub router: Arc<ProviderRouter>,
    pub fetcher: Arc<FeedFetcher>,
    pub aggregator: Arc<NewsAggregator>,
    pub manager: Arc<ProviderManager>,
}

impl Hub {
    /// Assemble the hub with live HTTP transports and the configured
    /// providers.
    pub fn build(config: HubConfig) -> Result<Self> {
        let providers = build_providers(&config);
        let transport: Arc<dyn FeedTransport> = Arc::new(HttpTransport::new()?);
        Self::build_with(config, providers, transport)
    }

    /// Assemble the hub from explicit providers and feed transport.
    pub fn build_with(
        config: HubConfig,
        providers: Vec<Arc<dyn MarketDataProvider>>,
        transport: Arc<dyn FeedTransport>,
    ) -> Result<Self> {
        let cache = Arc::new(Cache::with_config(CacheConfig {
            max_entries: config.cache_max_entries,
            policy: TtlPolicy::default(),
        }));

        let mut registry = ProviderRegistry::new();
        for provider in providers {
            let id = provider.id();
            if let Err(e) = registry.register(provider) {
                warn!("Skipping provider '{}': {}", id, e);
            }
        }
        let registry = Arc::new(registry);

        let sources = Arc::new(if config.default_sources {
            SourceRegistry::with_defaults()
        } else {
            SourceRegistry::new()
        });

        let router = Arc::new(ProviderRouter::new(registry.clone(), cache.clone()));

        let fetcher = Arc::new(FeedFetcher::new(
            sources.clone(),
            cache.clone(),
            transport,
            FetcherConfig {
                workers: config.workers,
                task_deadline: config.task_deadline,
                request_timeout: config.request_timeout,
            },
        ));

        let mut aggregator = NewsAggregator::new(
            fetcher.clone(),
            cache.clone(),
            AggregatorConfig {
                workers: config.workers,
                task_deadline: config.task_deadline,
                cache_ttl: config.news_cache_ttl,
            },
        );
        for provider in registry.providers() {
            if !provider.capabilities().supports(Capability::News) {
                continue;
            }
            if !provider.is_available() {
                warn!("News provider '{}' is unavailable, not aggregating it", provider.id());
                continue;
            }
            aggregator.add_source(Arc::new(ProviderNewsSource::new(
                provider.clone(),
                registry.clone(),
            )));
        }
        let aggregator = Arc::new(aggregator);

        let manager = Arc::new(ProviderManager::new(
            registry.clone(),
            router.clone(),
            aggregator.clone(),
            cache.clone(),
            ManagerConfig {
                workers: config.workers,
                task_deadline: config.task_deadline,
            },
        ));

        info!(
            "Hub ready: {} providers, {} feed sources",
            registry.len(),
            sources.len()
        );

        Ok(Self {
            config,
            cache,
            sources,
            providers: registry,
            router,
            fetcher,
            aggregator,
            manager,
        })
    }
}

/// Instantiate the providers named in the config, in order. A provider that
/// cannot be created is logged and left out.
fn build_providers(config: &HubConfig) -> Vec<Arc<dyn MarketDataProvider>> {
    config
        .providers
        .iter()
        .filter_map(|id| match instantiate(id, config) {
            Ok(provider) => Some(provider),
            Err(e) => {
                warn!("Skipping provider '{}': {}", id, e);
                None
            }
        })
        .collect()
}

fn instantiate(id: &str, config: &HubConfig) -> Result<Arc<dyn MarketDataProvider>> {
    match id {
        "BINANCE" => Ok(Arc::new(BinanceProvider::new())),
        "COINGECKO" => Ok(Arc::new(CoinGeckoProvider::new())),
        "YAHOO" => Ok(Arc::new(YahooProvider::new()?)),
        "NEWSAPI" => Ok(Arc::new(NewsApiProvider::new(config.newsapi_key.clone()))),
        other => Err(HubError::Config(format!("Unknown provider '{}'", other))),
    }
}
