use std::sync::Arc;

use async_trait::async_trait;
use pulsefeed_market_data::{MarketDataProvider, NewsItem, ProviderRegistry};

use crate::errors::NewsError;

/// An auxiliary news collaborator merged alongside the feeds.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Name used in batch reports and provenance.
    fn name(&self) -> &str;

    /// Up to `limit` recent items.
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<NewsItem>, NewsError>;
}

/// Adapts a news-capable market data provider, calling it through the
/// registry so its rate limit and circuit breaker apply.
pub struct ProviderNewsSource {
    provider: Arc<dyn MarketDataProvider>,
    registry: Arc<ProviderRegistry>,
}

impl ProviderNewsSource {
    pub fn new(provider: Arc<dyn MarketDataProvider>, registry: Arc<ProviderRegistry>) -> Self {
        Self { provider, registry }
    }
}

#[async_trait]
impl NewsSource for ProviderNewsSource {
    fn name(&self) -> &str {
        self.provider.id()
    }

    async fn fetch_recent(&self, limit: usize) -> Result<Vec<NewsItem>, NewsError> {
        let items = self
            .registry
            .execute(self.provider.id(), || self.provider.get_news(None, limit))
            .await?;
        Ok(items)
    }
}
