//! NewsAPI headline provider.
//!
//! News only: /v2/top-headlines for general business news and
//! /v2/everything for symbol and free-text queries. Requires an API key;
//! without one the provider reports itself unavailable.
//! API documentation: https://newsapi.org/docs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::Client;
use serde::Deserialize;

use crate::errors::MarketDataError;
use crate::models::{CurrentPrice, MarketType, NewsItem, PriceSeries, ProviderStatus, Timeframe};
use crate::provider::http;
use crate::provider::{Capability, MarketDataProvider, ProviderCapabilities, RateLimit};

const BASE_URL: &str = "https://newsapi.org/v2";
const PROVIDER_ID: &str = "NEWSAPI";

/// NewsAPI caps page size at 100.
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArticlesResponse {
    status: String,
    #[serde(default)]
    articles: Vec<Article>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    source: ArticleSource,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

/// NewsAPI headline provider.
pub struct NewsApiProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl NewsApiProvider {
    /// Create the provider. Blank keys are treated as missing.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: http::build_client(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn articles(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<NewsItem>, MarketDataError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            MarketDataError::Config(format!("{} requires an API key", PROVIDER_ID))
        })?;

        debug!("NewsAPI request: {} with {} params", endpoint, params.len());

        let url = format!("{}{}", self.base_url, endpoint);
        let request = self
            .client
            .get(&url)
            .header("X-Api-Key", api_key)
            .query(params);
        let body = http::send(PROVIDER_ID, request, None).await?;

        parse_articles(&body)
    }
}

fn parse_articles(body: &str) -> Result<Vec<NewsItem>, MarketDataError> {
    let response: ArticlesResponse =
        serde_json::from_str(body).map_err(|e| MarketDataError::parse(PROVIDER_ID, e))?;

    if response.status != "ok" {
        return Err(MarketDataError::ProviderError {
            provider: PROVIDER_ID.to_string(),
            message: response
                .message
                .unwrap_or_else(|| format!("status '{}'", response.status)),
        });
    }

    let items = response
        .articles
        .into_iter()
        .filter_map(|article| {
            let title = article.title?;
            let url = article.url?;
            // Deleted articles come back as "[Removed]" placeholders
            if title == "[Removed]" {
                return None;
            }
            let mut item = NewsItem::new(
                title,
                url,
                article.source.name.unwrap_or_else(|| PROVIDER_ID.to_string()),
                PROVIDER_ID,
            );
            if let Some(description) = article.description {
                item = item.with_summary(description);
            }
            if let Some(published) = article
                .published_at
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            {
                item = item.with_published_at(published.with_timezone(&Utc));
            }
            Some(item)
        })
        .collect();

    Ok(items)
}

#[async_trait]
impl MarketDataProvider for NewsApiProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            markets: &MarketType::ALL,
            features: &[Capability::News, Capability::Search],
        }
    }

    fn rate_limit(&self) -> RateLimit {
        // Developer plan: 100 requests per day
        RateLimit {
            requests_per_minute: 4,
            burst: 2,
        }
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn get_status(&self) -> ProviderStatus {
        let caps = self.capabilities();
        let limit = self.rate_limit();
        ProviderStatus {
            name: PROVIDER_ID.to_string(),
            available: self.is_available(),
            circuit_state: "Closed".to_string(),
            capabilities: caps.features.to_vec(),
            markets: caps.markets.to_vec(),
            requests_per_minute: limit.requests_per_minute,
            remaining_requests: limit.burst as f64,
            message: (!self.is_available()).then(|| "API key not configured".to_string()),
        }
    }

    async fn get_price_data(
        &self,
        _symbol: &str,
        _timeframe: Timeframe,
        _limit: usize,
    ) -> Result<PriceSeries, MarketDataError> {
        Err(self.not_supported(Capability::PriceSeries))
    }

    async fn get_current_price(&self, _symbol: &str) -> Result<CurrentPrice, MarketDataError> {
        Err(self.not_supported(Capability::CurrentPrice))
    }

    async fn get_news(
        &self,
        symbol: Option<&str>,
        limit: usize,
    ) -> Result<Vec<NewsItem>, MarketDataError> {
        let page_size = limit.clamp(1, MAX_PAGE_SIZE).to_string();
        match symbol {
            Some(symbol) => {
                self.articles(
                    "/everything",
                    &[
                        ("q", symbol),
                        ("sortBy", "publishedAt"),
                        ("language", "en"),
                        ("pageSize", page_size.as_str()),
                    ],
                )
                .await
            }
            None => {
                self.articles(
                    "/top-headlines",
                    &[
                        ("category", "business"),
                        ("language", "en"),
                        ("pageSize", page_size.as_str()),
                    ],
                )
                .await
            }
        }
    }

    async fn search_news(&self, query: &str, limit: usize) -> Result<Vec<NewsItem>, MarketDataError> {
        let page_size = limit.clamp(1, MAX_PAGE_SIZE).to_string();
        self.articles(
            "/everything",
            &[
                ("q", query),
                ("sortBy", "relevancy"),
                ("language", "en"),
                ("pageSize", page_size.as_str()),
            ],
        )
        .await
    }
}
