use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::NewsError;

/// Topic a feed source is filed under.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Crypto,
    Stocks,
    Forex,
    Economy,
    General,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Crypto,
        Category::Stocks,
        Category::Forex,
        Category::Economy,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Crypto => "crypto",
            Self::Stocks => "stocks",
            Self::Forex => "forex",
            Self::Economy => "economy",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = NewsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| NewsError::Config(format!("Unknown category '{}'", s)))
    }
}

/// A syndicated feed endpoint.
///
/// Everything but `active` is fixed at registration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub url: String,
    pub category: Category,

    /// How long a fetched feed stays cached. `None` uses the cache's
    /// adaptive TTL for feeds.
    pub refresh: Option<Duration>,

    /// Articles kept per fetch
    pub max_entries: usize,

    pub active: bool,
    pub description: String,
}

impl Source {
    pub fn new(name: impl Into<String>, url: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            category,
            refresh: None,
            max_entries: 20,
            active: true,
            description: String::new(),
        }
    }

    pub fn with_refresh(mut self, refresh: Duration) -> Self {
        self.refresh = Some(refresh);
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Where an article entered the system.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum Provenance {
    Feed,
    Provider(String),
}

/// A normalized news article.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,

    /// Source or publisher name
    pub source: String,

    pub category: Category,
    pub provenance: Provenance,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Title of the feed the article came from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_description: Option<String>,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
        category: Category,
        provenance: Provenance,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            summary: None,
            published_at: None,
            source: source.into(),
            category,
            provenance,
            tags: Vec::new(),
            language: None,
            feed_title: None,
            source_description: None,
        }
    }

    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// Stable sort, newest first, undated articles last.
pub fn sort_newest_first(articles: &mut [Article]) {
    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}
