use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A news record as returned by a provider.
///
/// Providers fill what their API offers; fields are validated and trimmed
/// later by the news aggregator, so an empty title or url here is legal.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,

    /// Publisher name (e.g. "Reuters")
    pub source: String,

    /// Provider that served the item (e.g. "NEWSAPI")
    pub provider: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl NewsItem {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            source: source.into(),
            provider: provider.into(),
            ..Default::default()
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Sort newest first; undated items go last. Stable for equal timestamps.
pub fn sort_by_recency(items: &mut [NewsItem]) {
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sort_by_recency_puts_undated_last() {
        let mut items = vec![
            NewsItem::new("undated", "u1", "s", "P"),
            NewsItem::new("old", "u2", "s", "P")
                .with_published_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            NewsItem::new("new", "u3", "s", "P")
                .with_published_at(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()),
        ];
        sort_by_recency(&mut items);
        let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "old", "undated"]);
    }
}
