//! Duplicate detection for articles.
//!
//! Two articles are duplicates when their normalized URLs match, or when
//! their titles yield the same key: the sorted set of the first six
//! significant words. A significant word is an alphabetic token longer than
//! three characters after ticker aliases are expanded. Titles with fewer
//! than three significant words have no key and only match by URL.

use std::collections::{BTreeSet, HashSet};

use crate::models::Article;

const TITLE_KEY_WORDS: usize = 6;
const MIN_KEY_WORDS: usize = 3;
const MIN_WORD_LEN: usize = 4;

const TICKER_ALIASES: &[(&str, &str)] = &[
    ("btc", "bitcoin"),
    ("xbt", "bitcoin"),
    ("eth", "ethereum"),
    ("sol", "solana"),
    ("doge", "dogecoin"),
    ("xrp", "ripple"),
];

pub fn normalize_url(url: &str) -> String {
    url.trim().to_lowercase()
}

fn canonical_word(token: &str) -> Option<String> {
    let token = token.trim_matches(|c: char| !c.is_alphanumeric());
    if token.is_empty() || token.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let word: String = token
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect();
    let word = TICKER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == word)
        .map(|(_, name)| name.to_string())
        .unwrap_or(word);

    (word.chars().count() >= MIN_WORD_LEN).then_some(word)
}

/// Title similarity key, or `None` when the title has too few significant
/// words.
///
/// ```
/// use pulsefeed_news::dedup::title_key;
///
/// assert_eq!(
///     title_key("Bitcoin price surges past $50k"),
///     title_key("BTC price surges past $50,000")
/// );
/// assert_eq!(title_key("Up 5%"), None);
/// ```
pub fn title_key(title: &str) -> Option<Vec<String>> {
    let words: BTreeSet<String> = title
        .split_whitespace()
        .filter_map(canonical_word)
        .take(TITLE_KEY_WORDS)
        .collect();

    (words.len() >= MIN_KEY_WORDS).then(|| words.into_iter().collect())
}

/// Stateful first-seen-wins filter.
#[derive(Debug, Default)]
pub struct Deduplicator {
    urls: HashSet<String>,
    titles: HashSet<Vec<String>>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the item is new and records it.
    pub fn admit(&mut self, url: &str, title: &str) -> bool {
        let url = normalize_url(url);
        let key = title_key(title);

        if self.urls.contains(&url) {
            return false;
        }
        if let Some(key) = &key {
            if self.titles.contains(key) {
                return false;
            }
        }

        self.urls.insert(url);
        if let Some(key) = key {
            self.titles.insert(key);
        }
        true
    }
}

/// Keep the first occurrence of each article, preserving order.
pub fn dedup_articles(articles: Vec<Article>) -> Vec<Article> {
    let mut seen = Deduplicator::new();
    articles
        .into_iter()
        .filter(|a| seen.admit(&a.url, &a.title))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Provenance};

    fn article(title: &str, url: &str) -> Article {
        Article::new(title, url, "test", Category::General, Provenance::Feed)
    }

    #[test]
    fn test_url_match_is_case_and_whitespace_insensitive() {
        let articles = vec![
            article("First headline about markets", "https://a.test/story"),
            article("Completely different words here", " HTTPS://A.TEST/STORY "),
        ];
        let kept = dedup_articles(articles);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "First headline about markets");
    }

    #[test]
    fn test_title_key_ignores_short_and_numeric_tokens() {
        let key = title_key("Gold hits $2,000 as Fed holds rates steady").unwrap();
        assert_eq!(key, vec!["gold", "hits", "holds", "rates", "steady"]);
    }

    #[test]
    fn test_title_key_applies_aliases() {
        let key = title_key("ETH and SOL rally together").unwrap();
        assert!(key.contains(&"ethereum".to_string()));
        assert!(key.contains(&"solana".to_string()));
    }

    #[test]
    fn test_short_titles_have_no_key() {
        assert_eq!(title_key("Markets close"), None);
        assert_eq!(title_key(""), None);

        let kept = dedup_articles(vec![
            article("Markets close", "https://a.test/1"),
            article("Markets close", "https://a.test/2"),
        ]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_title_key_uses_first_six_words() {
        let a = title_key("alpha bravo charlie delta foxtrot hotel india").unwrap();
        let b = title_key("hotel foxtrot delta charlie bravo alpha juliet").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 6);
    }

    #[test]
    fn test_bitcoin_near_duplicates_collapse() {
        let kept = dedup_articles(vec![
            article("Bitcoin price surges past $50k", "https://a/1"),
            article("BTC price surges past $50,000", "https://b/2"),
        ]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].url, "https://a/1");
        assert_eq!(
            title_key("Bitcoin price surges past $50k").unwrap(),
            vec!["bitcoin", "past", "price", "surges"]
        );
    }
}
