//! Built-in feed catalog.

use std::time::Duration;

use crate::models::{Category, Source};

struct CatalogEntry {
    name: &'static str,
    url: &'static str,
    category: Category,
    refresh_minutes: u64,
    max_entries: usize,
    description: &'static str,
}

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        name: "CoinDesk",
        url: "https://www.coindesk.com/arc/outboundfeeds/rss/",
        category: Category::Crypto,
        refresh_minutes: 10,
        max_entries: 20,
        description: "Bitcoin, Ethereum and digital asset news",
    },
    CatalogEntry {
        name: "Cointelegraph",
        url: "https://cointelegraph.com/rss",
        category: Category::Crypto,
        refresh_minutes: 10,
        max_entries: 20,
        description: "Blockchain and cryptocurrency news",
    },
    CatalogEntry {
        name: "Decrypt",
        url: "https://decrypt.co/feed",
        category: Category::Crypto,
        refresh_minutes: 15,
        max_entries: 15,
        description: "Crypto and web3 reporting",
    },
    CatalogEntry {
        name: "MarketWatch",
        url: "https://feeds.content.dowjones.io/public/rss/mw_topstories",
        category: Category::Stocks,
        refresh_minutes: 10,
        max_entries: 20,
        description: "Top stories from MarketWatch",
    },
    CatalogEntry {
        name: "Yahoo Finance",
        url: "https://finance.yahoo.com/news/rssindex",
        category: Category::Stocks,
        refresh_minutes: 10,
        max_entries: 20,
        description: "Yahoo Finance headlines",
    },
    CatalogEntry {
        name: "Seeking Alpha",
        url: "https://seekingalpha.com/market_currents.xml",
        category: Category::Stocks,
        refresh_minutes: 15,
        max_entries: 15,
        description: "Market currents",
    },
    CatalogEntry {
        name: "FXStreet",
        url: "https://www.fxstreet.com/rss/news",
        category: Category::Forex,
        refresh_minutes: 10,
        max_entries: 20,
        description: "Currency market news",
    },
    CatalogEntry {
        name: "Forexlive",
        url: "https://www.forexlive.com/feed/news",
        category: Category::Forex,
        refresh_minutes: 10,
        max_entries: 20,
        description: "Real-time forex commentary",
    },
    CatalogEntry {
        name: "CNBC Economy",
        url: "https://www.cnbc.com/id/20910258/device/rss/rss.html",
        category: Category::Economy,
        refresh_minutes: 30,
        max_entries: 15,
        description: "Economic news from CNBC",
    },
    CatalogEntry {
        name: "Federal Reserve",
        url: "https://www.federalreserve.gov/feeds/press_all.xml",
        category: Category::Economy,
        refresh_minutes: 60,
        max_entries: 10,
        description: "Federal Reserve press releases",
    },
    CatalogEntry {
        name: "CNBC Top News",
        url: "https://www.cnbc.com/id/100003114/device/rss/rss.html",
        category: Category::General,
        refresh_minutes: 15,
        max_entries: 20,
        description: "Top news from CNBC",
    },
    CatalogEntry {
        name: "BBC Business",
        url: "https://feeds.bbci.co.uk/news/business/rss.xml",
        category: Category::General,
        refresh_minutes: 15,
        max_entries: 20,
        description: "Business news from the BBC",
    },
];

/// The default feed sources, in configured order.
pub fn default_sources() -> Vec<Source> {
    CATALOG
        .iter()
        .map(|entry| {
            Source::new(entry.name, entry.url, entry.category)
                .with_refresh(Duration::from_secs(entry.refresh_minutes * 60))
                .with_max_entries(entry.max_entries)
                .with_description(entry.description)
        })
        .collect()
}
