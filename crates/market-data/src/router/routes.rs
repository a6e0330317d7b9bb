use std::collections::HashSet;

use crate::errors::MarketDataError;
use crate::models::MarketType;

/// Provider chain for one market type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarketRoute {
    pub market: MarketType,
    pub primary: String,
    /// Tried in order when the primary is missing or unavailable
    pub fallbacks: Vec<String>,
}

impl MarketRoute {
    pub fn new(market: MarketType, primary: &str, fallbacks: &[&str]) -> Self {
        Self {
            market,
            primary: primary.to_string(),
            fallbacks: fallbacks.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Primary followed by the fallbacks.
    pub fn chain(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str()).chain(self.fallbacks.iter().map(String::as_str))
    }
}

/// Validated set of routes, one per market type.
#[derive(Clone, Debug)]
pub struct RouteTable {
    routes: Vec<MarketRoute>,
}

impl RouteTable {
    /// Build a table, rejecting empty primaries, repeated market types and
    /// market types with no route.
    pub fn new(routes: Vec<MarketRoute>) -> Result<Self, MarketDataError> {
        let mut seen = HashSet::new();
        for route in &routes {
            if route.chain().any(|name| name.trim().is_empty()) {
                return Err(MarketDataError::Config(format!(
                    "Route for {} has an empty provider name",
                    route.market
                )));
            }
            if !seen.insert(route.market) {
                return Err(MarketDataError::Config(format!(
                    "Duplicate route for {}",
                    route.market
                )));
            }
        }

        if let Some(missing) = MarketType::ALL.iter().find(|m| !seen.contains(*m)) {
            return Err(MarketDataError::Config(format!("No route for {}", missing)));
        }

        Ok(Self { routes })
    }

    pub fn route(&self, market: MarketType) -> Option<&MarketRoute> {
        self.routes.iter().find(|r| r.market == market)
    }

    pub fn routes(&self) -> &[MarketRoute] {
        &self.routes
    }
}

impl Default for RouteTable {
    /// Crypto goes to Binance first; everything else to Yahoo.
    fn default() -> Self {
        Self {
            routes: vec![
                MarketRoute::new(MarketType::Crypto, "BINANCE", &["COINGECKO", "YAHOO"]),
                MarketRoute::new(MarketType::Forex, "YAHOO", &[]),
                MarketRoute::new(MarketType::Equities, "YAHOO", &[]),
                MarketRoute::new(MarketType::Index, "YAHOO", &[]),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_covers_every_market() {
        let table = RouteTable::default();
        for market in MarketType::ALL {
            assert!(table.route(market).is_some());
        }
        // The default table passes its own validation
        assert!(RouteTable::new(table.routes().to_vec()).is_ok());
    }

    #[test]
    fn test_chain_order() {
        let route = MarketRoute::new(MarketType::Crypto, "BINANCE", &["COINGECKO", "YAHOO"]);
        let chain: Vec<_> = route.chain().collect();
        assert_eq!(chain, vec!["BINANCE", "COINGECKO", "YAHOO"]);
    }

    #[test]
    fn test_validation_errors() {
        let mut routes = RouteTable::default().routes().to_vec();
        routes[0].primary = String::new();
        assert!(matches!(RouteTable::new(routes), Err(MarketDataError::Config(_))));

        let mut routes = RouteTable::default().routes().to_vec();
        routes.push(MarketRoute::new(MarketType::Forex, "OANDA", &[]));
        assert!(RouteTable::new(routes).is_err());

        let mut routes = RouteTable::default().routes().to_vec();
        routes.retain(|r| r.market != MarketType::Index);
        assert!(RouteTable::new(routes).is_err());
    }
}
