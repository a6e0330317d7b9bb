//! Symbol classification and provider routing.
//!
//! A symbol is classified into a [`MarketType`](crate::models::MarketType),
//! the market's route names a primary provider and ordered fallbacks, and
//! the selected provider receives the symbol in its own spelling.

mod classifier;
#[allow(clippy::module_inception)]
mod router;
mod routes;
pub mod symbols;

pub use classifier::classify;
pub use router::{ProviderRouter, ProviderSelection};
pub use routes::{MarketRoute, RouteTable};
pub use symbols::adapt_symbol;
