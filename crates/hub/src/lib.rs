//! PulseFeed Hub
//!
//! Wires the market data and news crates together: configuration from the
//! environment, logging setup, the [`ProviderManager`] façade and the
//! [`Hub`] that owns every shared component.

pub mod config;
pub mod errors;
pub mod hub;
pub mod logging;
pub mod manager;

pub use config::HubConfig;
pub use errors::HubError;
pub use hub::Hub;
pub use logging::init_tracing;
pub use manager::{ManagerConfig, ProviderManager, SystemStatus};
