use serde::{Deserialize, Serialize};

use super::market::MarketType;
use crate::provider::Capability;

/// Aggregate health across providers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLevel {
    /// Every registered provider is available.
    Healthy,
    /// Some providers are unavailable.
    Degraded,
    /// No provider is available.
    Down,
}

impl HealthLevel {
    pub fn from_counts(available: usize, total: usize) -> Self {
        if total == 0 || available == 0 {
            Self::Down
        } else if available < total {
            Self::Degraded
        } else {
            Self::Healthy
        }
    }
}

/// Point-in-time status of one provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub name: String,
    pub available: bool,

    /// Circuit breaker state ("Closed", "Open", "HalfOpen")
    pub circuit_state: String,

    pub capabilities: Vec<Capability>,
    pub markets: Vec<MarketType>,

    pub requests_per_minute: u32,

    /// Tokens currently left in the provider's rate-limit bucket
    pub remaining_requests: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
