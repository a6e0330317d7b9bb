//! Provider registry module.
//!
//! This module provides orchestration for market data providers, including:
//! - Provider registration with descriptor validation
//! - Rate limiting per provider
//! - Circuit breaking for fault tolerance

mod circuit_breaker;
mod provider_registry;
mod rate_limiter;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use provider_registry::ProviderRegistry;
pub use rate_limiter::RateLimiter;
