//! Provider registry.
//!
//! Holds every provider instance in registration order and guards calls to
//! them with a per-provider rate limiter and circuit breaker. Registration
//! validates the provider's descriptor; a bad descriptor rejects only that
//! one registration.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use super::{CircuitBreaker, CircuitState, RateLimiter};
use crate::errors::MarketDataError;
use crate::models::ProviderStatus;
use crate::provider::{Capability, MarketDataProvider};

/// Longest a call waits for a rate-limit token before giving up.
const DEFAULT_MAX_RATE_WAIT: Duration = Duration::from_secs(5);

pub struct ProviderRegistry {
    providers: Vec<Arc<dyn MarketDataProvider>>,
    rate_limiter: RateLimiter,
    circuit_breaker: CircuitBreaker,
    max_rate_wait: Duration,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::with_circuit_breaker(CircuitBreaker::new())
    }

    pub fn with_circuit_breaker(circuit_breaker: CircuitBreaker) -> Self {
        Self {
            providers: Vec::new(),
            rate_limiter: RateLimiter::new(),
            circuit_breaker,
            max_rate_wait: DEFAULT_MAX_RATE_WAIT,
        }
    }

    pub fn with_max_rate_wait(mut self, max_rate_wait: Duration) -> Self {
        self.max_rate_wait = max_rate_wait;
        self
    }

    /// Register a provider after validating its descriptor.
    ///
    /// Rejects empty or duplicate ids (compared case-insensitively) and
    /// empty capability or market sets. On success the provider's declared
    /// rate limit is installed in the limiter.
    pub fn register(&mut self, provider: Arc<dyn MarketDataProvider>) -> Result<(), MarketDataError> {
        let id = provider.id();
        if id.trim().is_empty() {
            return Err(MarketDataError::Config("Provider id must not be empty".to_string()));
        }
        if self.get(id).is_some() {
            return Err(MarketDataError::Config(format!(
                "Provider '{}' is already registered",
                id
            )));
        }

        let caps = provider.capabilities();
        if caps.features.is_empty() {
            return Err(MarketDataError::Config(format!(
                "Provider '{}' declares no capabilities",
                id
            )));
        }
        if caps.markets.is_empty() {
            return Err(MarketDataError::Config(format!(
                "Provider '{}' declares no supported markets",
                id
            )));
        }

        let limit = provider.rate_limit();
        if limit.requests_per_minute == 0 {
            return Err(MarketDataError::Config(format!(
                "Provider '{}' declares a zero rate limit",
                id
            )));
        }

        info!(
            "Registered provider '{}' ({} req/min, markets: {:?})",
            id, limit.requests_per_minute, caps.markets
        );
        self.rate_limiter.configure(id, limit);
        self.providers.push(provider);
        Ok(())
    }

    /// Look up a provider by id, ignoring case.
    pub fn get(&self, name: &str) -> Option<Arc<dyn MarketDataProvider>> {
        self.providers
            .iter()
            .find(|p| p.id().eq_ignore_ascii_case(name.trim()))
            .cloned()
    }

    /// All providers in registration order.
    pub fn providers(&self) -> &[Arc<dyn MarketDataProvider>] {
        &self.providers
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Registered, self-reported available, and circuit not open.
    pub fn is_available(&self, name: &str) -> bool {
        self.get(name)
            .is_some_and(|p| p.is_available() && self.circuit_breaker.is_allowed(p.id()))
    }

    /// Available providers declaring `capability`, in registration order.
    pub fn with_capability(&self, capability: Capability) -> Vec<Arc<dyn MarketDataProvider>> {
        self.providers
            .iter()
            .filter(|p| p.capabilities().supports(capability))
            .filter(|p| p.is_available() && self.circuit_breaker.is_allowed(p.id()))
            .cloned()
            .collect()
    }

    /// Run one call against `provider` under its circuit breaker and rate
    /// limit, recording the outcome.
    ///
    /// Only failures whose retry class penalizes (timeouts, rate limits,
    /// network faults) count against the circuit.
    pub async fn execute<T, F, Fut>(&self, provider: &str, op: F) -> Result<T, MarketDataError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, MarketDataError>>,
    {
        if !self.circuit_breaker.is_allowed(provider) {
            return Err(MarketDataError::CircuitOpen {
                provider: provider.to_string(),
            });
        }

        if !self
            .rate_limiter
            .acquire_within(provider, self.max_rate_wait)
            .await
        {
            return Err(MarketDataError::RateLimited {
                provider: provider.to_string(),
            });
        }

        let result = op().await;
        match &result {
            Ok(_) => self.circuit_breaker.record_success(provider),
            Err(e) if e.retry_class().penalizes() => {
                warn!("Provider '{}' failed: {}", provider, e);
                self.circuit_breaker.record_failure(provider);
            }
            Err(e) => debug!("Provider '{}' could not serve request: {}", provider, e),
        }
        result
    }

    /// Status of one provider, with live circuit and rate-limit state.
    pub fn status(&self, name: &str) -> Option<ProviderStatus> {
        let provider = self.get(name)?;
        let id = provider.id();
        let circuit = self.circuit_breaker.state(id);

        let mut status = provider.get_status();
        status.available = provider.is_available() && circuit != CircuitState::Open;
        status.circuit_state = circuit.to_string();
        status.remaining_requests = self.rate_limiter.remaining(id);
        if circuit == CircuitState::Open && status.message.is_none() {
            status.message = Some(format!(
                "Circuit open after {} failures",
                self.circuit_breaker.failure_count(id)
            ));
        }
        Some(status)
    }

    /// Status of every provider in registration order.
    pub fn statuses(&self) -> Vec<ProviderStatus> {
        self.providers
            .iter()
            .filter_map(|p| self.status(p.id()))
            .collect()
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
