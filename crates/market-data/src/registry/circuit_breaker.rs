//! Per-provider circuit breaker.
//!
//! A provider that keeps failing with transport errors (timeouts, rate
//! limits, network faults) is treated as unavailable for a cool-down period,
//! after which a few probe requests decide whether it has recovered.
//!
//! ```text
//!   Closed --(threshold failures)--> Open --(cool-down)--> HalfOpen
//!     ^                                ^                       |
//!     |                                +------(failure)--------+
//!     +---------------(enough successes)-----------------------+
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Closed => "Closed",
            Self::Open => "Open",
            Self::HalfOpen => "HalfOpen",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// How long an open circuit rejects calls.
    pub cool_down: Duration,
    /// Successful probes needed to close a half-open circuit.
    pub probe_successes: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cool_down: Duration::from_secs(60),
            probe_successes: 2,
        }
    }
}

#[derive(Debug)]
struct Circuit {
    state: CircuitState,
    failures: u32,
    probe_successes: u32,
    opened_at: Option<Instant>,
}

impl Default for Circuit {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failures: 0,
            probe_successes: 0,
            opened_at: None,
        }
    }
}

impl Circuit {
    /// Move Open to HalfOpen once the cool-down has passed.
    fn advance(&mut self, cool_down: Duration, provider: &str) {
        if self.state == CircuitState::Open
            && self.opened_at.is_some_and(|at| at.elapsed() >= cool_down)
        {
            info!("Circuit breaker: '{}' cooled down, probing", provider);
            self.state = CircuitState::HalfOpen;
            self.probe_successes = 0;
        }
    }
}

/// Per-provider circuit breaker. State is in-memory only.
pub struct CircuitBreaker {
    circuits: Mutex<HashMap<String, Circuit>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::with_config(CircuitBreakerConfig::default())
    }

    pub fn with_config(config: CircuitBreakerConfig) -> Self {
        Self {
            circuits: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Lock the circuits map, recovering from poison if necessary.
    fn lock_circuits(&self) -> MutexGuard<'_, HashMap<String, Circuit>> {
        self.circuits.lock().unwrap_or_else(|poisoned| {
            warn!("Circuit breaker mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Whether a call to `provider` may go through right now.
    pub fn is_allowed(&self, provider: &str) -> bool {
        self.state(provider) != CircuitState::Open
    }

    /// Current state, applying the cool-down transition if due.
    pub fn state(&self, provider: &str) -> CircuitState {
        let mut circuits = self.lock_circuits();
        match circuits.get_mut(provider) {
            Some(circuit) => {
                circuit.advance(self.config.cool_down, provider);
                circuit.state
            }
            None => CircuitState::Closed,
        }
    }

    pub fn record_success(&self, provider: &str) {
        let mut circuits = self.lock_circuits();
        let circuit = circuits.entry(provider.to_string()).or_default();
        circuit.advance(self.config.cool_down, provider);

        match circuit.state {
            CircuitState::Closed => circuit.failures = 0,
            CircuitState::HalfOpen => {
                circuit.probe_successes += 1;
                if circuit.probe_successes >= self.config.probe_successes {
                    info!("Circuit breaker: closing circuit for '{}'", provider);
                    *circuit = Circuit::default();
                }
            }
            CircuitState::Open => {
                debug!("Circuit breaker: late success for open circuit '{}'", provider);
            }
        }
    }

    pub fn record_failure(&self, provider: &str) {
        let mut circuits = self.lock_circuits();
        let circuit = circuits.entry(provider.to_string()).or_default();
        circuit.advance(self.config.cool_down, provider);
        circuit.failures += 1;

        match circuit.state {
            CircuitState::Closed if circuit.failures >= self.config.failure_threshold => {
                warn!(
                    "Circuit breaker: opening circuit for '{}' after {} failures",
                    provider, circuit.failures
                );
                circuit.state = CircuitState::Open;
                circuit.opened_at = Some(Instant::now());
            }
            CircuitState::Closed => {
                debug!(
                    "Circuit breaker: failure for '{}' ({}/{})",
                    provider, circuit.failures, self.config.failure_threshold
                );
            }
            CircuitState::HalfOpen => {
                warn!("Circuit breaker: probe failed for '{}', reopening", provider);
                circuit.state = CircuitState::Open;
                circuit.opened_at = Some(Instant::now());
                circuit.probe_successes = 0;
            }
            CircuitState::Open => {}
        }
    }

    pub fn failure_count(&self, provider: &str) -> u32 {
        self.lock_circuits()
            .get(provider)
            .map(|c| c.failures)
            .unwrap_or(0)
    }

    /// Force a provider's circuit closed.
    pub fn reset(&self, provider: &str) {
        if self.lock_circuits().remove(provider).is_some() {
            info!("Circuit breaker: reset '{}'", provider);
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failure_threshold: u32, cool_down_ms: u64, probe_successes: u32) -> CircuitBreaker {
        CircuitBreaker::with_config(CircuitBreakerConfig {
            failure_threshold,
            cool_down: Duration::from_millis(cool_down_ms),
            probe_successes,
        })
    }

    #[test]
    fn test_unknown_provider_is_closed() {
        let cb = CircuitBreaker::new();
        assert!(cb.is_allowed("YAHOO"));
        assert_eq!(cb.state("YAHOO"), CircuitState::Closed);
    }

    #[test]
    fn test_opens_at_threshold() {
        let cb = breaker(3, 60_000, 1);
        cb.record_failure("BINANCE");
        cb.record_failure("BINANCE");
        assert!(cb.is_allowed("BINANCE"));

        cb.record_failure("BINANCE");
        assert!(!cb.is_allowed("BINANCE"));
        assert_eq!(cb.state("BINANCE"), CircuitState::Open);
    }

    #[test]
    fn test_success_clears_failures() {
        let cb = breaker(3, 60_000, 1);
        cb.record_failure("BINANCE");
        cb.record_failure("BINANCE");
        cb.record_success("BINANCE");
        assert_eq!(cb.failure_count("BINANCE"), 0);
    }

    #[test]
    fn test_half_open_then_closed() {
        let cb = breaker(1, 10, 2);
        cb.record_failure("COINGECKO");
        assert_eq!(cb.state("COINGECKO"), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cb.state("COINGECKO"), CircuitState::HalfOpen);
        assert!(cb.is_allowed("COINGECKO"));

        cb.record_success("COINGECKO");
        assert_eq!(cb.state("COINGECKO"), CircuitState::HalfOpen);
        cb.record_success("COINGECKO");
        assert_eq!(cb.state("COINGECKO"), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let cb = breaker(1, 10, 2);
        cb.record_failure("COINGECKO");
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cb.state("COINGECKO"), CircuitState::HalfOpen);

        cb.record_failure("COINGECKO");
        assert_eq!(cb.state("COINGECKO"), CircuitState::Open);
    }

    #[test]
    fn test_reset_and_isolation() {
        let cb = breaker(1, 60_000, 1);
        cb.record_failure("A");
        assert!(!cb.is_allowed("A"));
        assert!(cb.is_allowed("B"));

        cb.reset("A");
        assert!(cb.is_allowed("A"));
    }
}
