/// Classification for provider failures.
///
/// The router makes a single attempt per call, so the class does not decide
/// whether to retry inline. It decides what the failure means for the
/// provider's health.
///
/// | Class | Record Circuit Breaker Failure? |
/// |-------|--------------------------------|
/// | `Never` | No |
/// | `FailoverWithPenalty` | Yes |
/// | `NextProvider` | No |
/// | `CircuitOpen` | No (already recorded) |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Terminal for this request: bad symbol or bad configuration.
    Never,

    /// Transient transport failure (rate limit, timeout, network).
    ///
    /// Recorded in the circuit breaker so that a provider accumulating these
    /// is temporarily treated as unavailable by the router.
    FailoverWithPenalty,

    /// The provider could not serve this request but is otherwise healthy.
    NextProvider,

    /// Circuit breaker is open for this provider.
    CircuitOpen,
}

impl RetryClass {
    /// Whether this failure should count against the provider's circuit.
    pub fn penalizes(self) -> bool {
        matches!(self, Self::FailoverWithPenalty)
    }
}
