//! # Circuit Breaker Module
//!
//! Stops calling the recipe API for a while after repeated transient
//! failures, so a dead upstream costs one fast error instead of a full
//! retry cycle per request.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::RecoveryConfig;

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure: Option<Instant>,
}

/// Circuit breaker for remote recipe API calls
///
/// # State Machine
///
/// - **Closed**: Normal operation, requests pass through
/// - **Open**: Failure threshold reached, requests fail fast
/// - **Half-Open**: Reset timeout elapsed; the next request is let through
///   and its outcome closes or reopens the circuit
///
/// # Configuration
///
/// Uses `RecoveryConfig` for:
/// - `circuit_breaker_threshold`: Failures before opening (default: 5)
/// - `circuit_breaker_reset_secs`: Time before attempting reset (default: 60s)
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    threshold: u32,
    reset_after: Duration,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    ///
    /// # Examples
    ///
    /// ```rust
    /// use recetas::circuit_breaker::CircuitBreaker;
    /// use recetas::config::RecoveryConfig;
    ///
    /// let breaker = CircuitBreaker::new(&RecoveryConfig::default());
    /// assert!(!breaker.is_open());
    /// ```
    pub fn new(config: &RecoveryConfig) -> Self {
        Self {
            state: Mutex::new(BreakerState::default()),
            threshold: config.circuit_breaker_threshold.max(1),
            reset_after: Duration::from_secs(config.circuit_breaker_reset_secs),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        // The state is two plain counters, still consistent after a panic elsewhere
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Check if the circuit is open (blocking requests)
    ///
    /// Once the reset timeout has elapsed the circuit goes half-open: this
    /// returns `false` while the failure count is kept, so a single further
    /// failure reopens it.
    pub fn is_open(&self) -> bool {
        let state = self.lock();
        if state.failure_count < self.threshold {
            return false;
        }
        match state.last_failure {
            Some(at) if at.elapsed() < self.reset_after => true,
            _ => {
                info!("Circuit breaker half-open, allowing a trial request");
                false
            }
        }
    }

    /// Record a failed call
    pub fn record_failure(&self) {
        let mut state = self.lock();
        state.failure_count = state.failure_count.saturating_add(1);
        state.last_failure = Some(Instant::now());
        if state.failure_count == self.threshold {
            warn!(failures = state.failure_count, "Circuit breaker opened");
        }
    }

    /// Record a successful call, closing the circuit
    pub fn record_success(&self) {
        let mut state = self.lock();
        if state.failure_count > 0 {
            info!(failures = state.failure_count, "Circuit breaker closed");
        }
        *state = BreakerState::default();
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }
}
