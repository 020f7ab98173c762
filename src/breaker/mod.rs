//! Per-dependency circuit breakers.
//!
//! One [`CircuitBreaker`] protects each external dependency (vector store,
//! LLM backend). `is_available` is the sole admission gate: it reports the
//! state, performs the OPEN → HALF_OPEN transition once the recovery
//! timeout elapses, and accounts half-open probe permits. Callers must not
//! bypass it. The breaker never retries on behalf of the caller.

#[cfg(test)]
mod tests;

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

/// Circuit states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls permitted; failures are being counted.
    Closed,
    /// Calls rejected until the recovery timeout elapses.
    Open,
    /// A bounded number of probe calls is admitted.
    HalfOpen,
}

/// Breaker tuning for one dependency.
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// How long the circuit stays open before probing.
    pub recovery_timeout: Duration,
    /// Concurrent probes admitted while half-open.
    pub half_open_max_calls: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            half_open_max_calls: 1,
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    last_failure_time: Option<Instant>,
    half_open_calls: u32,
    last_probe_time: Option<Instant>,
}

/// Circuit breaker for one external dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: &'static str,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

/// Monitoring snapshot of one breaker.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerStatus {
    /// Dependency name.
    pub name: &'static str,
    /// Current state.
    pub state: CircuitState,
    /// Consecutive failure count.
    pub failure_count: u32,
    /// Configured failure threshold.
    pub failure_threshold: u32,
    /// Configured recovery timeout in seconds.
    pub recovery_timeout_seconds: u64,
}

impl CircuitBreaker {
    /// Creates a breaker for the named dependency.
    pub fn new(name: &'static str, config: BreakerConfig) -> Self {
        Self {
            name,
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure_time: None,
                half_open_calls: 0,
                last_probe_time: None,
            }),
        }
    }

    /// Dependency name this breaker guards.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current state, applying the OPEN → HALF_OPEN transition when the
    /// recovery timeout has elapsed.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock();
        self.refresh_locked(&mut inner);
        inner.state
    }

    fn refresh_locked(&self, inner: &mut BreakerInner) {
        if inner.state == CircuitState::Open && self.recovery_due(inner) {
            inner.state = CircuitState::HalfOpen;
            inner.half_open_calls = 0;
            info!(circuit = self.name, "circuit entering half-open state");
        }
    }

    fn recovery_due(&self, inner: &BreakerInner) -> bool {
        match inner.last_failure_time {
            Some(at) => at.elapsed() >= self.config.recovery_timeout,
            None => true,
        }
    }

    /// Admission gate. Returns `true` when a call may proceed, consuming a
    /// probe permit in the half-open state.
    pub fn is_available(&self) -> bool {
        let mut inner = self.inner.lock();
        self.refresh_locked(&mut inner);

        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                // A cancelled probe never reports an outcome; reclaim its
                // permit after a full recovery timeout so a dropped request
                // cannot wedge the circuit half-open.
                if inner.half_open_calls >= self.config.half_open_max_calls
                    && let Some(at) = inner.last_probe_time
                    && at.elapsed() >= self.config.recovery_timeout
                {
                    inner.half_open_calls = 0;
                }

                if inner.half_open_calls < self.config.half_open_max_calls {
                    inner.half_open_calls += 1;
                    inner.last_probe_time = Some(Instant::now());
                    true
                } else {
                    false
                }
            }
            CircuitState::Open => false,
        }
    }

    /// Records a successful call. A half-open success closes the circuit;
    /// any success clears the failure count.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Closed;
            info!(circuit = self.name, "circuit recovered, now closed");
        }
        inner.failure_count = 0;
    }

    /// Records a failed call. A half-open failure reopens immediately; in
    /// the closed state the circuit opens at the failure threshold.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count += 1;
        inner.last_failure_time = Some(Instant::now());

        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Open;
            warn!(circuit = self.name, "probe failed while half-open, back to open");
        } else if inner.state == CircuitState::Closed
            && inner.failure_count >= self.config.failure_threshold
        {
            inner.state = CircuitState::Open;
            warn!(
                circuit = self.name,
                failures = inner.failure_count,
                "circuit opened"
            );
        }
    }

    /// Monitoring snapshot. Does not apply transitions.
    pub fn status(&self) -> BreakerStatus {
        let inner = self.inner.lock();
        BreakerStatus {
            name: self.name,
            state: inner.state,
            failure_count: inner.failure_count,
            failure_threshold: self.config.failure_threshold,
            recovery_timeout_seconds: self.config.recovery_timeout.as_secs(),
        }
    }
}
