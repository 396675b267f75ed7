//! Circuit breaker for outbound request admission.
//!
//! Fails fast once consecutive failures cross a threshold, probes the
//! server again after a recovery timeout, and closes only after enough
//! consecutive successes. Only client-initiated outbound requests consult
//! the breaker; inbound server requests bypass it entirely.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, requests admitted
    Closed,
    /// Failing fast, requests rejected
    Open,
    /// Probing: a limited number of trial requests admitted
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half-open",
        };
        f.write_str(s)
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the circuit open
    pub failure_threshold: u32,
    /// Consecutive half-open successes that close the circuit
    pub success_threshold: u32,
    /// Time spent open before probing
    pub recovery_timeout: Duration,
    /// Trial requests admitted concurrently while half-open
    pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            recovery_timeout: Duration::from_secs(30),
            half_open_max_requests: 1,
        }
    }
}

/// Counters exposed for monitoring
#[derive(Debug, Clone, Default)]
pub struct CircuitBreakerStats {
    /// Requests that passed admission
    pub total_requests: u64,
    /// Recorded successes
    pub successes: u64,
    /// Recorded failures
    pub failures: u64,
    /// Requests rejected while open
    pub rejections: u64,
    /// State transitions, natural and forced
    pub state_transitions: u64,
}

/// Callback invoked on every state transition, outside the breaker lock.
pub type StateChangeCallback = std::sync::Arc<dyn Fn(CircuitState, CircuitState) + Send + Sync>;

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    half_open_in_flight: u32,
    opened_at: Option<Instant>,
    stats: CircuitBreakerStats,
}

/// Circuit breaker. All state updates happen under a single lock.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
    callbacks: Mutex<Vec<StateChangeCallback>>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl CircuitBreaker {
    /// Create a breaker with the given configuration.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                half_open_in_flight: 0,
                opened_at: None,
                stats: CircuitBreakerStats::default(),
            }),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    /// Create a breaker with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }

    /// Ask for admission of one outbound request.
    ///
    /// Returns `false` while the circuit is open (counted as a rejection)
    /// or while the half-open trial quota is exhausted.
    pub fn try_acquire(&self) -> bool {
        let transition = {
            let mut inner = self.inner.lock().expect("breaker mutex poisoned");
            let transition = Self::maybe_enter_half_open(&self.config, &mut inner);

            let admitted = match inner.state {
                CircuitState::Closed => true,
                CircuitState::Open => false,
                CircuitState::HalfOpen => {
                    if inner.half_open_in_flight < self.config.half_open_max_requests {
                        inner.half_open_in_flight += 1;
                        true
                    } else {
                        false
                    }
                }
            };

            if admitted {
                inner.stats.total_requests += 1;
            } else {
                inner.stats.rejections += 1;
            }

            if !admitted {
                drop(inner);
                self.fire(transition);
                return false;
            }
            transition
        };
        self.fire(transition);
        true
    }

    /// Record a successful request.
    pub fn record_success(&self) {
        let transition = {
            let mut inner = self.inner.lock().expect("breaker mutex poisoned");
            inner.stats.successes += 1;
            match inner.state {
                CircuitState::Closed => {
                    inner.failure_count = 0;
                    None
                }
                CircuitState::HalfOpen => {
                    inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
                    inner.success_count += 1;
                    if inner.success_count >= self.config.success_threshold {
                        Some(Self::transition(&mut inner, CircuitState::Closed))
                    } else {
                        None
                    }
                }
                CircuitState::Open => None,
            }
        };
        self.fire(transition);
    }

    /// Record a failed request.
    pub fn record_failure(&self) {
        let transition = {
            let mut inner = self.inner.lock().expect("breaker mutex poisoned");
            inner.stats.failures += 1;
            match inner.state {
                CircuitState::Closed => {
                    inner.failure_count += 1;
                    if inner.failure_count >= self.config.failure_threshold {
                        Some(Self::transition(&mut inner, CircuitState::Open))
                    } else {
                        None
                    }
                }
                CircuitState::HalfOpen => {
                    inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
                    Some(Self::transition(&mut inner, CircuitState::Open))
                }
                CircuitState::Open => None,
            }
        };
        self.fire(transition);
    }

    /// Current state, advancing Open → HalfOpen when the recovery timeout
    /// has elapsed.
    pub fn state(&self) -> CircuitState {
        let (state, transition) = {
            let mut inner = self.inner.lock().expect("breaker mutex poisoned");
            let transition = Self::maybe_enter_half_open(&self.config, &mut inner);
            (inner.state, transition)
        };
        self.fire(transition);
        state
    }

    /// Snapshot of the breaker counters.
    pub fn stats(&self) -> CircuitBreakerStats {
        self.inner
            .lock()
            .expect("breaker mutex poisoned")
            .stats
            .clone()
    }

    /// Force the circuit open (operational kill switch).
    pub fn force_open(&self) {
        let transition = {
            let mut inner = self.inner.lock().expect("breaker mutex poisoned");
            if inner.state == CircuitState::Open {
                None
            } else {
                Some(Self::transition(&mut inner, CircuitState::Open))
            }
        };
        self.fire(transition);
    }

    /// Force the circuit closed (operational recovery).
    pub fn force_closed(&self) {
        let transition = {
            let mut inner = self.inner.lock().expect("breaker mutex poisoned");
            if inner.state == CircuitState::Closed {
                None
            } else {
                Some(Self::transition(&mut inner, CircuitState::Closed))
            }
        };
        self.fire(transition);
    }

    /// Release a half-open trial slot without recording a verdict.
    /// Used when an admitted trial is abandoned (caller cancellation).
    pub fn release(&self) {
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");
        if inner.state == CircuitState::HalfOpen {
            inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
        }
    }

    /// Register a state-change callback. Callbacks run outside the
    /// breaker lock, in registration order.
    pub fn on_state_change<F>(&self, callback: F)
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.callbacks
            .lock()
            .expect("breaker callbacks mutex poisoned")
            .push(std::sync::Arc::new(callback));
    }

    fn maybe_enter_half_open(
        config: &CircuitBreakerConfig,
        inner: &mut Inner,
    ) -> Option<(CircuitState, CircuitState)> {
        if inner.state == CircuitState::Open
            && inner
                .opened_at
                .is_some_and(|at| at.elapsed() >= config.recovery_timeout)
        {
            Some(Self::transition(inner, CircuitState::HalfOpen))
        } else {
            None
        }
    }

    fn transition(inner: &mut Inner, to: CircuitState) -> (CircuitState, CircuitState) {
        let from = inner.state;
        inner.state = to;
        inner.stats.state_transitions += 1;
        inner.failure_count = 0;
        inner.success_count = 0;
        inner.half_open_in_flight = 0;
        inner.opened_at = if to == CircuitState::Open {
            Some(Instant::now())
        } else {
            None
        };
        debug!("circuit breaker: {from} -> {to}");
        (from, to)
    }

    fn fire(&self, transition: Option<(CircuitState, CircuitState)>) {
        if let Some((from, to)) = transition {
            // Clone the list out so callbacks run with no lock held.
            let callbacks = self
                .callbacks
                .lock()
                .expect("breaker callbacks mutex poisoned")
                .clone();
            for callback in &callbacks {
                callback(from, to);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            success_threshold: 1,
            recovery_timeout: Duration::from_millis(50),
            half_open_max_requests: 1,
        }
    }

    #[test]
    fn starts_closed_and_admits() {
        let breaker = CircuitBreaker::with_defaults();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.try_acquire());
    }

    #[test]
    fn trips_open_after_threshold_failures() {
        let breaker = CircuitBreaker::new(fast_config());
        for _ in 0..3 {
            assert!(breaker.try_acquire());
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.try_acquire());
        assert_eq!(breaker.stats().rejections, 1);
    }

    #[test]
    fn success_resets_consecutive_failures() {
        let breaker = CircuitBreaker::new(fast_config());
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();
        // Never three in a row, so still closed.
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn recovers_through_half_open() {
        let breaker = CircuitBreaker::new(fast_config());
        for _ in 0..3 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        // Single trial admitted; a second is refused while it is in flight.
        assert!(breaker.try_acquire());
        assert!(!breaker.try_acquire());

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.try_acquire());
    }

    #[test]
    fn half_open_failure_reopens() {
        let breaker = CircuitBreaker::new(fast_config());
        for _ in 0..3 {
            breaker.record_failure();
        }
        std::thread::sleep(Duration::from_millis(80));
        assert!(breaker.try_acquire());
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.try_acquire());
    }

    #[test]
    fn forced_transitions() {
        let breaker = CircuitBreaker::with_defaults();
        breaker.force_open();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.try_acquire());

        breaker.force_closed();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.try_acquire());

        // Forcing the current state is a no-op and does not count.
        let transitions_before = breaker.stats().state_transitions;
        breaker.force_closed();
        assert_eq!(breaker.stats().state_transitions, transitions_before);
    }

    #[test]
    fn state_change_callbacks_fire() {
        let breaker = CircuitBreaker::new(fast_config());
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        breaker.on_state_change(move |_from, to| {
            if to == CircuitState::Open {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });

        for _ in 0..3 {
            breaker.record_failure();
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stats_accounting() {
        let breaker = CircuitBreaker::new(fast_config());
        assert!(breaker.try_acquire());
        breaker.record_success();
        assert!(breaker.try_acquire());
        breaker.record_failure();

        let stats = breaker.stats();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.successes, 1);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.rejections, 0);
    }
}
