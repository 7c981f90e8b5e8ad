//! Circuit breaker wrapping each provider (spec.md §4.7).
//!
//! Three states — closed, half-open, open — tracked with a rolling
//! request-window. No external crate: the policy is small and exact
//! (window interval, trip ratio, open timeout, probe budget are all named
//! in the spec), so a hand-rolled state machine is clearer than adapting a
//! generic resilience crate's vocabulary to these specific numbers.

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    pub window: Duration,
    pub min_requests: u32,
    pub failure_ratio_threshold: f64,
    pub open_timeout: Duration,
    pub half_open_probe_budget: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            min_requests: 10,
            failure_ratio_threshold: 0.6,
            open_timeout: Duration::from_secs(30),
            half_open_probe_budget: 10,
        }
    }
}

struct Inner {
    state: BreakerState,
    events: VecDeque<(Instant, bool)>,
    opened_at: Option<Instant>,
    half_open_probes_used: u32,
    half_open_failed: bool,
}

/// Thread-safe per-provider circuit breaker. Cheap to clone (`Arc` inside);
/// callers share one instance per provider name via `ProviderFactory`.
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                events: VecDeque::new(),
                opened_at: None,
                half_open_probes_used: 0,
                half_open_failed: false,
            }),
        }
    }

    /// Returns `true` if a call may proceed right now, transitioning
    /// open -> half-open once `open_timeout` has elapsed.
    pub async fn allow_request(&self) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::HalfOpen => inner.half_open_probes_used < self.config.half_open_probe_budget,
            BreakerState::Open => {
                let opened_at = inner.opened_at.unwrap_or_else(Instant::now);
                if opened_at.elapsed() >= self.config.open_timeout {
                    inner.state = BreakerState::HalfOpen;
                    inner.half_open_probes_used = 0;
                    inner.half_open_failed = false;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub async fn current_state(&self) -> BreakerState {
        self.inner.lock().await.state
    }

    pub async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        self.push_event(&mut inner, true);
        match inner.state {
            BreakerState::HalfOpen => {
                inner.half_open_probes_used += 1;
                if inner.half_open_probes_used >= self.config.half_open_probe_budget && !inner.half_open_failed {
                    inner.state = BreakerState::Closed;
                    inner.events.clear();
                }
            }
            BreakerState::Closed => self.maybe_trip(&mut inner),
            BreakerState::Open => {}
        }
    }

    pub async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        self.push_event(&mut inner, false);
        match inner.state {
            BreakerState::HalfOpen => {
                inner.half_open_failed = true;
                inner.state = BreakerState::Open;
                inner.opened_at = Some(Instant::now());
            }
            BreakerState::Closed => self.maybe_trip(&mut inner),
            BreakerState::Open => {}
        }
    }

    fn push_event(&self, inner: &mut Inner, success: bool) {
        let now = Instant::now();
        inner.events.push_back((now, success));
        while let Some((t, _)) = inner.events.front() {
            if now.duration_since(*t) > self.config.window {
                inner.events.pop_front();
            } else {
                break;
            }
        }
    }

    fn maybe_trip(&self, inner: &mut Inner) {
        let total = inner.events.len() as u32;
        if total < self.config.min_requests {
            return;
        }
        let failures = inner.events.iter().filter(|(_, ok)| !ok).count() as f64;
        if failures / total as f64 >= self.config.failure_ratio_threshold {
            inner.state = BreakerState::Open;
            inner.opened_at = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> BreakerConfig {
        BreakerConfig {
            window: Duration::from_secs(60),
            min_requests: 10,
            failure_ratio_threshold: 0.6,
            open_timeout: Duration::from_millis(50),
            half_open_probe_budget: 2,
        }
    }

    #[tokio::test]
    async fn trips_open_once_ratio_and_volume_exceeded() {
        let breaker = CircuitBreaker::new(test_config());
        for _ in 0..4 {
            breaker.record_success().await;
        }
        for _ in 0..6 {
            breaker.record_failure().await;
        }
        assert_eq!(breaker.current_state().await, BreakerState::Open);
        assert!(!breaker.allow_request().await);
    }

    #[tokio::test]
    async fn stays_closed_below_min_requests() {
        let breaker = CircuitBreaker::new(test_config());
        for _ in 0..5 {
            breaker.record_failure().await;
        }
        assert_eq!(breaker.current_state().await, BreakerState::Closed);
    }

    #[tokio::test]
    async fn half_open_closes_after_successful_probes() {
        let breaker = CircuitBreaker::new(test_config());
        for _ in 0..10 {
            breaker.record_failure().await;
        }
        assert_eq!(breaker.current_state().await, BreakerState::Open);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(breaker.allow_request().await);
        assert_eq!(breaker.current_state().await, BreakerState::HalfOpen);

        breaker.record_success().await;
        breaker.record_success().await;
        assert_eq!(breaker.current_state().await, BreakerState::Closed);
    }

    #[tokio::test]
    async fn half_open_reopens_on_probe_failure() {
        let breaker = CircuitBreaker::new(test_config());
        for _ in 0..10 {
            breaker.record_failure().await;
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(breaker.allow_request().await);

        breaker.record_failure().await;
        assert_eq!(breaker.current_state().await, BreakerState::Open);
    }
}
