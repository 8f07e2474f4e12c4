use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::retry::IsTransient;

// ============================================================================
// Circuit Breaker for outbound partner calls
// ============================================================================
//
// Tracks consecutive failures against one remote dependency (carrier API,
// payment gateway) and short-circuits calls while that dependency is down.
//
// States:
// - Closed: calls pass through, consecutive failures are counted
// - Open: calls fail immediately until the cool-down elapses
// - HalfOpen: trial calls pass; enough successes close the breaker again
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Gauge encoding used by the metrics registry
    pub fn as_gauge(&self) -> i64 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the breaker
    pub failure_threshold: u32,
    /// How long the breaker stays open before allowing trial calls
    pub cool_down: Duration,
    /// Trial successes needed to close from half-open
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cool_down: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BreakerError<E> {
    #[error("circuit '{0}' is open")]
    Open(&'static str),

    #[error("{0}")]
    Inner(E),
}

#[derive(Debug)]
struct Counters {
    state: CircuitState,
    failures: u32,
    trial_successes: u32,
    opened_at: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    name: &'static str,
    config: CircuitBreakerConfig,
    counters: Mutex<Counters>,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            config,
            counters: Mutex::new(Counters {
                state: CircuitState::Closed,
                failures: 0,
                trial_successes: 0,
                opened_at: None,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run `operation` unless the breaker is open. Only transient errors
    /// count against the dependency; a rejection of one request means the
    /// remote end answered.
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: Future<Output = Result<T, E>>,
        E: IsTransient,
    {
        self.admit()?;

        match operation.await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(err) if err.is_transient() => {
                self.on_failure();
                Err(BreakerError::Inner(err))
            }
            Err(err) => {
                self.on_success();
                Err(BreakerError::Inner(err))
            }
        }
    }

    pub fn state(&self) -> CircuitState {
        self.counters().state
    }

    fn counters(&self) -> std::sync::MutexGuard<'_, Counters> {
        // A poisoned lock only means another caller panicked mid-update;
        // the counters are still usable.
        self.counters.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn admit<E>(&self) -> Result<(), BreakerError<E>> {
        let mut c = self.counters();
        if c.state != CircuitState::Open {
            return Ok(());
        }

        let cooled = c
            .opened_at
            .map(|at| at.elapsed() >= self.config.cool_down)
            .unwrap_or(true);

        if cooled {
            tracing::info!(circuit = self.name, "Circuit breaker half-open, allowing trial call");
            c.state = CircuitState::HalfOpen;
            c.trial_successes = 0;
            Ok(())
        } else {
            Err(BreakerError::Open(self.name))
        }
    }

    fn on_success(&self) {
        let mut c = self.counters();
        match c.state {
            CircuitState::Closed => c.failures = 0,
            CircuitState::HalfOpen => {
                c.trial_successes += 1;
                if c.trial_successes >= self.config.success_threshold {
                    tracing::info!(circuit = self.name, "Circuit breaker closed");
                    c.state = CircuitState::Closed;
                    c.failures = 0;
                    c.trial_successes = 0;
                    c.opened_at = None;
                }
            }
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self) {
        let mut c = self.counters();
        c.failures += 1;

        match c.state {
            CircuitState::Closed if c.failures >= self.config.failure_threshold => {
                tracing::warn!(
                    circuit = self.name,
                    failures = c.failures,
                    "Circuit breaker opened"
                );
                c.state = CircuitState::Open;
                c.opened_at = Some(Instant::now());
            }
            CircuitState::HalfOpen => {
                tracing::warn!(circuit = self.name, "Trial call failed, reopening circuit");
                c.state = CircuitState::Open;
                c.opened_at = Some(Instant::now());
                c.trial_successes = 0;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Fault {
        Down,
        BadRequest,
    }

    impl IsTransient for Fault {
        fn is_transient(&self) -> bool {
            matches!(self, Fault::Down)
        }
    }

    fn breaker(threshold: u32, cool_down: Duration) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                failure_threshold: threshold,
                cool_down,
                success_threshold: 1,
            },
        )
    }

    #[tokio::test]
    async fn test_opens_after_consecutive_failures() {
        let cb = breaker(3, Duration::from_secs(60));

        for _ in 0..3 {
            let result = cb.call(async { Err::<(), _>(Fault::Down) }).await;
            assert!(matches!(result, Err(BreakerError::Inner(Fault::Down))));
        }
        assert_eq!(cb.state(), CircuitState::Open);

        let blocked = cb.call(async { Ok::<_, Fault>(()) }).await;
        assert!(matches!(blocked, Err(BreakerError::Open("test"))));
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let cb = breaker(2, Duration::from_secs(60));

        let _ = cb.call(async { Err::<(), _>(Fault::Down) }).await;
        let _ = cb.call(async { Ok::<_, Fault>(()) }).await;
        let _ = cb.call(async { Err::<(), _>(Fault::Down) }).await;

        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_trial_closes_breaker() {
        let cb = breaker(1, Duration::from_millis(50));

        let _ = cb.call(async { Err::<(), _>(Fault::Down) }).await;
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(80)).await;

        let result = cb.call(async { Ok::<_, Fault>(7) }).await;
        assert_eq!(result.ok(), Some(7));
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_rejections_do_not_open_breaker() {
        let cb = breaker(2, Duration::from_secs(60));

        for _ in 0..5 {
            let result = cb.call(async { Err::<(), _>(Fault::BadRequest) }).await;
            assert!(matches!(result, Err(BreakerError::Inner(Fault::BadRequest))));
        }
        assert_eq!(cb.state(), CircuitState::Closed);

        let result = cb.call(async { Ok::<_, Fault>(1) }).await;
        assert_eq!(result.ok(), Some(1));
    }

    #[tokio::test]
    async fn test_rejection_breaks_failure_streak() {
        let cb = breaker(2, Duration::from_secs(60));

        let _ = cb.call(async { Err::<(), _>(Fault::Down) }).await;
        let _ = cb.call(async { Err::<(), _>(Fault::BadRequest) }).await;
        let _ = cb.call(async { Err::<(), _>(Fault::Down) }).await;

        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(CircuitState::Open.as_gauge(), 1);
    }
}
