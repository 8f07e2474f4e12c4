pub mod circuit_breaker;
pub mod keyed_lock;
pub mod retry;
pub mod sweep_guard;

pub use circuit_breaker::{BreakerError, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use keyed_lock::KeyedLocks;
pub use retry::{retry_transient, IsTransient, RetryPolicy};
pub use sweep_guard::{SweepGuard, SweepPermit};
