use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

// ============================================================================
// Backoff retry for idempotent partner reads
// ============================================================================
//
// Only idempotent calls (carrier tracking, carrier login) go through here.
// Shipment creation must never be wrapped: a retried create can book a
// second shipment at the carrier.
//
// ============================================================================

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    fn next_delay(&self, current: Duration) -> Duration {
        let scaled = (current.as_millis() as f64 * self.multiplier) as u64;
        Duration::from_millis(scaled).min(self.max_delay)
    }
}

/// Classifies an error as worth another attempt
pub trait IsTransient {
    fn is_transient(&self) -> bool;
}

/// Run `operation` until it succeeds, fails permanently, or attempts run out.
/// The last error is returned unchanged.
pub async fn retry_transient<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display + IsTransient,
{
    let mut attempt = 0;
    let mut delay = policy.initial_delay;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(
                        operation = operation_name,
                        attempt = attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(error) if !error.is_transient() => {
                tracing::debug!(
                    operation = operation_name,
                    error = %error,
                    "Permanent failure, not retrying"
                );
                return Err(error);
            }
            Err(error) if attempt >= policy.max_attempts => {
                tracing::warn!(
                    operation = operation_name,
                    attempt = attempt,
                    error = %error,
                    "Giving up after final attempt"
                );
                return Err(error);
            }
            Err(error) => {
                tracing::warn!(
                    operation = operation_name,
                    attempt = attempt,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "Transient failure, backing off"
                );
                sleep(delay).await;
                delay = policy.next_delay(delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Flaky(bool);

    impl std::fmt::Display for Flaky {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "flaky(transient={})", self.0)
        }
    }

    impl IsTransient for Flaky {
        fn is_transient(&self) -> bool {
            self.0
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = retry_transient(&fast_policy(3), "track", |_| {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Flaky(true))
                } else {
                    Ok("delivered")
                }
            }
        })
        .await;

        assert_eq!(result.ok(), Some("delivered"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_stops_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), Flaky> = retry_transient(&fast_policy(5), "track", |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Flaky(false))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let result: Result<(), Flaky> =
            retry_transient(&fast_policy(2), "track", |_| async { Err(Flaky(true)) }).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = fast_policy(3);
        assert_eq!(
            policy.next_delay(Duration::from_millis(15)),
            Duration::from_millis(20)
        );
    }
}
