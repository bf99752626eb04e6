//! Retry logic.
//!
//! # Responsibilities
//! - Re-invoke a failed operation after a fixed delay
//! - Stop after `retry_limit` retries and hand back the last failure untouched
//! - Emit a notice before every retry (never before the first attempt)
//!
//! # Design Decisions
//! - Constant delay; no backoff growth, no jitter
//! - Every failure is retried the same way, the error is never inspected
//! - Counted loop instead of recursion, so large limits don't grow the stack

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::schema::RetryConfig;

/// Bounded linear retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pause before each retry.
    pub delay: Duration,
    /// Maximum number of retries after the first attempt.
    pub retry_limit: u32,
}

impl RetryPolicy {
    pub fn new(delay: Duration, retry_limit: u32) -> Self {
        Self { delay, retry_limit }
    }

    /// Run a blocking operation, sleeping the calling thread between attempts.
    ///
    /// `operation` names the work in retry notices.
    pub fn run<T, E, F>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.retry_limit => {
                    attempt += 1;
                    self.notify(operation, attempt, &e);
                    std::thread::sleep(self.delay);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Run an async operation, awaiting the delay between attempts.
    ///
    /// Attempts are still strictly sequential: the next one is not created
    /// until the previous future has resolved and the delay has elapsed.
    pub async fn run_async<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.retry_limit => {
                    attempt += 1;
                    self.notify(operation, attempt, &e);
                    tokio::time::sleep(self.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn notify(&self, operation: &str, attempt: u32, error: &dyn Display) {
        tracing::warn!(
            operation,
            attempt,
            retry_limit = self.retry_limit,
            delay_secs = self.delay.as_secs_f64(),
            error = %error,
            "Retrying {} after failure: {}",
            operation,
            error
        );
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        // Validation rejects delays that don't fit a Duration; clamp here too.
        let delay = if config.delay_secs > 0.0 {
            Duration::try_from_secs_f64(config.delay_secs).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };
        Self::new(delay, config.retry_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{self, Layer, SubscriberExt};

    #[derive(Debug, PartialEq)]
    struct Boom(u32);

    impl Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "boom #{}", self.0)
        }
    }

    #[test]
    fn test_returns_first_success_without_delay() {
        let policy = RetryPolicy::new(Duration::from_secs(60), 5);
        let calls = Cell::new(0);

        let result: Result<u32, Boom> = policy.run("op", || {
            calls.set(calls.get() + 1);
            Ok(7)
        });

        assert_eq!(result, Ok(7));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_succeeds_after_two_failures() {
        let policy = RetryPolicy::new(Duration::from_millis(20), 5);
        let calls = Cell::new(0);
        let started = Instant::now();

        let result = policy.run("op", || {
            calls.set(calls.get() + 1);
            if calls.get() <= 2 {
                Err(Boom(calls.get()))
            } else {
                Ok("done")
            }
        });

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.get(), 3);
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_always_failing_propagates_last_error() {
        let policy = RetryPolicy::new(Duration::ZERO, 5);
        let calls = Cell::new(0);

        let result: Result<(), Boom> = policy.run("op", || {
            calls.set(calls.get() + 1);
            Err(Boom(calls.get()))
        });

        assert_eq!(result, Err(Boom(6)));
        assert_eq!(calls.get(), 6);
    }

    #[test]
    fn test_zero_limit_attempts_once() {
        let policy = RetryPolicy::new(Duration::from_secs(60), 0);
        let calls = Cell::new(0);
        let started = Instant::now();

        let result: Result<(), Boom> = policy.run("op", || {
            calls.set(calls.get() + 1);
            Err(Boom(1))
        });

        assert_eq!(result, Err(Boom(1)));
        assert_eq!(calls.get(), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_policy_from_config() {
        let config = RetryConfig {
            delay_secs: 1.5,
            retry_limit: 3,
        };
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.delay, Duration::from_millis(1500));
        assert_eq!(policy.retry_limit, 3);
    }

    #[test]
    fn test_policy_from_negative_delay_clamps_to_zero() {
        let config = RetryConfig {
            delay_secs: -2.0,
            retry_limit: 1,
        };
        assert_eq!(RetryPolicy::from(&config).delay, Duration::ZERO);
    }

    #[test]
    fn test_policy_from_huge_delay_saturates() {
        let config = RetryConfig {
            delay_secs: 1e30,
            retry_limit: 1,
        };
        assert_eq!(RetryPolicy::from(&config).delay, Duration::MAX);
    }

    /// Counts WARN events seen while installed as the default subscriber.
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: layer::Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn count_warnings<R>(f: impl FnOnce() -> R) -> (R, usize) {
        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));
        let result = tracing::subscriber::with_default(subscriber, f);
        (result, warnings.load(Ordering::SeqCst))
    }

    #[test]
    fn test_notice_emitted_before_each_retry() {
        let policy = RetryPolicy::new(Duration::ZERO, 5);
        let calls = Cell::new(0);

        let (result, warnings) = count_warnings(|| {
            policy.run("op", || {
                calls.set(calls.get() + 1);
                if calls.get() <= 2 {
                    Err(Boom(calls.get()))
                } else {
                    Ok(())
                }
            })
        });

        assert_eq!(result, Ok(()));
        assert_eq!(warnings, 2);
    }

    #[test]
    fn test_notice_count_matches_retry_limit() {
        let policy = RetryPolicy::new(Duration::ZERO, 5);
        let (result, warnings) = count_warnings(|| policy.run("op", || Err::<(), _>(Boom(0))));
        assert!(result.is_err());
        assert_eq!(warnings, 5);

        let (_, warnings) = count_warnings(|| {
            RetryPolicy::new(Duration::ZERO, 0).run("op", || Err::<(), _>(Boom(0)))
        });
        assert_eq!(warnings, 0);

        let (_, warnings) = count_warnings(|| RetryPolicy::new(Duration::ZERO, 5).run("op", || Ok::<_, Boom>(1)));
        assert_eq!(warnings, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_waits_fixed_delay_per_retry() {
        let policy = RetryPolicy::new(Duration::from_secs(10), 5);
        let calls = Cell::new(0);
        let started = tokio::time::Instant::now();

        let result = policy
            .run_async("op", || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n <= 2 {
                        Err(Boom(n))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(3));
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(20) && waited < Duration::from_secs(21));
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_exhausts_limit_with_constant_delay() {
        let policy = RetryPolicy::new(Duration::from_secs(10), 5);
        let calls = Cell::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<(), Boom> = policy
            .run_async("op", || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move { Err(Boom(n)) }
            })
            .await;

        assert_eq!(result, Err(Boom(6)));
        assert_eq!(calls.get(), 6);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(50) && waited < Duration::from_secs(51));
    }
}
