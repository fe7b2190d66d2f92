//! Bounded polling used while waiting for remote state changes.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep};

/// Default delay between attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Default overall deadline.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(180);

/// Interval and deadline for a polling loop.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WaitPolicy {
    /// Delay between attempts.
    pub interval: Duration,
    /// Overall deadline measured from the first attempt.
    pub timeout: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }
}

/// Raised when a condition never held before the deadline.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
#[error("condition not met within {timeout:?}")]
pub struct WaitTimeout {
    /// Deadline that elapsed.
    pub timeout: Duration,
}

/// Polls `condition` until it returns `true` or the policy deadline passes.
///
/// The condition always runs at least once.
///
/// # Errors
///
/// Returns [`WaitTimeout`] when the deadline passes first.
pub async fn poll_until<F, Fut>(policy: WaitPolicy, mut condition: F) -> Result<(), WaitTimeout>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + policy.timeout;
    loop {
        if condition().await {
            return Ok(());
        }
        if Instant::now() + policy.interval > deadline {
            return Err(WaitTimeout {
                timeout: policy.timeout,
            });
        }
        sleep(policy.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FAST: WaitPolicy = WaitPolicy {
        interval: Duration::from_millis(1),
        timeout: Duration::from_millis(50),
    };

    #[tokio::test]
    async fn poll_until_returns_once_condition_holds() {
        let counter = AtomicUsize::new(0);
        let attempts = &counter;

        poll_until(FAST, || async move {
            attempts.fetch_add(1, Ordering::SeqCst) >= 2
        })
        .await
        .unwrap_or_else(|err| panic!("condition should be met: {err}"));

        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn poll_until_times_out() {
        let err = poll_until(FAST, || async { false })
            .await
            .expect_err("condition never holds");

        assert_eq!(err.timeout, FAST.timeout);
    }

    #[test]
    fn default_policy_matches_provider_cadence() {
        let policy = WaitPolicy::default();

        assert_eq!(policy.interval, Duration::from_secs(3));
        assert_eq!(policy.timeout, Duration::from_secs(180));
    }
}
