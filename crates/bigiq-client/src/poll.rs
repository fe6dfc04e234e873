//! Bounded, cancellable status polling.
//!
//! Lifecycle waits (activation, license task, pool member) share one loop:
//! probe, then sleep with exponential backoff, until the probe reports a
//! terminal result, the probe fails, the deadline or attempt cap is hit, or
//! the caller cancels. Transport errors from the probe end the loop; they are
//! not retried here.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::BigIqError;

/// Spacing and bounds for a poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay after the first pending probe.
    pub interval: Duration,
    /// Upper bound on the delay between probes.
    pub max_interval: Duration,
    /// Backoff factor applied to the delay after each pending probe.
    pub multiplier: u32,
    /// Overall deadline measured from the first probe. A probe still in
    /// flight when it passes is abandoned.
    pub max_wait: Duration,
    /// Optional cap on the number of probes.
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            max_interval: Duration::from_millis(15_000),
            multiplier: 2,
            max_wait: Duration::from_secs(600),
            max_attempts: None,
        }
    }
}

impl PollPolicy {
    /// Millisecond-scale policy for mock servers.
    pub fn fast() -> Self {
        Self {
            interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(5),
            multiplier: 2,
            max_wait: Duration::from_secs(5),
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    fn next_delay(&self, current: Duration) -> Duration {
        current
            .saturating_mul(self.multiplier.max(1))
            .min(self.max_interval)
    }
}

/// Outcome of one probe.
#[derive(Debug)]
pub(crate) enum PollStep<T> {
    /// Terminal success; the loop returns this value.
    Done(T),
    /// Not terminal yet; carries the observed status for diagnostics.
    Pending(String),
}

/// Run `probe` until it reports [`PollStep::Done`] or fails.
///
/// Returns `DeadlineExceeded` with the last observed status once
/// `policy.max_wait` has elapsed (even mid-probe) or `policy.max_attempts`
/// probes were spent, and `Cancelled` as soon as `cancel` fires, whether
/// mid-probe or mid-sleep.
pub(crate) async fn poll_until<T, F, Fut>(
    operation: &str,
    policy: &PollPolicy,
    cancel: &CancellationToken,
    mut probe: F,
) -> Result<T, BigIqError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollStep<T>, BigIqError>>,
{
    let started = Instant::now();
    let deadline = started + policy.max_wait;
    let mut delay = policy.interval;
    let mut attempt: u32 = 0;
    let mut last_status = String::from("no status observed");

    loop {
        attempt += 1;
        let step = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(operation)),
            step = probe() => step?,
            _ = tokio::time::sleep_until(deadline) => {
                return Err(deadline_exceeded(operation, attempt, started.elapsed(), last_status));
            }
        };

        last_status = match step {
            PollStep::Done(value) => return Ok(value),
            PollStep::Pending(status) => status,
        };

        let waited = started.elapsed();
        let attempts_spent = policy.max_attempts.is_some_and(|max| attempt >= max);
        if attempts_spent || waited >= policy.max_wait {
            return Err(deadline_exceeded(operation, attempt, waited, last_status));
        }

        let sleep_for = delay.min(policy.max_wait - waited);
        tracing::debug!(
            operation,
            attempt,
            status = %last_status,
            "not terminal yet, polling again in {sleep_for:?}"
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(operation)),
            _ = tokio::time::sleep(sleep_for) => {}
        }
        delay = policy.next_delay(delay);
    }
}

fn deadline_exceeded(operation: &str, attempt: u32, waited: Duration, last_status: String) -> BigIqError {
    tracing::warn!(
        operation,
        attempt,
        status = %last_status,
        "giving up after {waited:?}"
    );
    BigIqError::DeadlineExceeded {
        operation: operation.to_string(),
        waited,
        last_status,
    }
}

fn cancelled(operation: &str) -> BigIqError {
    tracing::info!(operation, "poll cancelled");
    BigIqError::Cancelled {
        operation: operation.to_string(),
    }
}
