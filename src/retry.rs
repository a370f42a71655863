//! Bounded retry with a fixed backoff.
//!
//! Used at startup for resources that may not exist yet when the process
//! launches, such as the log forwarding socket. Blocking on purpose: it runs
//! before the async runtime serves anything.

use std::fmt;
use std::thread;
use std::time::Duration;

use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Total attempts are `max_retries + 1`.
    pub max_retries: u32,
    /// Sleep between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, backoff: Duration) -> Self {
        Self { max_retries, backoff }
    }
}

/// Two minutes of one-second retries.
impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(120, Duration::from_secs(1))
    }
}

/// Every attempt failed. Carries the last error.
#[derive(Debug, thiserror::Error)]
#[error("gave up after {attempts} attempts: {last}")]
pub struct RetryError<E> {
    pub attempts: u32,
    #[source]
    pub last: E,
}

/// Calls `op` until it succeeds or the policy is exhausted.
///
/// Each failure is logged at `warn` with the attempt number.
pub fn retry<T, E, F>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, RetryError<E>>
where
    E: fmt::Display,
    F: FnMut() -> Result<T, E>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if attempt > policy.max_retries => {
                return Err(RetryError { attempts: attempt, last: e });
            }
            Err(e) => {
                warn!(attempt, error = %e, "could not {what}");
                thread::sleep(policy.backoff);
            }
        }
    }
}
