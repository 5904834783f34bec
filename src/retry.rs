//! Fixed-delay retry for unreliable collaborator calls.
//!
//! Sensor reads, network joins and uplinks all use the same policy shape:
//! try up to `max_attempts` times, wait `delay_ms` between attempts, give up.
//! There is no backoff and no wall-clock deadline; a slow collaborator makes
//! the whole sequence slower.
//!
//! # Example
//!
//! ```rust
//! use rs_conductor::retry::RetryPolicy;
//! use rs_conductor::hal::MockDelay;
//!
//! let policy = RetryPolicy::new(3, 5000);
//! let mut delay = MockDelay::new();
//!
//! let mut calls = 0;
//! let result: Result<((), u32), _> = policy.run(&mut delay, |_| {
//!     calls += 1;
//!     Err("no gateway")
//! });
//!
//! let err = result.unwrap_err();
//! assert_eq!(err.attempts, 3);
//! assert_eq!(calls, 3);
//! assert_eq!(delay.total_ms(), 10_000); // no delay after the last attempt
//! ```

use embedded_hal::delay::DelayNs;

/// Attempt count and fixed delay between attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetryPolicy {
    /// Maximum number of attempts (0 behaves as 1).
    pub max_attempts: u32,
    /// Delay between consecutive attempts in milliseconds.
    pub delay_ms: u32,
}

/// All attempts failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryError<E> {
    /// Number of attempts made.
    pub attempts: u32,
    /// Error from the final attempt.
    pub last: E,
}

impl RetryPolicy {
    /// Create a policy.
    pub const fn new(max_attempts: u32, delay_ms: u32) -> Self {
        Self {
            max_attempts,
            delay_ms,
        }
    }

    /// Effective attempt count.
    #[inline]
    pub const fn attempts(&self) -> u32 {
        if self.max_attempts == 0 {
            1
        } else {
            self.max_attempts
        }
    }

    /// Run `op` until it succeeds or the attempts are exhausted.
    ///
    /// `op` receives the zero-based attempt index. On success returns the
    /// value together with the number of attempts used.
    pub fn run<T, E, D, F>(&self, delay: &mut D, op: F) -> Result<(T, u32), RetryError<E>>
    where
        D: DelayNs,
        F: FnMut(u32) -> Result<T, E>,
    {
        self.run_with_hook(delay, |_, _, _| {}, op)
    }

    /// Like [`run`](Self::run), calling `on_retry(delay, failed_attempt, &err)`
    /// after each failed attempt that will be retried, before the wait.
    pub fn run_with_hook<T, E, D, H, F>(
        &self,
        delay: &mut D,
        mut on_retry: H,
        mut op: F,
    ) -> Result<(T, u32), RetryError<E>>
    where
        D: DelayNs,
        H: FnMut(&mut D, u32, &E),
        F: FnMut(u32) -> Result<T, E>,
    {
        let attempts = self.attempts();
        let mut attempt = 0;
        loop {
            match op(attempt) {
                Ok(value) => return Ok((value, attempt + 1)),
                Err(err) => {
                    attempt += 1;
                    if attempt >= attempts {
                        return Err(RetryError {
                            attempts: attempt,
                            last: err,
                        });
                    }
                    on_retry(delay, attempt, &err);
                    delay.delay_ms(self.delay_ms);
                }
            }
        }
    }
}
