use std::time::Duration;

/// Calculate the delay before a retry attempt using exponential backoff.
///
/// The delay formula is: `base * 2^retry_count`
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use pkgfetch::core::retry_delay;
///
/// assert_eq!(retry_delay(0, Duration::from_millis(100)), Duration::from_millis(100));
/// assert_eq!(retry_delay(2, Duration::from_millis(100)), Duration::from_millis(400));
/// ```
pub fn retry_delay(retry_count: u32, base: Duration) -> Duration {
    let multiplier = 2_u32.saturating_pow(retry_count);
    base.saturating_mul(multiplier)
}

/// Attempt accounting for one fetch call.
///
/// A ceiling of `N` allows `N` retries after the first attempt, so a call
/// makes at most `N + 1` attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    remaining: u32,
    attempts:  u32,
}

impl RetryBudget {
    pub fn new(retries: u32) -> Self {
        Self {
            remaining: retries,
            attempts:  0,
        }
    }

    /// Mark the start of an attempt and return its 1-based number.
    pub fn start_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Spend one retry after a failed attempt.
    ///
    /// Returns `false` once the budget is exhausted.
    pub fn consume(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }

    pub fn attempts(&self) -> u32 { self.attempts }

    pub fn remaining(&self) -> u32 { self.remaining }

    /// Number of retries already spent.
    pub fn retries(&self) -> u32 { self.attempts.saturating_sub(1) }
}
