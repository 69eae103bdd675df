//! Bounded retry with exponential backoff for calls to external services.

use std::thread;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_secs(1) }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), base_delay }
    }

    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Delay after the failed attempt numbered `attempt` (0-based): `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Run `op` until it succeeds or `max_attempts` is exhausted; the last
    /// error is returned unchanged.
    pub fn run<T, F>(&self, what: &str, mut op: F) -> anyhow::Result<T>
    where
        F: FnMut(u32) -> anyhow::Result<T>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op(attempt) {
                Ok(v) => return Ok(v),
                Err(e) if attempt + 1 < attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(operation = what, attempt = attempt + 1, max_attempts = attempts, delay_ms = delay.as_millis() as u64, error = %e, "retrying after failure");
                    if !delay.is_zero() { thread::sleep(delay); }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn succeeds_after_transient_failures() {
        let policy = RetryPolicy::immediate(3);
        let mut calls = 0;
        let out = policy.run("flaky", |attempt| {
            calls += 1;
            if attempt < 2 { anyhow::bail!("transient") } else { Ok(attempt) }
        });
        assert_eq!(out.unwrap(), 2);
        assert_eq!(calls, 3);
    }

    #[test]
    fn propagates_last_error_when_exhausted() {
        let policy = RetryPolicy::immediate(2);
        let mut calls = 0;
        let out: anyhow::Result<()> = policy.run("down", |attempt| {
            calls += 1;
            anyhow::bail!("failure {attempt}")
        });
        assert_eq!(calls, 2);
        assert_eq!(out.unwrap_err().to_string(), "failure 1");
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    }
}
