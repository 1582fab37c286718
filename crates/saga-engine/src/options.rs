use std::time::{Duration, Instant};

/// Bounded retry with a fixed delay between attempts.
///
/// `attempts` counts retries, not invocations: a policy with `attempts = N`
/// runs a failing step at most `N + 1` times. The default never retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// A policy that runs each step exactly once.
    pub const NONE: Self = Self {
        attempts: 0,
        delay: Duration::ZERO,
    };

    /// Allow `attempts` retries, sleeping `delay` before each one.
    #[must_use]
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Number of retries allowed after the first failure.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Time slept between a failed attempt and the next one.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Upper bound on how many times a step is invoked under this policy.
    #[must_use]
    pub fn max_invocations(&self) -> u32 {
        self.attempts.saturating_add(1)
    }
}

/// Options for a single saga run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    retry: RetryPolicy,
    deadline: Option<Instant>,
}

impl RunOptions {
    /// No retries and no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Retry every failing step up to `attempts` more times, sleeping `delay`
    /// before each retry.
    #[must_use]
    pub fn with_retry(self, attempts: u32, delay: Duration) -> Self {
        self.with_retry_policy(RetryPolicy::new(attempts, delay))
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Attach a deadline that steps can read from their [`StepContext`].
    ///
    /// [`StepContext`]: crate::StepContext
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attach a deadline `timeout` from now.
    ///
    /// A timeout too large to represent leaves the run without a deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    /// Retry policy applied to every step.
    #[must_use]
    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Deadline handed to steps, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_never_retry() {
        let options = RunOptions::default();

        assert_eq!(options.retry(), RetryPolicy::NONE);
        assert_eq!(options.retry().max_invocations(), 1);
        assert!(options.deadline().is_none());
    }

    #[test]
    fn with_retry_sets_attempts_and_delay() {
        let options = RunOptions::new().with_retry(3, Duration::from_millis(20));

        assert_eq!(options.retry().attempts(), 3);
        assert_eq!(options.retry().delay(), Duration::from_millis(20));
        assert_eq!(options.retry().max_invocations(), 4);
    }

    #[test]
    fn max_invocations_saturates() {
        let policy = RetryPolicy::new(u32::MAX, Duration::ZERO);
        assert_eq!(policy.max_invocations(), u32::MAX);
    }

    #[test]
    fn with_timeout_sets_future_deadline() {
        let before = Instant::now();
        let options = RunOptions::new().with_timeout(Duration::from_secs(5));

        let deadline = options.deadline().expect("deadline should be set");
        assert!(deadline >= before + Duration::from_secs(5));
    }

    #[test]
    fn with_deadline_keeps_retry_policy() {
        let deadline = Instant::now();
        let options = RunOptions::new()
            .with_retry(1, Duration::ZERO)
            .with_deadline(deadline);

        assert_eq!(options.deadline(), Some(deadline));
        assert_eq!(options.retry().attempts(), 1);
    }
}
