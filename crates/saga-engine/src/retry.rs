use std::thread;

use tracing::debug;

use crate::erased::ExecError;
use crate::options::RetryPolicy;

/// Result of running a step under a retry policy.
#[derive(Debug)]
pub(crate) struct RetryOutcome<T, E> {
    pub(crate) result: Result<T, ExecError<E>>,
    /// How many times the attempt closure was called.
    pub(crate) attempts: u32,
}

/// Call `attempt` until it succeeds, fails with a non-retryable error, or the
/// policy's retries are used up.
///
/// The delay is a blocking sleep on the calling thread and happens even when
/// it is zero. Cancellation is not observed here.
pub(crate) fn run_with_retry<T, E>(
    policy: RetryPolicy,
    step: &str,
    mut attempt: impl FnMut() -> Result<T, ExecError<E>>,
) -> RetryOutcome<T, E> {
    let mut retries = 0_u32;

    loop {
        let result = attempt();
        let exhausted = retries >= policy.attempts();

        match result {
            Err(error) if error.is_retryable() && !exhausted => {
                retries += 1;
                debug!(
                    step,
                    retry = retries,
                    max_retries = policy.attempts(),
                    delay = ?policy.delay(),
                    "step failed, retrying"
                );
                thread::sleep(policy.delay());
            }
            result => {
                return RetryOutcome {
                    result,
                    attempts: retries + 1,
                };
            }
        }
    }
}
