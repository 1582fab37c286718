use std::time::{Duration, Instant};

use crate::cancel::SagaHandle;

/// Execution context handed to every step.
///
/// Carries the caller's shared dependencies, a handle that can cancel the
/// running saga from arbitrarily nested code, and the optional deadline the
/// run was started with. The engine never enforces the deadline; steps that
/// block are expected to honour it.
pub struct StepContext<'a, Ctx> {
    data: &'a Ctx,
    saga: &'a SagaHandle,
    deadline: Option<Instant>,
}

impl<'a, Ctx> StepContext<'a, Ctx> {
    pub(crate) fn new(data: &'a Ctx, saga: &'a SagaHandle, deadline: Option<Instant>) -> Self {
        Self {
            data,
            saga,
            deadline,
        }
    }

    /// Shared dependencies supplied by the caller of `run`.
    #[must_use]
    pub fn data(&self) -> &'a Ctx {
        self.data
    }

    /// Handle of the saga executing this step.
    ///
    /// Clone it to cancel from another thread or from code further down the
    /// call chain.
    #[must_use]
    pub fn saga(&self) -> &'a SagaHandle {
        self.saga
    }

    /// Shorthand for `self.saga().is_cancelled()`.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.saga.is_cancelled()
    }

    /// Deadline of the current run; the engine itself never enforces it.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline, saturating at zero.
    #[must_use]
    pub fn time_remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Whether the deadline has passed. Always `false` without one.
    #[must_use]
    pub fn deadline_exceeded(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}
