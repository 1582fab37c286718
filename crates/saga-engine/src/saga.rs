use std::fmt::Debug;
use std::marker::PhantomData;

use tracing::{debug, info};

use crate::audit::SagaAuditLog;
use crate::builder::SagaBuilder;
use crate::cancel::{Cancellable, SagaHandle};
use crate::context::StepContext;
use crate::erased::{ErasedStep, ExecError};
use crate::error::SagaError;
use crate::options::RunOptions;
use crate::retry::run_with_retry;
use crate::value::{ErasedValue, downcast_cloned, downcast_owned};

/// Lifecycle of a saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SagaState {
    /// `run` has not been called.
    NotStarted,
    /// Steps are executing.
    Running,
    /// Every step succeeded.
    Completed,
    /// A step failed or its input was rejected.
    Failed,
    /// The run stopped before a step because cancellation was requested.
    Cancelled,
}

/// A saga ready for execution.
///
/// Steps run in registration order, each receiving the previous step's
/// output. A saga runs at most once; afterwards [`revoke`](Saga::revoke) undoes
/// the steps that were attempted, in reverse order.
pub struct Saga<R, Ctx, E> {
    steps: Vec<Box<dyn ErasedStep<Ctx, E>>>,
    cursor: usize,
    attempted: usize,
    result: Box<dyn ErasedValue>,
    state: SagaState,
    handle: SagaHandle,
    audit_log: SagaAuditLog,
    _result: PhantomData<fn() -> R>,
}

impl<R, Ctx, E> Saga<R, Ctx, E>
where
    R: Clone + Send + 'static,
    E: Debug,
{
    /// Start registering steps for a new saga.
    #[must_use]
    pub fn builder() -> SagaBuilder<R, Ctx, E> {
        SagaBuilder::new()
    }

    pub(crate) fn from_steps(steps: Vec<Box<dyn ErasedStep<Ctx, E>>>) -> Self {
        Self {
            steps,
            cursor: 0,
            attempted: 0,
            result: Box::new(()),
            state: SagaState::NotStarted,
            handle: SagaHandle::new(),
            audit_log: SagaAuditLog::new(),
            _result: PhantomData,
        }
    }

    /// Run the saga with `()` as the first step's input.
    ///
    /// Use this when the saga opens with a source step.
    ///
    /// # Errors
    ///
    /// See [`run_with_input`](Saga::run_with_input).
    pub fn run(&mut self, ctx: &Ctx, options: &RunOptions) -> Result<(), SagaError<E>> {
        self.run_with_input(ctx, (), options)
    }

    /// Run the saga, handing `input` to the first step.
    ///
    /// Cancellation is checked before each step; a step that has started
    /// always finishes its current attempt and any remaining retries.
    ///
    /// `input` must have exactly the first step's input type. An unsuffixed
    /// integer literal is inferred as `i32`, so write `0_u32` for a step that
    /// takes a `u32`.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::AlreadyStarted` if the saga was run before; nothing
    /// is executed in that case.
    /// Returns `SagaError::Cancelled` if cancellation was requested.
    /// Returns `SagaError::TypeMismatch` if a step's input is not of its
    /// declared type.
    /// Returns `SagaError::StepFailed` with the step's own error once its
    /// retries are exhausted.
    pub fn run_with_input<I>(
        &mut self,
        ctx: &Ctx,
        input: I,
        options: &RunOptions,
    ) -> Result<(), SagaError<E>>
    where
        I: Clone + Send + 'static,
    {
        if !self.handle.signal().arm() {
            debug!(state = ?self.state, "refusing to run a saga twice");
            return Err(SagaError::AlreadyStarted);
        }

        self.state = SagaState::Running;
        self.result = Box::new(input);
        debug!(
            steps = self.steps.len(),
            retries = options.retry().attempts(),
            "starting saga"
        );

        let outcome = self.execute_steps(ctx, options);
        self.state = match &outcome {
            Ok(()) => SagaState::Completed,
            Err(SagaError::Cancelled) => SagaState::Cancelled,
            Err(_) => SagaState::Failed,
        };
        debug!(state = ?self.state, cursor = self.cursor, "saga finished");
        outcome
    }

    fn execute_steps(&mut self, ctx: &Ctx, options: &RunOptions) -> Result<(), SagaError<E>> {
        let policy = options.retry();
        let step_ctx = StepContext::new(ctx, &self.handle, options.deadline());

        for (index, step) in self.steps.iter().enumerate() {
            self.cursor = index;
            let name = step.name();

            if self.handle.is_cancelled() {
                info!(step = name, index, "saga cancelled before step");
                self.audit_log.record_cancelled(index);
                return Err(SagaError::Cancelled);
            }

            debug!(step = name, index, "executing step");
            self.audit_log.record_start(index, name);

            let input = self.result.as_ref();
            let outcome = run_with_retry(policy, name, || step.exec(&step_ctx, input));

            match outcome.result {
                Ok(output) => {
                    self.attempted = index + 1;
                    self.audit_log.record_success(outcome.attempts);
                    self.result = output;
                }
                Err(ExecError::Mismatch(mismatch)) => {
                    self.audit_log.record_rejected();
                    self.result = Box::new(());
                    return Err(SagaError::type_mismatch(
                        format!("input of step '{name}'"),
                        mismatch,
                    ));
                }
                Err(ExecError::Step(source)) => {
                    self.attempted = index + 1;
                    self.audit_log.record_failure(outcome.attempts);
                    self.result = Box::new(());
                    return Err(SagaError::StepFailed {
                        step: name.to_string(),
                        attempts: outcome.attempts,
                        source,
                    });
                }
            }
        }

        self.cursor = self.steps.len();
        Ok(())
    }

    /// Revoke attempted steps in reverse order, starting from the last one.
    ///
    /// Only steps whose body ran at least once are revoked. The walk stops at
    /// the first failing revoke, leaving the earlier steps untouched. Revoke is
    /// not idempotent: calling it again revokes the same steps again.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::RevokeFailed` with the step's own error.
    pub fn revoke(&mut self, ctx: &Ctx) -> Result<(), SagaError<E>> {
        let step_ctx = StepContext::new(ctx, &self.handle, None);
        debug!(steps = self.attempted, "revoking saga");

        for (index, step) in self.steps.iter().enumerate().take(self.attempted).rev() {
            let name = step.name();
            debug!(step = name, index, "revoking step");

            if let Err(source) = step.revoke(&step_ctx) {
                self.audit_log.record_revoke_failed(index);
                return Err(SagaError::RevokeFailed {
                    step: name.to_string(),
                    source,
                });
            }
            self.audit_log.record_revoked(index);
        }

        Ok(())
    }

    /// Request cancellation; see [`SagaHandle::cancel`].
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// A handle that can cancel this saga from elsewhere, including other
    /// threads.
    #[must_use]
    pub fn handle(&self) -> SagaHandle {
        self.handle.clone()
    }

    /// The final value of a completed run.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::Cancelled` if cancellation was requested.
    /// Returns `SagaError::TypeMismatch` if the stored value is not an `R`,
    /// which is the case for a saga that did not complete.
    pub fn result(&self) -> Result<R, SagaError<E>> {
        if self.handle.is_cancelled() {
            return Err(SagaError::Cancelled);
        }
        downcast_cloned::<R>(self.result.as_ref())
            .map_err(|mismatch| SagaError::type_mismatch("saga result", mismatch))
    }

    /// Consume the saga and return its final value without cloning.
    ///
    /// # Errors
    ///
    /// Same as [`result`](Saga::result).
    pub fn into_result(self) -> Result<R, SagaError<E>> {
        if self.handle.is_cancelled() {
            return Err(SagaError::Cancelled);
        }
        downcast_owned::<R>(self.result)
            .map_err(|mismatch| SagaError::type_mismatch("saga result", mismatch))
    }

    /// Index of the step last attempted; equals [`len`](Saga::len) after a
    /// completed run.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Where the saga is in its lifecycle.
    #[must_use]
    pub fn state(&self) -> SagaState {
        self.state
    }

    /// Number of registered steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the saga has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step history of the run and any revocation that followed.
    #[must_use]
    pub fn audit_log(&self) -> &SagaAuditLog {
        &self.audit_log
    }
}

impl<R, Ctx, E> Cancellable for Saga<R, Ctx, E> {
    fn cancel(&self) {
        self.handle.cancel();
    }
}
