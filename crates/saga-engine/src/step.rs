use crate::context::StepContext;

/// A step that turns the previous step's output into a new value.
///
/// Each step can undo its effects through [`revoke`](SagaStep::revoke) if the
/// saga fails later on, or if the step itself failed after partially taking
/// effect.
///
/// `Input` must match whatever the preceding step produced; the check happens
/// at run time and a mismatch fails the run with `SagaError::TypeMismatch`.
/// `Context` is borrowed by every step of the saga and is never threaded.
pub trait SagaStep: Send {
    /// Value taken from the preceding step.
    type Input: Clone + Send + 'static;

    /// Value handed to the following step.
    type Output: Clone + Send + 'static;

    /// Caller-owned data shared by all steps of a saga.
    type Context;

    /// Returned from both `execute` and `revoke`.
    type Error;

    /// Name used in log events, audit records and error messages.
    fn name(&self) -> &'static str;

    /// Run the step body.
    ///
    /// Called once per attempt; a retried step receives the same input again.
    ///
    /// # Errors
    ///
    /// Returns the step's own error; the saga may retry it.
    fn execute(
        &self,
        ctx: &StepContext<'_, Self::Context>,
        input: Self::Input,
    ) -> Result<Self::Output, Self::Error>;

    /// Undo whatever `execute` did.
    ///
    /// Does nothing by default, which fits steps without side effects.
    ///
    /// # Errors
    ///
    /// Returns an error if the effects could not be undone; revocation of the
    /// remaining steps stops there.
    fn revoke(&self, ctx: &StepContext<'_, Self::Context>) -> Result<(), Self::Error> {
        let _ = ctx;
        Ok(())
    }
}

/// A step that produces a value from its context alone.
///
/// Whatever the previous step produced is ignored, so a source step can open a
/// saga or start an independent part of it.
pub trait SourceStep: Send {
    /// Value handed to the following step.
    type Output: Clone + Send + 'static;

    /// Caller-owned data shared by all steps of a saga.
    type Context;

    /// Returned from both `execute` and `revoke`.
    type Error;

    /// Name used in log events, audit records and error messages.
    fn name(&self) -> &'static str;

    /// Produce a value; called once per attempt.
    ///
    /// # Errors
    ///
    /// Returns the step's own error.
    fn execute(&self, ctx: &StepContext<'_, Self::Context>) -> Result<Self::Output, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the effects could not be undone.
    fn revoke(&self, ctx: &StepContext<'_, Self::Context>) -> Result<(), Self::Error> {
        let _ = ctx;
        Ok(())
    }
}

/// A step that consumes the previous value without producing one.
///
/// The saga forwards `()` after a sink step, which makes it a natural terminal
/// side effect.
pub trait SinkStep: Send {
    /// Value taken from the preceding step.
    type Input: Clone + Send + 'static;

    /// Caller-owned data shared by all steps of a saga.
    type Context;

    /// Returned from both `execute` and `revoke`.
    type Error;

    /// Name used in log events, audit records and error messages.
    fn name(&self) -> &'static str;

    /// Consume the value; called once per attempt.
    ///
    /// # Errors
    ///
    /// Returns the step's own error.
    fn execute(
        &self,
        ctx: &StepContext<'_, Self::Context>,
        input: Self::Input,
    ) -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the effects could not be undone.
    fn revoke(&self, ctx: &StepContext<'_, Self::Context>) -> Result<(), Self::Error> {
        let _ = ctx;
        Ok(())
    }
}
