use crate::context::StepContext;
use crate::step::{SagaStep, SinkStep, SourceStep};
use crate::value::{ErasedValue, Mismatch, downcast_cloned};

/// Why an erased step did not produce a value.
#[derive(Debug)]
pub(crate) enum ExecError<E> {
    /// The input was rejected before the step body ran.
    Mismatch(Mismatch),
    /// The step body ran and returned an error.
    Step(E),
}

impl<E> ExecError<E> {
    /// Only failures of the step body are worth another attempt.
    pub(crate) fn is_retryable(&self) -> bool {
        matches!(self, Self::Step(_))
    }
}

pub(crate) trait ErasedStep<Ctx, Err>: Send {
    fn name(&self) -> &'static str;

    fn exec(
        &self,
        ctx: &StepContext<'_, Ctx>,
        input: &dyn ErasedValue,
    ) -> Result<Box<dyn ErasedValue>, ExecError<Err>>;

    fn revoke(&self, ctx: &StepContext<'_, Ctx>) -> Result<(), Err>;
}

/// Adapter for input-to-output steps.
pub(crate) struct StepWrapper<S> {
    step: S,
}

impl<S> StepWrapper<S> {
    pub(crate) fn new(step: S) -> Self {
        Self { step }
    }
}

impl<S> ErasedStep<S::Context, S::Error> for StepWrapper<S>
where
    S: SagaStep,
{
    fn name(&self) -> &'static str {
        self.step.name()
    }

    fn exec(
        &self,
        ctx: &StepContext<'_, S::Context>,
        input: &dyn ErasedValue,
    ) -> Result<Box<dyn ErasedValue>, ExecError<S::Error>> {
        let typed_input = downcast_cloned::<S::Input>(input).map_err(ExecError::Mismatch)?;
        let output = self
            .step
            .execute(ctx, typed_input)
            .map_err(ExecError::Step)?;
        Ok(Box::new(output))
    }

    fn revoke(&self, ctx: &StepContext<'_, S::Context>) -> Result<(), S::Error> {
        self.step.revoke(ctx)
    }
}

/// Adapter for output-only steps; the incoming value is never inspected.
pub(crate) struct SourceWrapper<S> {
    step: S,
}

impl<S> SourceWrapper<S> {
    pub(crate) fn new(step: S) -> Self {
        Self { step }
    }
}

impl<S> ErasedStep<S::Context, S::Error> for SourceWrapper<S>
where
    S: SourceStep,
{
    fn name(&self) -> &'static str {
        self.step.name()
    }

    fn exec(
        &self,
        ctx: &StepContext<'_, S::Context>,
        _input: &dyn ErasedValue,
    ) -> Result<Box<dyn ErasedValue>, ExecError<S::Error>> {
        let output = self.step.execute(ctx).map_err(ExecError::Step)?;
        Ok(Box::new(output))
    }

    fn revoke(&self, ctx: &StepContext<'_, S::Context>) -> Result<(), S::Error> {
        self.step.revoke(ctx)
    }
}

/// Adapter for input-only steps; forwards `()` as its output.
pub(crate) struct SinkWrapper<S> {
    step: S,
}

impl<S> SinkWrapper<S> {
    pub(crate) fn new(step: S) -> Self {
        Self { step }
    }
}

impl<S> ErasedStep<S::Context, S::Error> for SinkWrapper<S>
where
    S: SinkStep,
{
    fn name(&self) -> &'static str {
        self.step.name()
    }

    fn exec(
        &self,
        ctx: &StepContext<'_, S::Context>,
        input: &dyn ErasedValue,
    ) -> Result<Box<dyn ErasedValue>, ExecError<S::Error>> {
        let typed_input = downcast_cloned::<S::Input>(input).map_err(ExecError::Mismatch)?;
        self.step
            .execute(ctx, typed_input)
            .map_err(ExecError::Step)?;
        Ok(Box::new(()))
    }

    fn revoke(&self, ctx: &StepContext<'_, S::Context>) -> Result<(), S::Error> {
        self.step.revoke(ctx)
    }
}
