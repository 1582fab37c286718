use std::fmt::Debug;
use std::marker::PhantomData;

use crate::erased::{ErasedStep, SinkWrapper, SourceWrapper, StepWrapper};
use crate::saga::Saga;
use crate::step::{SagaStep, SinkStep, SourceStep};

/// Builder that registers the steps of a saga in execution order.
///
/// Steps are stored type-erased, so the chain of input and output types is
/// checked when the saga runs rather than when it is built: a step whose
/// input does not match the previous output fails the run with
/// `SagaError::TypeMismatch` before its body is invoked.
///
/// The builder is consumed by [`build`](SagaBuilder::build), so the step list
/// of a saga can never change once it exists.
///
/// ```
/// use saga_engine::{RunOptions, Saga, SagaStep, StepContext};
///
/// struct Greet;
///
/// impl SagaStep for Greet {
///     type Input = String;
///     type Output = String;
///     type Context = ();
///     type Error = std::io::Error;
///
///     fn name(&self) -> &'static str {
///         "greet"
///     }
///
///     fn execute(&self, _: &StepContext<'_, ()>, input: String) -> Result<String, Self::Error> {
///         Ok(format!("hello {input}"))
///     }
/// }
///
/// let mut saga: Saga<String, (), std::io::Error> = Saga::builder().step(Greet).build();
/// saga.run_with_input(&(), "world".to_string(), &RunOptions::default())?;
/// assert_eq!(saga.result()?, "hello world");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct SagaBuilder<R, Ctx, E> {
    steps: Vec<Box<dyn ErasedStep<Ctx, E>>>,
    _result: PhantomData<fn() -> R>,
}

impl<R, Ctx, E> SagaBuilder<R, Ctx, E> {
    /// Create a builder with no steps.
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            _result: PhantomData,
        }
    }

    /// Register a step that maps the previous output to a new value.
    #[must_use]
    pub fn step<S>(mut self, step: S) -> Self
    where
        S: SagaStep<Context = Ctx, Error = E> + 'static,
    {
        self.steps.push(Box::new(StepWrapper::new(step)));
        self
    }

    /// Register a step that produces a value without consuming one.
    #[must_use]
    pub fn source<S>(mut self, step: S) -> Self
    where
        S: SourceStep<Context = Ctx, Error = E> + 'static,
    {
        self.steps.push(Box::new(SourceWrapper::new(step)));
        self
    }

    /// Register a step that consumes the previous output and forwards `()`.
    #[must_use]
    pub fn sink<S>(mut self, step: S) -> Self
    where
        S: SinkStep<Context = Ctx, Error = E> + 'static,
    {
        self.steps.push(Box::new(SinkWrapper::new(step)));
        self
    }

    /// Number of steps registered so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no step has been registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Build the saga from the registered steps.
    #[must_use]
    pub fn build(self) -> Saga<R, Ctx, E>
    where
        R: Clone + Send + 'static,
        E: Debug,
    {
        Saga::from_steps(self.steps)
    }
}

impl<R, Ctx, E> Default for SagaBuilder<R, Ctx, E> {
    fn default() -> Self {
        Self::new()
    }
}
