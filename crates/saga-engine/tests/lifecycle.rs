//! Integration tests for the run-once lifecycle and cooperative cancellation.

use std::cell::Cell;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use saga_engine::{
    Cancellable, RunOptions, Saga, SagaError, SagaHandle, SagaState, SagaStep, StepContext,
};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct TestError(String);

struct CountingContext {
    calls: [Cell<u32>; 3],
}

impl CountingContext {
    fn new() -> Self {
        Self {
            calls: [Cell::new(0), Cell::new(0), Cell::new(0)],
        }
    }

    fn calls(&self) -> [u32; 3] {
        [self.calls[0].get(), self.calls[1].get(), self.calls[2].get()]
    }
}

struct CountingStep {
    slot: usize,
}

impl SagaStep for CountingStep {
    type Input = u32;
    type Output = u32;
    type Context = CountingContext;
    type Error = TestError;

    fn name(&self) -> &'static str {
        "counting"
    }

    fn execute(
        &self,
        ctx: &StepContext<'_, Self::Context>,
        input: Self::Input,
    ) -> Result<Self::Output, Self::Error> {
        let counter = &ctx.data().calls[self.slot];
        counter.set(counter.get() + 1);
        Ok(input + 1)
    }
}

fn counting_saga() -> Saga<u32, CountingContext, TestError> {
    Saga::builder()
        .step(CountingStep { slot: 0 })
        .step(CountingStep { slot: 1 })
        .step(CountingStep { slot: 2 })
        .build()
}

#[test]
fn second_run_is_rejected_without_executing_steps() -> anyhow::Result<()> {
    let ctx = CountingContext::new();
    let mut saga = counting_saga();

    saga.run_with_input(&ctx, 0_u32, &RunOptions::default())?;
    assert_eq!(ctx.calls(), [1, 1, 1]);

    let err = saga
        .run_with_input(&ctx, 0_u32, &RunOptions::default())
        .expect_err("second run should be rejected");

    assert!(matches!(err, SagaError::AlreadyStarted));
    assert_eq!(ctx.calls(), [1, 1, 1]);
    assert_eq!(saga.state(), SagaState::Completed);
    assert_eq!(saga.result()?, 3);
    Ok(())
}

#[test]
fn failed_saga_cannot_be_rerun() {
    struct Fails;

    impl SagaStep for Fails {
        type Input = u32;
        type Output = u32;
        type Context = CountingContext;
        type Error = TestError;

        fn name(&self) -> &'static str {
            "fails"
        }

        fn execute(
            &self,
            ctx: &StepContext<'_, Self::Context>,
            _input: Self::Input,
        ) -> Result<Self::Output, Self::Error> {
            let counter = &ctx.data().calls[0];
            counter.set(counter.get() + 1);
            Err(TestError("nope".to_string()))
        }
    }

    let ctx = CountingContext::new();
    let mut saga: Saga<u32, CountingContext, TestError> = Saga::builder().step(Fails).build();

    let first = saga
        .run_with_input(&ctx, 0_u32, &RunOptions::default())
        .expect_err("step should fail");
    assert!(matches!(first, SagaError::StepFailed { .. }));
    assert_eq!(ctx.calls(), [1, 0, 0]);

    let err = saga
        .run_with_input(&ctx, 0_u32, &RunOptions::default())
        .expect_err("rerun should be rejected");

    assert!(matches!(err, SagaError::AlreadyStarted));
    assert_eq!(ctx.calls(), [1, 0, 0]);
    assert_eq!(saga.state(), SagaState::Failed);
}

#[test]
fn cancel_before_run_is_a_no_op() -> anyhow::Result<()> {
    let ctx = CountingContext::new();
    let mut saga = counting_saga();
    let handle = saga.handle();

    handle.cancel();
    saga.cancel();
    assert!(!handle.is_cancelled());
    assert!(!handle.is_started());

    saga.run_with_input(&ctx, 0_u32, &RunOptions::default())?;

    assert!(handle.is_started());
    assert_eq!(ctx.calls(), [1, 1, 1]);
    Ok(())
}

#[test]
fn cancel_after_completion_turns_result_into_cancelled() -> anyhow::Result<()> {
    let ctx = CountingContext::new();
    let mut saga = counting_saga();

    saga.run_with_input(&ctx, 0_u32, &RunOptions::default())?;
    saga.cancel();

    let err = saga.result().expect_err("result should report cancellation");
    assert!(err.is_cancelled());
    Ok(())
}

struct HandshakeContext {
    started: Sender<()>,
    proceed: Receiver<()>,
    executed: Cell<Vec<&'static str>>,
}

impl HandshakeContext {
    fn push(&self, name: &'static str) {
        let mut executed = self.executed.take();
        executed.push(name);
        self.executed.set(executed);
    }
}

/// Signals that it started, then blocks until told to finish.
struct BlockingStep;

impl SagaStep for BlockingStep {
    type Input = ();
    type Output = ();
    type Context = HandshakeContext;
    type Error = TestError;

    fn name(&self) -> &'static str {
        "blocking"
    }

    fn execute(
        &self,
        ctx: &StepContext<'_, Self::Context>,
        _input: Self::Input,
    ) -> Result<Self::Output, Self::Error> {
        let data = ctx.data();
        data.started
            .send(())
            .map_err(|e| TestError(e.to_string()))?;
        data.proceed
            .recv_timeout(Duration::from_secs(10))
            .map_err(|e| TestError(e.to_string()))?;
        data.push("blocking");
        Ok(())
    }
}

struct NamedStep(&'static str);

impl SagaStep for NamedStep {
    type Input = ();
    type Output = ();
    type Context = HandshakeContext;
    type Error = TestError;

    fn name(&self) -> &'static str {
        self.0
    }

    fn execute(
        &self,
        ctx: &StepContext<'_, Self::Context>,
        _input: Self::Input,
    ) -> Result<Self::Output, Self::Error> {
        ctx.data().push(self.0);
        Ok(())
    }
}

#[test]
fn cancellation_from_another_thread_waits_for_running_step() {
    let (started_tx, started_rx) = mpsc::channel();
    let (proceed_tx, proceed_rx) = mpsc::channel();
    let ctx = HandshakeContext {
        started: started_tx,
        proceed: proceed_rx,
        executed: Cell::new(Vec::new()),
    };

    let mut saga: Saga<(), HandshakeContext, TestError> = Saga::builder()
        .step(NamedStep("before"))
        .step(BlockingStep)
        .step(NamedStep("after"))
        .build();
    let handle = saga.handle();

    let canceller = thread::spawn(move || {
        started_rx
            .recv_timeout(Duration::from_secs(10))
            .expect("blocking step should start");
        handle.cancel();
        proceed_tx.send(()).expect("saga thread should be waiting");
    });

    let err = saga
        .run(&ctx, &RunOptions::default())
        .expect_err("saga should be cancelled");
    canceller.join().expect("canceller thread should not panic");

    assert!(err.is_cancelled());
    assert_eq!(ctx.executed.take(), vec!["before", "blocking"]);
    assert_eq!(saga.cursor(), 2);
    assert_eq!(saga.state(), SagaState::Cancelled);
    assert_eq!(saga.audit_log().cancelled_before(), Some(2));
}

/// Cancels through a capability handed down to nested code.
struct NestedCancel;

fn abort_from_helper(capability: &dyn Cancellable) {
    capability.cancel();
}

impl SagaStep for NestedCancel {
    type Input = ();
    type Output = ();
    type Context = HandshakeContext;
    type Error = TestError;

    fn name(&self) -> &'static str {
        "nested_cancel"
    }

    fn execute(
        &self,
        ctx: &StepContext<'_, Self::Context>,
        _input: Self::Input,
    ) -> Result<Self::Output, Self::Error> {
        abort_from_helper(ctx.saga());
        abort_from_helper(ctx.saga());
        ctx.data().push("nested_cancel");
        Ok(())
    }
}

#[test]
fn nested_code_can_cancel_through_the_context() {
    let (started, _started_rx) = mpsc::channel();
    let (_proceed_tx, proceed) = mpsc::channel();
    let ctx = HandshakeContext {
        started,
        proceed,
        executed: Cell::new(Vec::new()),
    };
    let mut saga: Saga<(), HandshakeContext, TestError> = Saga::builder()
        .step(NestedCancel)
        .step(NamedStep("after"))
        .build();

    let err = saga
        .run(&ctx, &RunOptions::default())
        .expect_err("saga should be cancelled");

    assert!(err.is_cancelled());
    assert_eq!(ctx.executed.take(), vec!["nested_cancel"]);
    assert!(saga.revoke(&ctx).is_ok());
}

struct RetryContext {
    flaky_calls: Cell<u32>,
    next_calls: Cell<u32>,
}

/// Cancels its saga during the first attempt, which fails; later attempts
/// succeed.
struct CancelThenFail;

impl SagaStep for CancelThenFail {
    type Input = u32;
    type Output = u32;
    type Context = RetryContext;
    type Error = TestError;

    fn name(&self) -> &'static str {
        "cancel_then_fail"
    }

    fn execute(
        &self,
        ctx: &StepContext<'_, Self::Context>,
        input: Self::Input,
    ) -> Result<Self::Output, Self::Error> {
        let calls = &ctx.data().flaky_calls;
        calls.set(calls.get() + 1);
        if calls.get() == 1 {
            ctx.saga().cancel();
            return Err(TestError("first attempt".to_string()));
        }
        Ok(input + 1)
    }
}

struct NextStep;

impl SagaStep for NextStep {
    type Input = u32;
    type Output = u32;
    type Context = RetryContext;
    type Error = TestError;

    fn name(&self) -> &'static str {
        "next"
    }

    fn execute(
        &self,
        ctx: &StepContext<'_, Self::Context>,
        input: Self::Input,
    ) -> Result<Self::Output, Self::Error> {
        let calls = &ctx.data().next_calls;
        calls.set(calls.get() + 1);
        Ok(input)
    }
}

#[test]
fn cancellation_does_not_interrupt_pending_retries() {
    let ctx = RetryContext {
        flaky_calls: Cell::new(0),
        next_calls: Cell::new(0),
    };
    let mut saga: Saga<u32, RetryContext, TestError> = Saga::builder()
        .step(CancelThenFail)
        .step(NextStep)
        .build();

    let err = saga
        .run_with_input(
            &ctx,
            0_u32,
            &RunOptions::new().with_retry(2, Duration::ZERO),
        )
        .expect_err("saga should be cancelled");

    assert!(err.is_cancelled());
    assert_eq!(ctx.flaky_calls.get(), 2);
    assert_eq!(ctx.next_calls.get(), 0);
    assert_eq!(saga.cursor(), 1);
    assert_eq!(saga.state(), SagaState::Cancelled);
    assert_eq!(saga.audit_log().records()[0].attempts, 2);
}

struct DeadlineProbe;

impl SagaStep for DeadlineProbe {
    type Input = ();
    type Output = bool;
    type Context = ();
    type Error = TestError;

    fn name(&self) -> &'static str {
        "deadline_probe"
    }

    fn execute(
        &self,
        ctx: &StepContext<'_, Self::Context>,
        _input: Self::Input,
    ) -> Result<Self::Output, Self::Error> {
        Ok(ctx.deadline().is_some() && !ctx.deadline_exceeded())
    }
}

#[test]
fn steps_see_the_run_deadline() -> anyhow::Result<()> {
    let mut saga: Saga<bool, (), TestError> = Saga::builder().step(DeadlineProbe).build();
    let options = RunOptions::new().with_deadline(Instant::now() + Duration::from_secs(60));

    saga.run(&(), &options)?;

    assert!(saga.result()?);
    Ok(())
}

#[test]
fn handles_are_send_and_cloneable() {
    fn assert_send_sync<T: Send + Sync + Clone>() {}
    assert_send_sync::<SagaHandle>();
}
