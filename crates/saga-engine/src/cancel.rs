use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tracing::info;

const IDLE: u8 = 0;
const ARMED: u8 = 1;
const CANCELLED: u8 = 2;

/// Capability to request cooperative cancellation of a running saga.
///
/// This is the only part of the engine exposed to code running inside a
/// step. Implementations must be safe to call repeatedly.
pub trait Cancellable {
    /// Ask the saga to stop before its next step.
    fn cancel(&self);
}

/// Write-once cancellation signal shared between a saga and its handles.
///
/// The signal moves `idle -> armed` when a run starts and `armed -> cancelled`
/// at most once. Raising it while idle does nothing.
#[derive(Debug, Default)]
pub(crate) struct Signal {
    state: AtomicU8,
}

impl Signal {
    /// Arm the signal for a run. Returns `false` if it was armed before.
    pub(crate) fn arm(&self) -> bool {
        self.state
            .compare_exchange(IDLE, ARMED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Raise the signal. Returns `true` only for the call that raised it.
    pub(crate) fn raise(&self) -> bool {
        self.state
            .compare_exchange(ARMED, CANCELLED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.state.load(Ordering::SeqCst) != IDLE
    }

    pub(crate) fn is_raised(&self) -> bool {
        self.state.load(Ordering::SeqCst) == CANCELLED
    }
}

/// A cloneable, thread-safe handle that can cancel a saga.
///
/// Handles can be taken before the saga runs and moved to other threads;
/// steps receive one through [`StepContext::saga`](crate::StepContext::saga).
#[derive(Debug, Clone)]
pub struct SagaHandle {
    signal: Arc<Signal>,
}

impl SagaHandle {
    pub(crate) fn new() -> Self {
        Self {
            signal: Arc::new(Signal::default()),
        }
    }

    pub(crate) fn signal(&self) -> &Signal {
        &self.signal
    }

    /// Request cancellation.
    ///
    /// Takes effect before the next step starts. Calling this before the saga
    /// has started, or more than once, is a no-op.
    pub fn cancel(&self) {
        if self.signal.raise() {
            info!("saga cancellation requested");
        }
    }

    /// Check if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.signal.is_raised()
    }

    /// Check if the saga this handle belongs to has started running.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.signal.is_armed()
    }
}

impl Cancellable for SagaHandle {
    fn cancel(&self) {
        SagaHandle::cancel(self);
    }
}
