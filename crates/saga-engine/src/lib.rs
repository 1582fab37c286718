//! In-process saga orchestration.
//!
//! A saga runs a sequence of typed steps in order, threading each step's
//! output into the next one. Failing steps are retried under a bounded
//! [`RetryPolicy`]; once retries are exhausted the run stops and
//! [`Saga::revoke`] undoes the attempted steps in reverse order. Any code
//! holding a [`SagaHandle`], including the steps themselves through their
//! [`StepContext`], can cancel the run before its next step.
//!
//! Steps are stored type-erased. Mismatched input types surface at run time as
//! [`SagaError::TypeMismatch`] instead of panicking.

mod audit;
mod builder;
mod cancel;
mod config;
mod context;
mod erased;
mod error;
mod options;
mod retry;
mod saga;
mod step;
mod value;

pub use audit::{SagaAuditLog, StepRecord, StepStatus};
pub use builder::SagaBuilder;
pub use cancel::{Cancellable, SagaHandle};
pub use context::StepContext;
pub use error::{ConfigError, SagaError};
pub use options::{RetryPolicy, RunOptions};
pub use saga::{Saga, SagaState};
pub use step::{SagaStep, SinkStep, SourceStep};
