use std::fmt::Debug;
use std::path::PathBuf;

use thiserror::Error;

use crate::value::Mismatch;

/// Error from saga execution, compensation or result retrieval.
///
/// Step and revoke failures carry the step's own error unchanged in `source`,
/// so callers can inspect the original cause.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SagaError<E: Debug> {
    /// `run` was called on a saga that has already been run.
    #[error("saga is already started")]
    AlreadyStarted,

    /// The cancellation signal was raised.
    #[error("saga was cancelled")]
    Cancelled,

    /// Data handed to a step, or the final result, is not of the declared type.
    #[error("unexpected data type for {site}: want '{expected}', got '{actual}'")]
    TypeMismatch {
        /// Where the check failed, such as the input of a named step.
        site: String,
        /// The declared type.
        expected: &'static str,
        /// The type actually held.
        actual: &'static str,
    },

    /// A step still failed after its retries were exhausted.
    #[error("step '{step}' failed after {attempts} attempt(s)")]
    StepFailed {
        /// Name of the step that failed.
        step: String,
        /// How many times the step was invoked.
        attempts: u32,
        /// The error from the last attempt.
        #[source]
        source: E,
    },

    /// A compensation failed; earlier steps were left uncompensated.
    #[error("revoke failed for step '{step}'")]
    RevokeFailed {
        /// Name of the step whose revoke failed.
        step: String,
        /// The error returned by the revoke.
        #[source]
        source: E,
    },
}

impl<E: Debug> SagaError<E> {
    pub(crate) fn type_mismatch(site: impl Into<String>, mismatch: Mismatch) -> Self {
        Self::TypeMismatch {
            site: site.into(),
            expected: mismatch.expected,
            actual: mismatch.actual,
        }
    }

    /// Whether the run stopped because of cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether a value had an unexpected type.
    #[must_use]
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }

    /// The step's own error for `StepFailed` and `RevokeFailed`.
    #[must_use]
    pub fn step_error(&self) -> Option<&E> {
        match self {
            Self::StepFailed { source, .. } | Self::RevokeFailed { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Take the step's own error out of `StepFailed` or `RevokeFailed`.
    #[must_use]
    pub fn into_step_error(self) -> Option<E> {
        match self {
            Self::StepFailed { source, .. } | Self::RevokeFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Error from loading saga configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read saga configuration at '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse saga configuration")]
    Parse(#[from] toml::de::Error),
}
