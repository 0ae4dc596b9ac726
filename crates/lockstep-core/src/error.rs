//! Operation and sequence errors.

use thiserror::Error;

use crate::sequence::SequenceState;

/// Errors raised by a single operation.
///
/// The orchestrator never lets these escape a run: a `perform` error is
/// treated as a failed step and a `revert` error is logged and swallowed.
#[derive(Debug, Error)]
pub enum OperationError {
    /// The step could not complete its work.
    #[error("Step '{step}' failed: {reason}")]
    StepFailure { step: String, reason: String },

    /// A lazy step's factory could not build the underlying operation.
    #[error("Failed to build operation '{step}': {reason}")]
    Factory { step: String, reason: String },

    /// Undoing a completed step failed.
    #[error("Failed to revert '{step}': {reason}")]
    RevertFault { step: String, reason: String },

    /// Generic operation error.
    #[error("{0}")]
    Custom(String),
}

impl OperationError {
    /// Shorthand for a [`OperationError::StepFailure`].
    pub fn failure(step: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StepFailure {
            step: step.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`OperationError::RevertFault`].
    pub fn revert(step: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RevertFault {
            step: step.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by the sequence itself, never by its operations.
#[derive(Debug, Error)]
pub enum SequenceError {
    /// `run` was called on a sequence that is not idle.
    #[error("Cannot run sequence from state: {0:?}")]
    InvalidState(SequenceState),

    /// A step was registered without a name.
    #[error("Operation at index {0} has an empty name")]
    EmptyName(usize),
}
