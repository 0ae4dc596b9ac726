//! # Lockstep Core
//!
//! Staged setup for long-lived client processes.
//!
//! ## Components
//!
//! - [`Operation`] - A single reversible setup step
//! - [`Step`] - Uniform wrapper over real, delegate and lazy operations
//! - [`OperationSequence`] - Runs steps in order and owns their rollback
//! - [`action_channel`] - Decision channel for failed steps and user input
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lockstep_core::{action_channel, OperationSequence, Step};
//!
//! let (decisions, mut requests) = action_channel(8);
//! let mut sequence = OperationSequence::new(vec![
//!     Step::real(ConnectOperation::new(proxy)),
//!     Step::lazy("keyboard", build_keyboard_hook),
//! ])?
//! .with_action_channel(decisions);
//!
//! let result = sequence.run().await;
//! // ... later, at shutdown:
//! sequence.revert_all().await;
//! ```

pub mod action;
pub mod error;
pub mod events;
pub mod operation;
pub mod sequence;
pub mod step;

pub use action::{
    action_channel, ActionRequest, ActionRequiredEventArgs, ActionRequiredReceiver,
    ActionRequiredSender, Decision,
};
pub use error::{OperationError, SequenceError};
pub use events::{RevertFault, RevertReport, SequenceEvent};
pub use operation::{Operation, OperationResult, OperationState, Recovery, StepContext};
pub use sequence::{OperationSequence, SequenceOptions, SequenceResult, SequenceState};
pub use step::{DelegateOperation, LazyOperation, Step};

// Re-export CancellationToken for convenience
pub use tokio_util::sync::CancellationToken;
