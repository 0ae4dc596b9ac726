//! The reversible operation contract.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::action::{ActionRequiredEventArgs, ActionRequiredSender, Decision};
use crate::error::OperationError;

/// Outcome of a single `perform` attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationResult {
    /// The step completed and must be reverted on rollback.
    Success,
    /// The step failed. Eligible for the action-required retry path.
    Failed,
    /// The step was cancelled. Always terminal.
    Cancelled,
}

/// Lifecycle state of a step, as recorded by the owning sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    NotStarted,
    Running,
    Completed,
    Reverted,
    Failed,
}

impl std::fmt::Display for OperationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationState::NotStarted => write!(f, "not_started"),
            OperationState::Running => write!(f, "running"),
            OperationState::Completed => write!(f, "completed"),
            OperationState::Reverted => write!(f, "reverted"),
            OperationState::Failed => write!(f, "failed"),
        }
    }
}

/// Decisions a failing step permits besides abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recovery {
    /// Whether the step may be performed again.
    pub retry: bool,
    /// Whether the sequence may skip the step and continue.
    pub ignore: bool,
}

impl Recovery {
    /// Failure is always terminal.
    pub const NONE: Recovery = Recovery {
        retry: false,
        ignore: false,
    };

    /// Check whether a decision is acceptable for this step.
    pub fn permits(&self, decision: &Decision) -> bool {
        match decision {
            Decision::Abort => true,
            Decision::Retry => self.retry,
            Decision::Ignore => self.ignore,
            Decision::Provide(_) => false,
        }
    }
}

impl Default for Recovery {
    fn default() -> Self {
        Self {
            retry: true,
            ignore: false,
        }
    }
}

/// What a running step may see of its sequence.
///
/// Operations never touch the sequence cursor; they talk back only through
/// their return value and [`StepContext::request_action`].
pub struct StepContext {
    step: String,
    actions: Option<ActionRequiredSender>,
    cancel: CancellationToken,
    decision_timeout: Option<Duration>,
}

impl StepContext {
    pub(crate) fn new(
        step: impl Into<String>,
        actions: Option<ActionRequiredSender>,
        cancel: CancellationToken,
        decision_timeout: Option<Duration>,
    ) -> Self {
        Self {
            step: step.into(),
            actions,
            cancel,
            decision_timeout,
        }
    }

    /// A context with no decision channel and a fresh cancellation token.
    pub fn detached(step: impl Into<String>) -> Self {
        Self::new(step, None, CancellationToken::new(), None)
    }

    /// Name of the step being performed.
    pub fn step(&self) -> &str {
        &self.step
    }

    /// Whether cancellation of the run has been requested.
    ///
    /// Long-running steps may poll this and return
    /// [`OperationResult::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether a decision channel is wired up.
    pub fn can_request_action(&self) -> bool {
        self.actions.is_some()
    }

    /// Ask the supervising party for a decision and suspend until it answers.
    ///
    /// Returns `None` when no channel is wired, the consumer is gone, or the
    /// configured decision timeout elapsed.
    pub async fn request_action(&self, args: ActionRequiredEventArgs) -> Option<Decision> {
        match &self.actions {
            Some(sender) => sender.request(args, self.decision_timeout).await,
            None => None,
        }
    }
}

/// A single reversible setup step.
///
/// `perform` may be called again after a failure if the supervising party
/// decides to retry, so implementations must check for resources they
/// already hold before acquiring them.
#[async_trait::async_trait]
pub trait Operation: Send {
    /// Name used in diagnostics and progress events.
    fn name(&self) -> &str;

    /// Decisions permitted when this step fails.
    fn recovery(&self) -> Recovery {
        Recovery::default()
    }

    /// Do the work of this step.
    async fn perform(&mut self, ctx: &StepContext) -> Result<OperationResult, OperationError>;

    /// Undo the work of a completed step.
    async fn revert(&mut self) -> Result<(), OperationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_recovery_permits_retry_only() {
        let recovery = Recovery::default();
        assert!(recovery.permits(&Decision::Retry));
        assert!(recovery.permits(&Decision::Abort));
        assert!(!recovery.permits(&Decision::Ignore));
    }

    #[test]
    fn test_no_recovery_permits_abort() {
        assert!(Recovery::NONE.permits(&Decision::Abort));
        assert!(!Recovery::NONE.permits(&Decision::Retry));
        assert!(!Recovery::NONE.permits(&Decision::Ignore));
    }

    #[test]
    fn test_provided_input_is_not_a_recovery() {
        let recovery = Recovery {
            retry: true,
            ignore: true,
        };
        assert!(!recovery.permits(&Decision::Provide(serde_json::json!("pw"))));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(OperationState::NotStarted.to_string(), "not_started");
        assert_eq!(OperationState::Completed.to_string(), "completed");
        assert_eq!(OperationState::Reverted.to_string(), "reverted");
    }

    #[test]
    fn test_result_serialization() {
        let json = serde_json::to_string(&OperationResult::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }

    #[tokio::test]
    async fn test_detached_context_has_no_decisions() {
        let ctx = StepContext::detached("standalone");
        assert_eq!(ctx.step(), "standalone");
        assert!(!ctx.can_request_action());
        assert!(!ctx.is_cancelled());

        let decision = ctx
            .request_action(ActionRequiredEventArgs::custom("password", "enter password"))
            .await;
        assert!(decision.is_none());
    }
}
