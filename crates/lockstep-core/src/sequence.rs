//! Operation sequence orchestration.
//!
//! Runs an ordered list of steps as one logical transaction:
//! - Steps are performed strictly in order, one at a time
//! - A failing step may be retried, ignored or aborted through the
//!   action-required channel
//! - On terminal failure or cancellation, completed steps are reverted in
//!   reverse order of completion
//! - `revert_all` runs the same sweep on demand, e.g. at shutdown

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::action::{ActionRequiredEventArgs, ActionRequiredSender, Decision};
use crate::error::SequenceError;
use crate::events::{RevertFault, RevertReport, SequenceEvent};
use crate::operation::{Operation, OperationResult, OperationState, StepContext};
use crate::step::Step;

#[cfg(test)]
#[path = "sequence_tests.rs"]
mod tests;

/// Run state of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceState {
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Terminal outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceResult {
    Completed,
    Failed,
    Cancelled,
}

impl From<SequenceResult> for SequenceState {
    fn from(result: SequenceResult) -> Self {
        match result {
            SequenceResult::Completed => SequenceState::Completed,
            SequenceResult::Failed => SequenceState::Failed,
            SequenceResult::Cancelled => SequenceState::Cancelled,
        }
    }
}

impl std::fmt::Display for SequenceResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequenceResult::Completed => write!(f, "completed"),
            SequenceResult::Failed => write!(f, "failed"),
            SequenceResult::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Tuning knobs for a sequence.
#[derive(Debug, Clone)]
pub struct SequenceOptions {
    /// Retries allowed per step. Zero means unbounded.
    pub max_retries: u32,
    /// Upper bound on waiting for a decision. `None` waits indefinitely.
    pub decision_timeout: Option<Duration>,
    /// Capacity of the progress event channel.
    pub event_capacity: usize,
}

impl Default for SequenceOptions {
    fn default() -> Self {
        Self {
            max_retries: 0,
            decision_timeout: None,
            event_capacity: 64,
        }
    }
}

enum StepOutcome {
    Completed,
    Ignored,
    Failed,
    Cancelled,
}

/// Executes an ordered list of steps and owns their rollback.
pub struct OperationSequence {
    steps: Vec<Step>,
    states: Vec<OperationState>,
    /// Indices of completed steps, in completion order.
    completed: Vec<usize>,
    state: SequenceState,
    actions: Option<ActionRequiredSender>,
    cancel: CancellationToken,
    events: broadcast::Sender<SequenceEvent>,
    options: SequenceOptions,
}

impl OperationSequence {
    /// Create a sequence from its steps.
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Result<Self, SequenceError> {
        Self::with_options(steps, SequenceOptions::default())
    }

    /// Create a sequence with explicit options.
    pub fn with_options(
        steps: impl IntoIterator<Item = Step>,
        options: SequenceOptions,
    ) -> Result<Self, SequenceError> {
        let steps: Vec<Step> = steps.into_iter().collect();
        if let Some(index) = steps.iter().position(|s| s.name().trim().is_empty()) {
            return Err(SequenceError::EmptyName(index));
        }

        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        Ok(Self {
            states: vec![OperationState::NotStarted; steps.len()],
            steps,
            completed: Vec::new(),
            state: SequenceState::Idle,
            actions: None,
            cancel: CancellationToken::new(),
            events,
            options,
        })
    }

    /// Wire up the decision channel used for failed steps and custom requests.
    pub fn with_action_channel(mut self, sender: ActionRequiredSender) -> Self {
        self.actions = Some(sender);
        self
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels the run between steps.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Subscribe to progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<SequenceEvent> {
        self.events.subscribe()
    }

    /// Current run state.
    pub fn state(&self) -> SequenceState {
        self.state
    }

    /// Index of the most recently completed step still awaiting rollback.
    pub fn cursor(&self) -> Option<usize> {
        self.completed.last().copied()
    }

    /// Recorded state of the step at `index`.
    pub fn step_state(&self, index: usize) -> Option<OperationState> {
        self.states.get(index).copied()
    }

    /// Names of all steps, in order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run the sequence. Never fails; misuse is logged and reported as `Failed`.
    pub async fn run(&mut self) -> SequenceResult {
        match self.try_run().await {
            Ok(result) => result,
            Err(e) => {
                error!("Refusing to run operation sequence: {}", e);
                SequenceResult::Failed
            }
        }
    }

    /// Run the sequence, rejecting a run that is not started from idle.
    pub async fn try_run(&mut self) -> Result<SequenceResult, SequenceError> {
        if self.state != SequenceState::Idle {
            return Err(SequenceError::InvalidState(self.state));
        }

        self.state = SequenceState::Running;
        info!("Starting operation sequence ({} steps)", self.steps.len());

        let result = self.perform_all().await;

        if result != SequenceResult::Completed {
            info!("Operation sequence {}, rolling back", result);
            let report = self.rollback().await;
            if !report.is_clean() {
                warn!(
                    "Rollback finished with {} failed revert(s)",
                    report.faults.len()
                );
            }
        }

        self.state = result.into();
        self.emit(SequenceEvent::Finished { result });
        info!("Operation sequence finished: {}", result);

        Ok(result)
    }

    /// Revert every completed step in reverse order of completion.
    ///
    /// With no completed steps this does nothing.
    pub async fn revert_all(&mut self) -> RevertReport {
        if self.completed.is_empty() {
            debug!("Nothing to revert");
            return RevertReport::default();
        }

        info!("Reverting {} completed step(s)", self.completed.len());
        self.rollback().await
    }

    async fn perform_all(&mut self) -> SequenceResult {
        for index in 0..self.steps.len() {
            if self.cancel.is_cancelled() {
                info!("Cancellation requested before step {}", index);
                return SequenceResult::Cancelled;
            }

            match self.perform_step(index).await {
                StepOutcome::Completed | StepOutcome::Ignored => {}
                StepOutcome::Failed => return SequenceResult::Failed,
                StepOutcome::Cancelled => return SequenceResult::Cancelled,
            }
        }

        SequenceResult::Completed
    }

    async fn perform_step(&mut self, index: usize) -> StepOutcome {
        let name = self.steps[index].name().to_string();
        let ctx = StepContext::new(
            name.clone(),
            self.actions.clone(),
            self.cancel.clone(),
            self.options.decision_timeout,
        );
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            self.states[index] = OperationState::Running;
            self.emit(SequenceEvent::StepStarted {
                index,
                name: name.clone(),
                attempt,
            });
            debug!("Performing '{}' (attempt {})", name, attempt);

            let (result, reason) = match self.steps[index].perform(&ctx).await {
                Ok(result) => (result, None),
                Err(e) => {
                    warn!("Step '{}' raised an error: {}", name, e);
                    (OperationResult::Failed, Some(e.to_string()))
                }
            };

            match result {
                OperationResult::Success => {
                    self.states[index] = OperationState::Completed;
                    self.completed.push(index);
                    self.emit(SequenceEvent::StepCompleted {
                        index,
                        name: name.clone(),
                    });
                    return StepOutcome::Completed;
                }
                OperationResult::Cancelled => {
                    self.states[index] = OperationState::Failed;
                    info!("Step '{}' was cancelled", name);
                    self.emit(SequenceEvent::StepCancelled {
                        index,
                        name: name.clone(),
                    });
                    return StepOutcome::Cancelled;
                }
                OperationResult::Failed => {
                    self.states[index] = OperationState::Failed;
                    self.emit(SequenceEvent::StepFailed {
                        index,
                        name: name.clone(),
                        reason: reason.clone(),
                    });

                    let decision = self.resolve_failure(index, &name, reason, attempt).await;

                    if self.cancel.is_cancelled() {
                        info!("Cancellation requested while resolving '{}'", name);
                        return StepOutcome::Cancelled;
                    }

                    match decision {
                        Decision::Retry => {
                            info!("Retrying '{}'", name);
                            self.emit(SequenceEvent::StepRetrying {
                                index,
                                name: name.clone(),
                                attempt: attempt + 1,
                            });
                        }
                        Decision::Ignore => {
                            warn!("Ignoring failure of '{}' and continuing", name);
                            self.emit(SequenceEvent::StepIgnored {
                                index,
                                name: name.clone(),
                            });
                            return StepOutcome::Ignored;
                        }
                        _ => {
                            error!("Step '{}' failed", name);
                            return StepOutcome::Failed;
                        }
                    }
                }
            }
        }
    }

    /// Ask for a decision on a failed step. Anything but a permitted
    /// retry or ignore resolves to abort.
    async fn resolve_failure(
        &mut self,
        index: usize,
        name: &str,
        reason: Option<String>,
        attempt: u32,
    ) -> Decision {
        let Some(actions) = self.actions.clone() else {
            debug!("No decision channel, failure of '{}' is terminal", name);
            return Decision::Abort;
        };

        let mut recovery = self.steps[index].recovery();
        let max_retries = self.options.max_retries;
        if max_retries > 0 && attempt > max_retries {
            warn!("Step '{}' exhausted {} retries", name, max_retries);
            recovery.retry = false;
        }
        if !recovery.retry && !recovery.ignore {
            return Decision::Abort;
        }

        let args = ActionRequiredEventArgs::StepFailed {
            step: name.to_string(),
            reason: reason.unwrap_or_else(|| "operation reported failure".to_string()),
            recovery,
        };

        let cancel = self.cancel.clone();
        let timeout = self.options.decision_timeout;
        let decision = tokio::select! {
            decision = actions.request(args, timeout) => decision,
            _ = cancel.cancelled() => None,
        };

        match decision {
            Some(decision) if recovery.permits(&decision) => decision,
            Some(decision) => {
                warn!("Decision {:?} is not permitted for '{}'", decision, name);
                Decision::Abort
            }
            None => Decision::Abort,
        }
    }

    async fn rollback(&mut self) -> RevertReport {
        let mut report = RevertReport::default();

        while let Some(index) = self.completed.pop() {
            let name = self.steps[index].name().to_string();
            debug!("Reverting '{}'", name);

            match self.steps[index].revert().await {
                Ok(()) => {
                    self.states[index] = OperationState::Reverted;
                    self.emit(SequenceEvent::StepReverted {
                        index,
                        name: name.clone(),
                    });
                    report.reverted.push(name);
                }
                Err(e) => {
                    warn!("Failed to revert '{}': {}", name, e);
                    self.states[index] = OperationState::Failed;
                    self.emit(SequenceEvent::RevertFault {
                        index,
                        name: name.clone(),
                        reason: e.to_string(),
                    });
                    report.faults.push(RevertFault {
                        step: name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        report
    }

    fn emit(&self, event: SequenceEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
