//! Unattended answers to action-required requests.

use tokio::task::JoinHandle;
use tracing::{info, warn};

use lockstep_config::FailurePolicy;
use lockstep_core::{ActionRequiredEventArgs, ActionRequiredReceiver, Decision};

/// Answers every request according to the configured failure policy.
#[derive(Debug, Clone, Copy)]
pub struct DecisionPolicy {
    policy: FailurePolicy,
}

impl DecisionPolicy {
    pub fn new(policy: FailurePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Pick the answer for one request.
    ///
    /// A failed step gets the policy's decision when the step permits it and
    /// abort otherwise. Custom requests need a person and are aborted.
    pub fn decide(&self, args: &ActionRequiredEventArgs) -> Decision {
        match args {
            ActionRequiredEventArgs::StepFailed { recovery, .. } => {
                let decision = match self.policy {
                    FailurePolicy::Retry => Decision::Retry,
                    FailurePolicy::Abort => Decision::Abort,
                    FailurePolicy::Ignore => Decision::Ignore,
                };
                if recovery.permits(&decision) {
                    decision
                } else {
                    Decision::Abort
                }
            }
            ActionRequiredEventArgs::Custom { .. } => Decision::Abort,
        }
    }

    /// Serve requests until every sender is gone.
    /// Resolves to the number of requests answered.
    pub fn spawn(self, mut requests: ActionRequiredReceiver) -> JoinHandle<usize> {
        tokio::spawn(async move {
            let mut answered = 0;
            while let Some(request) = requests.recv().await {
                let decision = self.decide(request.args());
                match request.args() {
                    ActionRequiredEventArgs::StepFailed { step, reason, .. } => {
                        info!("Step '{}' failed ({}), answering {:?}", step, reason, decision);
                    }
                    ActionRequiredEventArgs::Custom { kind, message, .. } => {
                        warn!(
                            "No interactive responder for '{}' ({}), answering {:?}",
                            kind, message, decision
                        );
                    }
                }
                if request.respond(decision) {
                    answered += 1;
                }
            }
            answered
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_core::{action_channel, Recovery};

    fn step_failed(recovery: Recovery) -> ActionRequiredEventArgs {
        ActionRequiredEventArgs::StepFailed {
            step: "runtime connection".to_string(),
            reason: "refused".to_string(),
            recovery,
        }
    }

    #[test]
    fn test_policy_decisions() {
        let permissive = Recovery {
            retry: true,
            ignore: true,
        };
        assert_eq!(
            DecisionPolicy::new(FailurePolicy::Retry).decide(&step_failed(permissive)),
            Decision::Retry
        );
        assert_eq!(
            DecisionPolicy::new(FailurePolicy::Ignore).decide(&step_failed(permissive)),
            Decision::Ignore
        );
        assert_eq!(
            DecisionPolicy::new(FailurePolicy::Abort).decide(&step_failed(permissive)),
            Decision::Abort
        );
    }

    #[test]
    fn test_unpermitted_decision_falls_back_to_abort() {
        assert_eq!(
            DecisionPolicy::new(FailurePolicy::Retry).decide(&step_failed(Recovery::NONE)),
            Decision::Abort
        );
        // Ignore is opt-in per step.
        assert_eq!(
            DecisionPolicy::new(FailurePolicy::Ignore).decide(&step_failed(Recovery::default())),
            Decision::Abort
        );
    }

    #[test]
    fn test_custom_requests_are_aborted() {
        let args = ActionRequiredEventArgs::custom("password", "Enter the quit password");
        assert_eq!(
            DecisionPolicy::new(FailurePolicy::Retry).decide(&args),
            Decision::Abort
        );
    }

    #[tokio::test]
    async fn test_spawned_responder_answers_until_closed() {
        let (sender, requests) = action_channel(4);
        let responder = DecisionPolicy::new(FailurePolicy::Retry).spawn(requests);

        let decision = sender.request(step_failed(Recovery::default()), None).await;
        assert_eq!(decision, Some(Decision::Retry));

        drop(sender);
        assert_eq!(responder.await.unwrap(), 1);
    }
}
