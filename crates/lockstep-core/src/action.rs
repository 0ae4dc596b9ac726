//! Action-required signaling.
//!
//! A running step (or the sequence, on a step failure) asks the supervising
//! party for a decision by sending an [`ActionRequest`] over a bounded
//! channel. Each request carries a one-shot responder, so every occurrence
//! is answered by exactly one consumer.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::operation::Recovery;

/// What decision is needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionRequiredEventArgs {
    /// Raised by the sequence when a step returns `Failed`.
    StepFailed {
        step: String,
        reason: String,
        recovery: Recovery,
    },
    /// Raised by an operation through its step context.
    Custom {
        kind: String,
        message: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
}

impl ActionRequiredEventArgs {
    /// Build a custom request without a payload.
    pub fn custom(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Custom {
            kind: kind.into(),
            message: message.into(),
            payload: serde_json::Value::Null,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &str {
        match self {
            ActionRequiredEventArgs::StepFailed { .. } => "step_failed",
            ActionRequiredEventArgs::Custom { kind, .. } => kind,
        }
    }
}

/// The supervising party's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "value", rename_all = "snake_case")]
pub enum Decision {
    /// Perform the step again.
    Retry,
    /// Stop and roll back.
    Abort,
    /// Skip the step and continue with the next one.
    Ignore,
    /// Input requested by a custom action.
    Provide(serde_json::Value),
}

/// A pending request for a decision.
#[derive(Debug)]
pub struct ActionRequest {
    args: ActionRequiredEventArgs,
    responder: oneshot::Sender<Decision>,
}

impl ActionRequest {
    /// The decision being asked for.
    pub fn args(&self) -> &ActionRequiredEventArgs {
        &self.args
    }

    /// Answer the request. Returns `false` if the requester stopped waiting.
    pub fn respond(self, decision: Decision) -> bool {
        debug!(kind = self.args.kind(), ?decision, "Responding to action request");
        self.responder.send(decision).is_ok()
    }
}

/// Sending half held by the sequence.
#[derive(Debug, Clone)]
pub struct ActionRequiredSender {
    tx: mpsc::Sender<ActionRequest>,
}

/// Receiving half held by the single consumer.
pub type ActionRequiredReceiver = mpsc::Receiver<ActionRequest>;

/// Create a decision channel.
pub fn action_channel(capacity: usize) -> (ActionRequiredSender, ActionRequiredReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ActionRequiredSender { tx }, rx)
}

impl ActionRequiredSender {
    /// Send a request and wait for its decision.
    ///
    /// Waits indefinitely unless `timeout` is set. Returns `None` if the
    /// consumer is gone, dropped the request unanswered, or timed out.
    pub async fn request(
        &self,
        args: ActionRequiredEventArgs,
        timeout: Option<Duration>,
    ) -> Option<Decision> {
        let (responder, reply) = oneshot::channel();
        let kind = args.kind().to_string();

        // The limit covers queueing behind other requests as well as the reply.
        let exchange = async {
            if self.tx.send(ActionRequest { args, responder }).await.is_err() {
                warn!(kind = %kind, "No consumer for action request");
                return None;
            }
            match reply.await {
                Ok(decision) => Some(decision),
                Err(_) => {
                    warn!(kind = %kind, "Action request dropped without a decision");
                    None
                }
            }
        };

        match timeout {
            Some(limit) => match tokio::time::timeout(limit, exchange).await {
                Ok(decision) => decision,
                Err(_) => {
                    warn!(kind = %kind, ?limit, "Action request timed out");
                    None
                }
            },
            None => exchange.await,
        }
    }

    /// Whether the consumer has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_request_is_answered_once() {
        let (sender, mut receiver) = action_channel(4);

        let consumer = tokio::spawn(async move {
            let request = receiver.recv().await.unwrap();
            assert_eq!(request.args().kind(), "password");
            request.respond(Decision::Provide(serde_json::json!("secret")))
        });

        let decision = sender
            .request(ActionRequiredEventArgs::custom("password", "Enter the password"), None)
            .await;

        assert_eq!(decision, Some(Decision::Provide(serde_json::json!("secret"))));
        assert!(consumer.await.unwrap());
    }

    #[tokio::test]
    async fn test_closed_receiver_yields_none() {
        let (sender, receiver) = action_channel(1);
        drop(receiver);

        assert!(sender.is_closed());
        let decision = sender
            .request(ActionRequiredEventArgs::custom("any", "any"), None)
            .await;
        assert!(decision.is_none());
    }

    #[tokio::test]
    async fn test_dropped_request_yields_none() {
        let (sender, mut receiver) = action_channel(1);

        tokio::spawn(async move {
            let request = receiver.recv().await.unwrap();
            drop(request);
        });

        let decision = sender
            .request(ActionRequiredEventArgs::custom("any", "any"), None)
            .await;
        assert!(decision.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_yields_none() {
        let (sender, mut receiver) = action_channel(1);

        let holder = tokio::spawn(async move {
            // Hold the request without answering.
            let _request = receiver.recv().await;
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });

        let decision = sender
            .request(
                ActionRequiredEventArgs::custom("slow", "never answered"),
                Some(Duration::from_secs(5)),
            )
            .await;
        assert!(decision.is_none());
        holder.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_covers_full_channel() {
        let (sender, _receiver) = action_channel(1);

        // Fill the only slot so the next send has to wait.
        let first = {
            let sender = sender.clone();
            tokio::spawn(async move {
                sender
                    .request(ActionRequiredEventArgs::custom("first", "queued"), None)
                    .await
            })
        };
        tokio::task::yield_now().await;

        let started = tokio::time::Instant::now();
        let decision = sender
            .request(
                ActionRequiredEventArgs::custom("second", "blocked behind first"),
                Some(Duration::from_secs(5)),
            )
            .await;

        assert!(decision.is_none());
        assert!(started.elapsed() >= Duration::from_secs(5));
        first.abort();
    }

    #[test]
    fn test_args_serialization() {
        let args = ActionRequiredEventArgs::StepFailed {
            step: "connect".to_string(),
            reason: "refused".to_string(),
            recovery: Recovery::default(),
        };
        let json = serde_json::to_value(&args).unwrap();
        assert_eq!(json["type"], "step_failed");
        assert_eq!(json["step"], "connect");
    }

    #[test]
    fn test_decision_serialization() {
        let json = serde_json::to_string(&Decision::Retry).unwrap();
        assert_eq!(json, r#"{"decision":"retry"}"#);
    }
}
