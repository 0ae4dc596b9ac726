//! Progress events and rollback reports.

use serde::{Deserialize, Serialize};

use crate::sequence::SequenceResult;

/// One step transition, published for progress reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SequenceEvent {
    StepStarted {
        index: usize,
        name: String,
        attempt: u32,
    },
    StepCompleted {
        index: usize,
        name: String,
    },
    StepFailed {
        index: usize,
        name: String,
        reason: Option<String>,
    },
    StepRetrying {
        index: usize,
        name: String,
        attempt: u32,
    },
    StepIgnored {
        index: usize,
        name: String,
    },
    StepCancelled {
        index: usize,
        name: String,
    },
    StepReverted {
        index: usize,
        name: String,
    },
    RevertFault {
        index: usize,
        name: String,
        reason: String,
    },
    Finished {
        result: SequenceResult,
    },
}

impl SequenceEvent {
    /// Name of the step this event concerns, if any.
    pub fn step(&self) -> Option<&str> {
        match self {
            SequenceEvent::StepStarted { name, .. }
            | SequenceEvent::StepCompleted { name, .. }
            | SequenceEvent::StepFailed { name, .. }
            | SequenceEvent::StepRetrying { name, .. }
            | SequenceEvent::StepIgnored { name, .. }
            | SequenceEvent::StepCancelled { name, .. }
            | SequenceEvent::StepReverted { name, .. }
            | SequenceEvent::RevertFault { name, .. } => Some(name),
            SequenceEvent::Finished { .. } => None,
        }
    }
}

/// A revert that raised an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevertFault {
    pub step: String,
    pub reason: String,
}

/// Outcome of a rollback sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevertReport {
    /// Steps reverted successfully, in the order they were reverted.
    pub reverted: Vec<String>,
    /// Steps whose revert failed. The sweep continued past each of them.
    pub faults: Vec<RevertFault>,
}

impl RevertReport {
    /// Whether every revert succeeded.
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }

    /// Number of steps visited by the sweep.
    pub fn visited(&self) -> usize {
        self.reverted.len() + self.faults.len()
    }
}
