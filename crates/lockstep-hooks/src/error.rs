//! Hook lifecycle errors.

use std::time::Duration;

use thiserror::Error;

use crate::registrar::EventClass;

/// Errors that can occur while installing a hook.
///
/// A failed uninstall is not an error: `detach` reports it as `false` and
/// the hook is still considered released.
#[derive(Debug, Error)]
pub enum HookError {
    /// The native layer refused the registration. The hook is not attached.
    #[error("Failed to attach {class} hook: {reason}")]
    AttachFault { class: EventClass, reason: String },

    /// The owning thread did not report an attach outcome in time.
    #[error("Timed out after {0:?} waiting for hook attachment")]
    AttachTimeout(Duration),

    /// The owning thread exited before reporting.
    #[error("Hook owner thread is unavailable")]
    OwnerUnavailable,

    /// The owning thread could not be spawned.
    #[error("Failed to spawn hook thread: {0}")]
    Thread(String),
}

impl HookError {
    /// Shorthand for an [`HookError::AttachFault`].
    pub fn attach(class: EventClass, reason: impl Into<String>) -> Self {
        Self::AttachFault {
            class,
            reason: reason.into(),
        }
    }
}
