//! Hook installation as a revertible sequence step.

use tracing::{debug, info};

use lockstep_core::{Operation, OperationError, OperationResult, StepContext};

use crate::monitor::{HookMonitor, HookRegistration};
use crate::registrar::{EventClass, HookCallback};

/// Installs a hook on perform and removes it on revert.
pub struct HookOperation {
    name: String,
    monitor: HookMonitor,
    class: EventClass,
    callback: HookCallback,
    registration: Option<HookRegistration>,
}

impl HookOperation {
    pub fn new(
        name: impl Into<String>,
        monitor: HookMonitor,
        class: EventClass,
        callback: HookCallback,
    ) -> Self {
        Self {
            name: name.into(),
            monitor,
            class,
            callback,
            registration: None,
        }
    }

    /// Whether the hook is currently installed.
    pub fn is_active(&self) -> bool {
        self.registration
            .as_ref()
            .map(|r| r.is_attached())
            .unwrap_or(false)
    }
}

#[async_trait::async_trait]
impl Operation for HookOperation {
    fn name(&self) -> &str {
        &self.name
    }

    async fn perform(&mut self, _ctx: &StepContext) -> Result<OperationResult, OperationError> {
        if self.registration.is_some() {
            debug!("{} hook already installed", self.class);
            return Ok(OperationResult::Success);
        }

        info!("Installing {} hook...", self.class);
        let registration = self
            .monitor
            .start(self.class, self.callback.clone())
            .await
            .map_err(|e| OperationError::failure(&self.name, e.to_string()))?;

        self.registration = Some(registration);
        Ok(OperationResult::Success)
    }

    async fn revert(&mut self) -> Result<(), OperationError> {
        let Some(registration) = self.registration.take() else {
            return Ok(());
        };

        info!("Removing {} hook...", self.class);
        let detached = tokio::task::spawn_blocking(move || registration.stop())
            .await
            .map_err(|e| OperationError::revert(&self.name, e.to_string()))?;

        if detached {
            Ok(())
        } else {
            Err(OperationError::revert(
                &self.name,
                "native uninstall reported failure",
            ))
        }
    }
}
