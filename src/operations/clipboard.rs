//! Clears the clipboard when the client starts and stops.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use lockstep_core::{Operation, OperationError, OperationResult, Recovery, StepContext};

use crate::native::NativeMethods;

const NAME: &str = "clipboard";

pub struct ClipboardOperation {
    native: Arc<dyn NativeMethods>,
}

impl ClipboardOperation {
    pub fn new(native: Arc<dyn NativeMethods>) -> Self {
        Self { native }
    }
}

#[async_trait]
impl Operation for ClipboardOperation {
    fn name(&self) -> &str {
        NAME
    }

    /// Leftover clipboard content does not block startup.
    fn recovery(&self) -> Recovery {
        Recovery {
            retry: true,
            ignore: true,
        }
    }

    async fn perform(&mut self, _ctx: &StepContext) -> Result<OperationResult, OperationError> {
        info!("Emptying clipboard...");
        self.native
            .empty_clipboard()
            .map_err(|e| OperationError::failure(NAME, e.to_string()))?;
        Ok(OperationResult::Success)
    }

    async fn revert(&mut self) -> Result<(), OperationError> {
        info!("Emptying clipboard...");
        self.native
            .empty_clipboard()
            .map_err(|e| OperationError::revert(NAME, e.to_string()))
    }
}
