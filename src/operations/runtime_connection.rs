//! Connects the client to its runtime.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use lockstep_core::{Operation, OperationError, OperationResult, StepContext};

use crate::context::ClientContext;
use crate::runtime::RuntimeProxy;

const NAME: &str = "runtime connection";

/// Opens the runtime connection on perform and closes it on revert.
pub struct RuntimeConnectionOperation {
    context: ClientContext,
    runtime: Arc<dyn RuntimeProxy>,
    token: Option<String>,
}

impl RuntimeConnectionOperation {
    pub fn new(
        context: ClientContext,
        runtime: Arc<dyn RuntimeProxy>,
        token: Option<String>,
    ) -> Self {
        Self {
            context,
            runtime,
            token,
        }
    }
}

#[async_trait]
impl Operation for RuntimeConnectionOperation {
    fn name(&self) -> &str {
        NAME
    }

    async fn perform(&mut self, _ctx: &StepContext) -> Result<OperationResult, OperationError> {
        if self.context.is_connected() {
            return Ok(OperationResult::Success);
        }

        info!("Initializing runtime connection...");
        let connected = self
            .runtime
            .connect(self.token.as_deref())
            .await
            .map_err(|e| OperationError::failure(NAME, e.to_string()))?;

        if connected {
            self.context.set_connected(true);
            info!("Successfully connected to the runtime");
            Ok(OperationResult::Success)
        } else {
            error!("The runtime refused the connection");
            Ok(OperationResult::Failed)
        }
    }

    async fn revert(&mut self) -> Result<(), OperationError> {
        if !self.context.is_connected() {
            return Ok(());
        }

        info!("Closing runtime connection...");
        let result = self.runtime.disconnect().await;
        self.context.set_connected(false);

        result.map_err(|e| {
            warn!("Failed to disconnect from the runtime: {}", e);
            OperationError::revert(NAME, e.to_string())
        })
    }
}
