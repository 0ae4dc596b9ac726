//! Fetches the session configuration from the runtime.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use lockstep_core::{Operation, OperationError, OperationResult, StepContext};

use crate::context::ClientContext;
use crate::runtime::RuntimeProxy;

const NAME: &str = "configuration";

/// Loads the client configuration into the shared context.
pub struct ConfigurationOperation {
    context: ClientContext,
    runtime: Arc<dyn RuntimeProxy>,
}

impl ConfigurationOperation {
    pub fn new(context: ClientContext, runtime: Arc<dyn RuntimeProxy>) -> Self {
        Self { context, runtime }
    }
}

#[async_trait]
impl Operation for ConfigurationOperation {
    fn name(&self) -> &str {
        NAME
    }

    async fn perform(&mut self, _ctx: &StepContext) -> Result<OperationResult, OperationError> {
        info!("Initializing application configuration...");
        let configuration = self
            .runtime
            .get_configuration()
            .await
            .map_err(|e| OperationError::failure(NAME, e.to_string()))?;

        info!(
            session_id = %configuration.session_id,
            client_address = %configuration.app_config.client_address,
            "Received client configuration"
        );
        self.context.set_configuration(configuration);
        Ok(OperationResult::Success)
    }

    async fn revert(&mut self) -> Result<(), OperationError> {
        Ok(())
    }
}
