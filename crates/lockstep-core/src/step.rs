//! Step variants dispatched uniformly by the sequence.
//!
//! - [`Step::Real`] wraps any [`Operation`] implementation
//! - [`Step::Delegate`] wraps plain closures (e.g. shutdown actions)
//! - [`Step::Lazy`] defers building its operation until first performed

use tracing::debug;

use crate::error::OperationError;
use crate::operation::{Operation, OperationResult, Recovery, StepContext};

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;

type Action = Box<dyn FnMut() + Send>;
type Factory = Box<dyn FnOnce() -> Result<Box<dyn Operation>, OperationError> + Send>;

/// Closure-backed step.
pub struct DelegateOperation {
    name: String,
    perform: Action,
    revert: Option<Action>,
}

impl DelegateOperation {
    /// Create a delegate step that has nothing to undo.
    pub fn new(name: impl Into<String>, perform: impl FnMut() + Send + 'static) -> Self {
        Self {
            name: name.into(),
            perform: Box::new(perform),
            revert: None,
        }
    }

    /// Attach an undo action.
    pub fn with_revert(mut self, revert: impl FnMut() + Send + 'static) -> Self {
        self.revert = Some(Box::new(revert));
        self
    }
}

#[async_trait::async_trait]
impl Operation for DelegateOperation {
    fn name(&self) -> &str {
        &self.name
    }

    async fn perform(&mut self, _ctx: &StepContext) -> Result<OperationResult, OperationError> {
        (self.perform)();
        Ok(OperationResult::Success)
    }

    async fn revert(&mut self) -> Result<(), OperationError> {
        if let Some(revert) = self.revert.as_mut() {
            revert();
        }
        Ok(())
    }
}

/// Deferred-construction step.
///
/// The factory runs on the first `perform` only. A retried perform reuses
/// the operation built the first time, and a step that was never reached
/// has nothing to revert.
pub struct LazyOperation {
    name: String,
    recovery: Recovery,
    factory: Option<Factory>,
    inner: Option<Box<dyn Operation>>,
}

impl LazyOperation {
    /// Create a lazy step. Does not run `factory`.
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: FnOnce() -> Result<Box<dyn Operation>, OperationError> + Send + 'static,
    {
        Self {
            name: name.into(),
            recovery: Recovery::default(),
            factory: Some(Box::new(factory)),
            inner: None,
        }
    }

    /// Override the recovery options used before the operation exists.
    pub fn with_recovery(mut self, recovery: Recovery) -> Self {
        self.recovery = recovery;
        self
    }

    /// Whether the factory has run.
    pub fn is_materialized(&self) -> bool {
        self.inner.is_some()
    }

    fn materialize(&mut self) -> Result<&mut Box<dyn Operation>, OperationError> {
        if self.inner.is_none() {
            let factory = self.factory.take().ok_or_else(|| OperationError::Factory {
                step: self.name.clone(),
                reason: "factory already consumed".to_string(),
            })?;
            debug!(step = %self.name, "Building deferred operation");
            self.inner = Some(factory()?);
        }

        self.inner.as_mut().ok_or_else(|| OperationError::Factory {
            step: self.name.clone(),
            reason: "operation missing after build".to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Operation for LazyOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn recovery(&self) -> Recovery {
        match &self.inner {
            Some(inner) => inner.recovery(),
            None => self.recovery,
        }
    }

    async fn perform(&mut self, ctx: &StepContext) -> Result<OperationResult, OperationError> {
        let inner = self.materialize()?;
        inner.perform(ctx).await
    }

    async fn revert(&mut self) -> Result<(), OperationError> {
        match self.inner.as_mut() {
            Some(inner) => inner.revert().await,
            None => Ok(()),
        }
    }
}

/// One entry of an operation sequence.
pub enum Step {
    Real(Box<dyn Operation>),
    Delegate(DelegateOperation),
    Lazy(LazyOperation),
}

impl Step {
    /// Wrap a concrete operation.
    pub fn real(operation: impl Operation + 'static) -> Self {
        Step::Real(Box::new(operation))
    }

    /// Wrap a perform-only closure.
    pub fn delegate(name: impl Into<String>, perform: impl FnMut() + Send + 'static) -> Self {
        Step::Delegate(DelegateOperation::new(name, perform))
    }

    /// Wrap a factory that builds the operation on first perform.
    pub fn lazy<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: FnOnce() -> Result<Box<dyn Operation>, OperationError> + Send + 'static,
    {
        Step::Lazy(LazyOperation::new(name, factory))
    }

    fn as_operation(&self) -> &dyn Operation {
        match self {
            Step::Real(op) => op.as_ref(),
            Step::Delegate(op) => op,
            Step::Lazy(op) => op,
        }
    }

    fn as_operation_mut(&mut self) -> &mut dyn Operation {
        match self {
            Step::Real(op) => op.as_mut(),
            Step::Delegate(op) => op,
            Step::Lazy(op) => op,
        }
    }
}

impl From<DelegateOperation> for Step {
    fn from(op: DelegateOperation) -> Self {
        Step::Delegate(op)
    }
}

impl From<LazyOperation> for Step {
    fn from(op: LazyOperation) -> Self {
        Step::Lazy(op)
    }
}

impl From<Box<dyn Operation>> for Step {
    fn from(op: Box<dyn Operation>) -> Self {
        Step::Real(op)
    }
}

#[async_trait::async_trait]
impl Operation for Step {
    fn name(&self) -> &str {
        self.as_operation().name()
    }

    fn recovery(&self) -> Recovery {
        self.as_operation().recovery()
    }

    async fn perform(&mut self, ctx: &StepContext) -> Result<OperationResult, OperationError> {
        self.as_operation_mut().perform(ctx).await
    }

    async fn revert(&mut self) -> Result<(), OperationError> {
        self.as_operation_mut().revert().await
    }
}
