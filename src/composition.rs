//! Assembles the client's dependency set and startup sequence.

use std::sync::Arc;

use tracing::{info, warn};

use lockstep_config::Config;
use lockstep_core::{
    action_channel, ActionRequiredReceiver, DelegateOperation, Operation, OperationError,
    OperationSequence, SequenceError, SequenceOptions, Step,
};
use lockstep_hooks::{EventClass, HookCallback, HookEvent, HookMonitor, HookOperation, LocalEventSource};

use crate::context::ClientContext;
use crate::decision::DecisionPolicy;
use crate::native::NativeMethods;
use crate::operations::{ClipboardOperation, ConfigurationOperation, RuntimeConnectionOperation};
use crate::runtime::{ClientSettings, RuntimeProxy};

const ACTION_CAPACITY: usize = 8;

pub const KEYBOARD_STEP: &str = "keyboard interception";
pub const MOUSE_STEP: &str = "mouse interception";
pub const WINDOW_STEP: &str = "window monitoring";
pub const APP_CONFIG_STEP: &str = "update app config";

/// Everything a running client is made of.
pub struct ClientComponents {
    pub context: ClientContext,
    pub runtime: Arc<dyn RuntimeProxy>,
    /// Registrar the hooks attach to.
    pub events: Arc<LocalEventSource>,
    pub sequence: OperationSequence,
    pub decisions: DecisionPolicy,
    /// Pending decisions for `decisions` to answer.
    pub requests: ActionRequiredReceiver,
}

/// Build the client from its configuration and platform capabilities.
pub fn build_client(
    config: &Config,
    runtime: Arc<dyn RuntimeProxy>,
    native: Arc<dyn NativeMethods>,
) -> Result<ClientComponents, SequenceError> {
    let context = ClientContext::new();
    let events = Arc::new(LocalEventSource::new());
    let monitor =
        HookMonitor::new(events.clone()).with_attach_timeout(config.hooks.attach_timeout());

    let mut steps = vec![
        Step::real(RuntimeConnectionOperation::new(
            context.clone(),
            runtime.clone(),
            config.client.auth_token.clone(),
        )),
        Step::real(ConfigurationOperation::new(context.clone(), runtime.clone())),
        app_config_step(&context),
    ];
    if config.hooks.keyboard {
        steps.push(hook_step(
            KEYBOARD_STEP,
            EventClass::Keyboard,
            |settings| settings.intercept_keyboard,
            &context,
            &monitor,
        ));
    }
    if config.hooks.mouse {
        steps.push(hook_step(
            MOUSE_STEP,
            EventClass::Mouse,
            |settings| settings.intercept_mouse,
            &context,
            &monitor,
        ));
    }
    if config.hooks.window {
        steps.push(hook_step(
            WINDOW_STEP,
            EventClass::WindowForeground,
            |settings| settings.monitor_windows,
            &context,
            &monitor,
        ));
    }
    steps.push(Step::real(ClipboardOperation::new(native)));

    let options = SequenceOptions {
        max_retries: config.sequence.max_retries,
        decision_timeout: config.sequence.decision_timeout(),
        ..Default::default()
    };
    let (sender, requests) = action_channel(ACTION_CAPACITY);
    let sequence = OperationSequence::with_options(steps, options)?.with_action_channel(sender);

    info!(steps = ?sequence.step_names(), "Client startup sequence assembled");

    Ok(ClientComponents {
        context,
        runtime,
        events,
        sequence,
        decisions: DecisionPolicy::new(config.client.failure_policy()),
        requests,
    })
}

fn app_config_step(context: &ClientContext) -> Step {
    let context = context.clone();
    Step::delegate(APP_CONFIG_STEP, move || {
        if !context.apply_app_config() {
            warn!("No client configuration to apply");
        }
    })
}

/// A hook that is only built once the session settings are known.
fn hook_step(
    name: &'static str,
    class: EventClass,
    enabled: fn(&ClientSettings) -> bool,
    context: &ClientContext,
    monitor: &HookMonitor,
) -> Step {
    let context = context.clone();
    let monitor = monitor.clone();

    Step::lazy(name, move || {
        let settings = context.settings().ok_or_else(|| OperationError::Factory {
            step: name.to_string(),
            reason: "client configuration has not been loaded".to_string(),
        })?;

        if !enabled(&settings) {
            info!("{} is disabled for this session", name);
            return Ok(Box::new(DelegateOperation::new(name, || {})) as Box<dyn Operation>);
        }

        let recorder = context.clone();
        let callback: HookCallback =
            Arc::new(move |event: &HookEvent| recorder.record_hook_event(event));
        Ok(Box::new(HookOperation::new(name, monitor, class, callback)) as Box<dyn Operation>)
    })
}

#[cfg(test)]
#[path = "composition_tests.rs"]
mod tests;
