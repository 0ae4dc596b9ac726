//! `run` subcommand: start the client and hold it until shutdown.

use std::path::Path;
use std::sync::Arc;

use anyhow::bail;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use lockstep_config::{Config, ConfigLoader, ConfigValidator, ValidationWarning};
use lockstep_core::{SequenceEvent, SequenceResult};
use lockstep_hooks::EventClass;

use crate::composition::{build_client, ClientComponents};
use crate::native::{HeadlessNativeMethods, NativeMethods};
use crate::runtime::{OfflineRuntime, RuntimeProxy};
use crate::signal::SignalHandler;

/// Command-line values that take precedence over the configuration file.
#[derive(Debug, Default)]
pub(crate) struct RunOverrides {
    pub token: Option<String>,
    pub on_failure: Option<String>,
    pub log_level: Option<String>,
}

/// Load the configuration, apply the overrides and validate the result.
///
/// Any validation error rejects the configuration. Warnings are returned
/// so they can be logged once tracing is up.
pub(crate) fn prepare_config(
    path: Option<&Path>,
    overrides: RunOverrides,
) -> anyhow::Result<(Config, Vec<ValidationWarning>)> {
    let mut config = ConfigLoader::load_or_default(path)?;
    if let Some(token) = overrides.token {
        config.client.auth_token = Some(token);
    }
    if let Some(on_failure) = overrides.on_failure {
        config.client.on_failure = on_failure;
    }
    if let Some(level) = overrides.log_level {
        config.logging.level = level;
    }

    let warnings = ConfigValidator::validate(&config)?.into_result()?;
    Ok((config, warnings))
}

/// Run the client against the in-process runtime.
pub(crate) async fn run_client(config: &Config) -> anyhow::Result<()> {
    let runtime: Arc<dyn RuntimeProxy> = Arc::new(OfflineRuntime::from_config(&config.client));
    let native: Arc<dyn NativeMethods> = Arc::new(HeadlessNativeMethods::new());

    let signals = SignalHandler::new();
    signals.setup_os_signals()?;

    match run_with(config, runtime, native, &signals).await? {
        SequenceResult::Failed => bail!("client startup failed"),
        _ => Ok(()),
    }
}

/// Start up, wait for shutdown, and unwind.
pub(crate) async fn run_with(
    config: &Config,
    runtime: Arc<dyn RuntimeProxy>,
    native: Arc<dyn NativeMethods>,
    signals: &SignalHandler,
) -> anyhow::Result<SequenceResult> {
    let ClientComponents {
        context,
        runtime,
        events,
        mut sequence,
        decisions,
        requests,
    } = build_client(config, runtime, native)?;

    info!("Failed steps are answered with {:?}", decisions.policy());
    let responder = decisions.spawn(requests);
    let progress = log_progress(sequence.subscribe());

    // A shutdown during startup cancels the remaining steps.
    let cancel = sequence.cancellation_token();
    if signals.is_shutdown_requested() {
        cancel.cancel();
    }
    let watcher = {
        let signals = signals.clone();
        tokio::spawn(async move {
            signals.wait_for_shutdown().await;
            cancel.cancel();
        })
    };

    let result = sequence.run().await;
    match result {
        SequenceResult::Completed => {
            if let Err(e) = runtime.inform_client_ready().await {
                warn!("Failed to inform the runtime that the client is ready: {}", e);
            }
            info!("Client is running, waiting for shutdown signal");
            signals.wait_for_shutdown().await;

            info!(
                keyboard = context.hook_event_count(EventClass::Keyboard),
                window = context.hook_event_count(EventClass::WindowForeground),
                "Shutting down client..."
            );
            if config.sequence.revert_on_shutdown {
                let report = sequence.revert_all().await;
                for fault in &report.faults {
                    error!("Failed to revert '{}': {}", fault.step, fault.reason);
                }
                info!(
                    "Reverted {} of {} step(s)",
                    report.reverted.len(),
                    report.visited()
                );
                let leftover = events.registration_count();
                if leftover > 0 {
                    warn!("{} hook registration(s) still active after shutdown", leftover);
                }
            } else {
                info!("Leaving completed steps in place");
            }
        }
        SequenceResult::Cancelled => info!("Client startup was cancelled"),
        SequenceResult::Failed => error!("Client startup failed"),
    }

    watcher.abort();
    // Dropping the sequence closes the decision and progress channels.
    drop(sequence);
    let answered = responder.await?;
    debug!("Answered {} action request(s)", answered);
    let _ = progress.await;

    Ok(result)
}

fn log_progress(mut events: broadcast::Receiver<SequenceEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => debug!(target: "lockstep::progress", "{}", json),
                    Err(_) => debug!(target: "lockstep::progress", ?event),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Skipped {} progress event(s)", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
