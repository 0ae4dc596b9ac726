//! Dedicated owner threads for system hooks.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::HookError;
use crate::hook::{HookDetacher, SystemHook};
use crate::registrar::{EventClass, EventRegistrar, HookCallback};

/// Starts hooks on their own owner threads.
#[derive(Clone)]
pub struct HookMonitor {
    registrar: Arc<dyn EventRegistrar>,
    attach_timeout: Duration,
}

impl HookMonitor {
    /// Create a monitor with a 5 second attach timeout.
    pub fn new(registrar: Arc<dyn EventRegistrar>) -> Self {
        Self {
            registrar,
            attach_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_attach_timeout(mut self, timeout: Duration) -> Self {
        self.attach_timeout = timeout;
        self
    }

    pub fn attach_timeout(&self) -> Duration {
        self.attach_timeout
    }

    /// Spawn an owner thread, attach the hook there and wait for the outcome.
    ///
    /// The owner thread stays parked in `await_detach` until the returned
    /// registration is stopped or dropped.
    pub async fn start(
        &self,
        class: EventClass,
        callback: HookCallback,
    ) -> Result<HookRegistration, HookError> {
        let (mut hook, detacher) = SystemHook::new(class, callback);
        let id = hook.id();
        let registrar = self.registrar.clone();
        let (ready_tx, ready_rx) = oneshot::channel();

        let thread = std::thread::Builder::new()
            .name(format!("hook-{}", class))
            .spawn(move || match hook.attach(registrar.as_ref()) {
                Ok(()) => {
                    let _ = ready_tx.send(Ok(()));
                    hook.await_detach(registrar.as_ref())
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    false
                }
            })
            .map_err(|e| HookError::Thread(e.to_string()))?;

        match tokio::time::timeout(self.attach_timeout, ready_rx).await {
            Ok(Ok(Ok(()))) => {
                debug!("Hook {} running on owner thread", id);
                Ok(HookRegistration {
                    id,
                    class,
                    detacher,
                    thread,
                })
            }
            Ok(Ok(Err(e))) => {
                error!("Failed to start {} hook: {}", class, e);
                Err(e)
            }
            Ok(Err(_)) => Err(HookError::OwnerUnavailable),
            Err(_) => {
                // Dropping the detacher makes a late attach uninstall itself.
                warn!("{} hook did not attach within {:?}", class, self.attach_timeout);
                drop(detacher);
                Err(HookError::AttachTimeout(self.attach_timeout))
            }
        }
    }
}

/// A running hook and its owner thread.
pub struct HookRegistration {
    id: Uuid,
    class: EventClass,
    detacher: HookDetacher,
    thread: JoinHandle<bool>,
}

impl HookRegistration {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn class(&self) -> EventClass {
        self.class
    }

    pub fn is_attached(&self) -> bool {
        self.detacher.is_attached()
    }

    /// Detach the hook and join its owner thread. Blocks.
    ///
    /// Returns whether the native uninstall succeeded.
    pub fn stop(self) -> bool {
        let success = self.detacher.detach();
        if self.thread.join().is_err() {
            error!("Owner thread of hook {} panicked", self.id);
            return false;
        }
        success
    }
}
