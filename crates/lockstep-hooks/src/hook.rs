//! Two-phase hook attach/detach handshake.
//!
//! The owning thread attaches the hook and then parks in
//! [`SystemHook::await_detach`]. Any other thread calls
//! [`HookDetacher::detach`], which signals the owner and blocks until the
//! owner has performed the native uninstall and reported back. After
//! `detach` returns, no further callback invocations occur.
//!
//! Both waits use one-shot channels and must run outside an async runtime
//! (plain threads or `spawn_blocking`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::HookError;
use crate::registrar::{EventClass, EventRegistrar, HookCallback, HookHandle};

#[cfg(test)]
#[path = "hook_tests.rs"]
mod tests;

/// A native event callback owned by one thread.
pub struct SystemHook {
    id: Uuid,
    class: EventClass,
    callback: HookCallback,
    handle: Option<HookHandle>,
    attached: Arc<AtomicBool>,
    detach_requested: oneshot::Receiver<()>,
    detach_completed: oneshot::Sender<bool>,
}

/// The other half of the handshake. Consumed by [`HookDetacher::detach`],
/// so a hook can be detached at most once.
pub struct HookDetacher {
    id: Uuid,
    request: oneshot::Sender<()>,
    completed: oneshot::Receiver<bool>,
    attached: Arc<AtomicBool>,
}

impl SystemHook {
    /// Create a hook and its detacher. Nothing is registered yet.
    pub fn new(class: EventClass, callback: HookCallback) -> (Self, HookDetacher) {
        let id = Uuid::new_v4();
        let attached = Arc::new(AtomicBool::new(false));
        let (request, detach_requested) = oneshot::channel();
        let (detach_completed, completed) = oneshot::channel();

        let hook = Self {
            id,
            class,
            callback,
            handle: None,
            attached: attached.clone(),
            detach_requested,
            detach_completed,
        };
        let detacher = HookDetacher {
            id,
            request,
            completed,
            attached,
        };
        (hook, detacher)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn class(&self) -> EventClass {
        self.class
    }

    /// Native handle, present only while attached.
    pub fn handle(&self) -> Option<HookHandle> {
        self.handle
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    /// Register the callback. Call on the thread that will own the hook.
    ///
    /// Attaching an already attached hook is a no-op.
    pub fn attach(&mut self, registrar: &dyn EventRegistrar) -> Result<(), HookError> {
        if self.handle.is_some() {
            debug!("Hook {} already attached", self.id);
            return Ok(());
        }

        let handle = registrar
            .register(self.class, self.callback.clone())
            .map_err(|e| match e {
                HookError::AttachFault { .. } => e,
                other => HookError::attach(self.class, other.to_string()),
            })?;

        self.handle = Some(handle);
        self.attached.store(true, Ordering::SeqCst);
        info!("Attached {} hook {} ({:?})", self.class, self.id, handle);
        Ok(())
    }

    /// Park the owning thread until a detach is requested, then uninstall.
    ///
    /// A dropped detacher counts as a request, so the handle never leaks.
    /// Returns whether the native uninstall succeeded; either way the hook
    /// is released afterwards.
    pub fn await_detach(self, registrar: &dyn EventRegistrar) -> bool {
        let SystemHook {
            id,
            class,
            callback,
            handle,
            attached,
            detach_requested,
            detach_completed,
        } = self;

        if detach_requested.blocking_recv().is_err() {
            debug!("Detacher for hook {} dropped, detaching", id);
        }

        let success = match handle {
            Some(handle) => registrar.unregister(handle),
            None => false,
        };
        attached.store(false, Ordering::SeqCst);
        // Keep the callback alive until the native layer has let go of it.
        drop(callback);

        if success {
            info!("Detached {} hook {}", class, id);
        } else {
            warn!("Failed to detach {} hook {}", class, id);
        }

        if detach_completed.send(success).is_err() {
            debug!("Nobody waiting on detach result of hook {}", id);
        }
        success
    }
}

impl HookDetacher {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether the hook is currently attached.
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    /// Request the detach and block until the owner has uninstalled the hook.
    ///
    /// Returns `false` if the native uninstall failed or the owner is gone.
    pub fn detach(self) -> bool {
        debug!("Requesting detach of hook {}", self.id);

        if self.request.send(()).is_err() {
            warn!("Owner of hook {} is gone, nothing to detach", self.id);
            return false;
        }

        match self.completed.blocking_recv() {
            Ok(success) => success,
            Err(_) => {
                warn!("Owner of hook {} exited without reporting", self.id);
                false
            }
        }
    }
}
