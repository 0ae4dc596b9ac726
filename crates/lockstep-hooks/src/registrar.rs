//! The event-registration capability and an in-process implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::HookError;

/// Class of native events a hook listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventClass {
    Keyboard,
    Mouse,
    WindowForeground,
    Display,
    Other(u32),
}

impl std::fmt::Display for EventClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventClass::Keyboard => write!(f, "keyboard"),
            EventClass::Mouse => write!(f, "mouse"),
            EventClass::WindowForeground => write!(f, "window_foreground"),
            EventClass::Display => write!(f, "display"),
            EventClass::Other(id) => write!(f, "event_{}", id),
        }
    }
}

/// A delivered native event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookEvent {
    pub class: EventClass,
    /// Native object the event concerns (window handle, key code, ...).
    pub target: u64,
    pub at: DateTime<Utc>,
}

impl HookEvent {
    pub fn new(class: EventClass, target: u64) -> Self {
        Self {
            class,
            target,
            at: Utc::now(),
        }
    }
}

/// Callback handed to the native layer. Must stay alive until detached.
pub type HookCallback = Arc<dyn Fn(&HookEvent) + Send + Sync>;

/// Opaque native registration handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle(pub u64);

/// Platform capability for installing and removing event callbacks.
pub trait EventRegistrar: Send + Sync {
    /// Register `callback` for `class`.
    fn register(&self, class: EventClass, callback: HookCallback) -> Result<HookHandle, HookError>;

    /// Remove a registration. Returns whether the native call succeeded.
    fn unregister(&self, handle: HookHandle) -> bool;
}

/// In-process registrar that fans emitted events out to registered callbacks.
///
/// Callbacks run on the thread calling [`LocalEventSource::emit`], under a
/// read lock. `unregister` waits for deliveries in progress, so a callback
/// never runs after its registration is removed. Callbacks must not register
/// or unregister from inside a delivery.
#[derive(Default)]
pub struct LocalEventSource {
    next_handle: AtomicU64,
    callbacks: RwLock<HashMap<HookHandle, (EventClass, HookCallback)>>,
}

impl LocalEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to every callback registered for its class.
    ///
    /// Returns the number of callbacks invoked.
    pub fn emit(&self, event: &HookEvent) -> usize {
        let callbacks = self.callbacks.read();
        let mut delivered = 0;
        for (_, callback) in callbacks.values().filter(|(class, _)| *class == event.class) {
            callback(event);
            delivered += 1;
        }
        trace!("Emitted {} event to {} callback(s)", event.class, delivered);
        delivered
    }

    /// Number of live registrations.
    pub fn registration_count(&self) -> usize {
        self.callbacks.read().len()
    }
}

impl EventRegistrar for LocalEventSource {
    fn register(&self, class: EventClass, callback: HookCallback) -> Result<HookHandle, HookError> {
        let handle = HookHandle(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1);
        self.callbacks.write().insert(handle, (class, callback));
        debug!("Registered {} callback as {:?}", class, handle);
        Ok(handle)
    }

    fn unregister(&self, handle: HookHandle) -> bool {
        let removed = self.callbacks.write().remove(&handle).is_some();
        debug!("Unregistered {:?}: {}", handle, removed);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_callback() -> (HookCallback, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let callback: HookCallback = Arc::new(move |_event: &HookEvent| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (callback, count)
    }

    #[test]
    fn test_event_class_display() {
        assert_eq!(EventClass::Keyboard.to_string(), "keyboard");
        assert_eq!(EventClass::WindowForeground.to_string(), "window_foreground");
        assert_eq!(EventClass::Other(3).to_string(), "event_3");
    }

    #[test]
    fn test_emit_reaches_matching_class_only() {
        let source = LocalEventSource::new();
        let (keyboard, keyboard_count) = counting_callback();
        let (mouse, mouse_count) = counting_callback();

        source.register(EventClass::Keyboard, keyboard).unwrap();
        source.register(EventClass::Mouse, mouse).unwrap();

        let delivered = source.emit(&HookEvent::new(EventClass::Keyboard, 42));
        assert_eq!(delivered, 1);
        assert_eq!(keyboard_count.load(Ordering::SeqCst), 1);
        assert_eq!(mouse_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unregister_stops_delivery() {
        let source = LocalEventSource::new();
        let (callback, count) = counting_callback();

        let handle = source.register(EventClass::Display, callback).unwrap();
        assert_eq!(source.registration_count(), 1);
        assert!(source.unregister(handle));
        assert!(!source.unregister(handle));

        source.emit(&HookEvent::new(EventClass::Display, 1));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(source.registration_count(), 0);
    }

    #[test]
    fn test_handles_are_unique() {
        let source = LocalEventSource::new();
        let (a, _) = counting_callback();
        let (b, _) = counting_callback();

        let first = source.register(EventClass::Mouse, a).unwrap();
        let second = source.register(EventClass::Mouse, b).unwrap();
        assert_ne!(first, second);
    }
}
