use super::*;
use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::registrar::{HookEvent, LocalEventSource};

struct RejectingRegistrar;

impl EventRegistrar for RejectingRegistrar {
    fn register(&self, class: EventClass, _callback: HookCallback) -> Result<HookHandle, HookError> {
        Err(HookError::attach(class, "rejected by platform"))
    }

    fn unregister(&self, _handle: HookHandle) -> bool {
        panic!("nothing was registered");
    }
}

/// Registers normally but refuses to unregister.
struct StickyRegistrar(LocalEventSource);

impl EventRegistrar for StickyRegistrar {
    fn register(&self, class: EventClass, callback: HookCallback) -> Result<HookHandle, HookError> {
        self.0.register(class, callback)
    }

    fn unregister(&self, _handle: HookHandle) -> bool {
        false
    }
}

fn counting_callback() -> (HookCallback, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    let callback: HookCallback = Arc::new(move |_event: &HookEvent| {
        c.fetch_add(1, Ordering::SeqCst);
    });
    (callback, count)
}

#[test]
fn test_attach_then_detach_from_other_thread() {
    let source = Arc::new(LocalEventSource::new());
    let (callback, count) = counting_callback();
    let (mut hook, detacher) = SystemHook::new(EventClass::Keyboard, callback);
    let (attached_tx, attached_rx) = std::sync::mpsc::channel();

    let owner_source = source.clone();
    let owner = thread::spawn(move || {
        hook.attach(owner_source.as_ref()).unwrap();
        attached_tx.send(()).unwrap();
        hook.await_detach(owner_source.as_ref())
    });

    attached_rx.recv().unwrap();
    assert!(detacher.is_attached());
    assert_eq!(source.emit(&HookEvent::new(EventClass::Keyboard, 1)), 1);

    assert!(detacher.detach());
    assert!(owner.join().unwrap());

    // No callback invocations after detach returns.
    assert_eq!(source.emit(&HookEvent::new(EventClass::Keyboard, 2)), 0);
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(source.registration_count(), 0);
}

#[test]
fn test_detach_waits_for_delivery_in_progress() {
    let source = Arc::new(LocalEventSource::new());
    let detached = Arc::new(AtomicBool::new(false));
    let late_calls = Arc::new(AtomicUsize::new(0));
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);

    // Blocks inside the delivery until released.
    let callback: HookCallback = {
        let detached = detached.clone();
        let late_calls = late_calls.clone();
        Arc::new(move |_event: &HookEvent| {
            let _ = entered_tx.send(());
            let _ = release_rx.lock().recv();
            if detached.load(Ordering::SeqCst) {
                late_calls.fetch_add(1, Ordering::SeqCst);
            }
        })
    };
    let (mut hook, detacher) = SystemHook::new(EventClass::Keyboard, callback);
    let (attached_tx, attached_rx) = mpsc::channel();

    let owner_source = source.clone();
    let owner = thread::spawn(move || {
        hook.attach(owner_source.as_ref()).unwrap();
        attached_tx.send(()).unwrap();
        hook.await_detach(owner_source.as_ref())
    });
    attached_rx.recv().unwrap();

    let emitter_source = source.clone();
    let emitter =
        thread::spawn(move || emitter_source.emit(&HookEvent::new(EventClass::Keyboard, 7)));
    entered_rx.recv().unwrap();

    let detaching = {
        let detached = detached.clone();
        thread::spawn(move || {
            let result = detacher.detach();
            detached.store(true, Ordering::SeqCst);
            result
        })
    };

    // Detach must still be waiting on the delivery.
    thread::sleep(Duration::from_millis(50));
    assert!(!detached.load(Ordering::SeqCst));

    release_tx.send(()).unwrap();
    drop(release_tx);

    assert_eq!(emitter.join().unwrap(), 1);
    assert!(detaching.join().unwrap());
    assert!(owner.join().unwrap());
    assert_eq!(late_calls.load(Ordering::SeqCst), 0);
    assert_eq!(source.emit(&HookEvent::new(EventClass::Keyboard, 8)), 0);
}

#[test]
fn test_attach_fault_leaves_hook_detached() {
    let (callback, _) = counting_callback();
    let (mut hook, detacher) = SystemHook::new(EventClass::Mouse, callback);

    let err = hook.attach(&RejectingRegistrar).unwrap_err();
    assert!(matches!(err, HookError::AttachFault { .. }));
    assert!(!hook.is_attached());
    assert!(hook.handle().is_none());

    // The owner gives up; detach must not block.
    drop(hook);
    assert!(!detacher.detach());
}

#[test]
fn test_attach_twice_registers_once() {
    let source = LocalEventSource::new();
    let (callback, _) = counting_callback();
    let (mut hook, _detacher) = SystemHook::new(EventClass::Display, callback);

    hook.attach(&source).unwrap();
    let handle = hook.handle();
    hook.attach(&source).unwrap();

    assert_eq!(hook.handle(), handle);
    assert_eq!(source.registration_count(), 1);
}

#[test]
fn test_failed_uninstall_still_releases_hook() {
    let registrar = Arc::new(StickyRegistrar(LocalEventSource::new()));
    let (callback, _) = counting_callback();
    let (mut hook, detacher) = SystemHook::new(EventClass::WindowForeground, callback);
    let attached = hook.attached.clone();

    let owner_registrar = registrar.clone();
    let owner = thread::spawn(move || {
        hook.attach(owner_registrar.as_ref()).unwrap();
        hook.await_detach(owner_registrar.as_ref())
    });

    assert!(!detacher.detach());
    assert!(!owner.join().unwrap());
    assert!(!attached.load(Ordering::SeqCst));
}

#[test]
fn test_dropped_detacher_triggers_uninstall() {
    let source = Arc::new(LocalEventSource::new());
    let (callback, _) = counting_callback();
    let (mut hook, detacher) = SystemHook::new(EventClass::Keyboard, callback);

    hook.attach(source.as_ref()).unwrap();
    assert_eq!(source.registration_count(), 1);

    drop(detacher);
    assert!(hook.await_detach(source.as_ref()));
    assert_eq!(source.registration_count(), 0);
}

#[test]
fn test_ids_are_shared_and_unique() {
    let (callback, _) = counting_callback();
    let (first, first_detacher) = SystemHook::new(EventClass::Mouse, callback.clone());
    let (second, _) = SystemHook::new(EventClass::Mouse, callback);

    assert_eq!(first.id(), first_detacher.id());
    assert_ne!(first.id(), second.id());
    assert_eq!(first.class(), EventClass::Mouse);
}

#[test]
fn test_callback_kept_alive_until_detach() {
    let source = Arc::new(LocalEventSource::new());
    let (callback, _) = counting_callback();
    let weak = Arc::downgrade(&callback);
    let (mut hook, detacher) = SystemHook::new(EventClass::Display, callback);

    hook.attach(source.as_ref()).unwrap();
    assert!(weak.upgrade().is_some());

    let owner_source = source.clone();
    let owner = thread::spawn(move || hook.await_detach(owner_source.as_ref()));

    assert!(detacher.detach());
    owner.join().unwrap();
    assert!(weak.upgrade().is_none());
}
