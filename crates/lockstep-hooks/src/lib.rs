//! # Lockstep Hooks
//!
//! Safe installation and removal of native event callbacks.
//!
//! A hook is attached on a dedicated owner thread that must stay responsive
//! for as long as the hook lives. Teardown is requested from any other
//! thread and completes through a two-signal handshake: the requester
//! signals, the owner uninstalls and signals back.
//!
//! ## Components
//!
//! - [`SystemHook`] / [`HookDetacher`] - The two halves of the handshake
//! - [`EventRegistrar`] - Platform capability to register callbacks
//! - [`HookMonitor`] - Spawns owner threads and waits for attachment
//! - [`HookOperation`] - A hook as a revertible sequence step
//! - [`LocalEventSource`] - In-process registrar
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lockstep_hooks::{EventClass, HookMonitor, LocalEventSource};
//!
//! let monitor = HookMonitor::new(Arc::new(LocalEventSource::new()));
//! let registration = monitor.start(EventClass::Keyboard, callback).await?;
//! // ... from a blocking context:
//! let released = registration.stop();
//! ```

pub mod error;
pub mod hook;
pub mod monitor;
pub mod operation;
pub mod registrar;

pub use error::HookError;
pub use hook::{HookDetacher, SystemHook};
pub use monitor::{HookMonitor, HookRegistration};
pub use operation::HookOperation;
pub use registrar::{EventClass, EventRegistrar, HookCallback, HookEvent, HookHandle, LocalEventSource};
