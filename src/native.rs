//! Platform calls the client needs outside of hook management.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

/// Native platform capability.
pub trait NativeMethods: Send + Sync {
    /// Remove all content from the system clipboard.
    fn empty_clipboard(&self) -> std::io::Result<()>;
}

/// Stand-in used when the client runs without a platform clipboard.
#[derive(Default)]
pub struct HeadlessNativeMethods {
    clears: AtomicUsize,
}

impl HeadlessNativeMethods {
    pub fn new() -> Self {
        Self::default()
    }

    /// How often the clipboard has been emptied.
    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl NativeMethods for HeadlessNativeMethods {
    fn empty_clipboard(&self) -> std::io::Result<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        debug!("Headless clipboard emptied");
        Ok(())
    }
}
