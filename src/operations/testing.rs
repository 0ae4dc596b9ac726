//! Recording fakes shared by the client tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::native::NativeMethods;
use crate::runtime::{ClientConfiguration, ClientSettings, RuntimeError, RuntimeProxy};

/// Runtime that records every call and can be told to misbehave.
#[derive(Default)]
pub(crate) struct RecordingRuntime {
    pub calls: Mutex<Vec<String>>,
    /// Number of upcoming connect attempts that fail with an error.
    pub connect_errors: AtomicUsize,
    pub refuse: AtomicBool,
    pub fail_disconnect: AtomicBool,
    pub settings: Mutex<ClientSettings>,
}

impl RecordingRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().push(call.to_string());
    }
}

#[async_trait]
impl RuntimeProxy for RecordingRuntime {
    async fn connect(&self, token: Option<&str>) -> Result<bool, RuntimeError> {
        self.record(&format!("connect:{}", token.unwrap_or("-")));
        if self
            .connect_errors
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(RuntimeError::Unreachable("host not listening".to_string()));
        }
        Ok(!self.refuse.load(Ordering::SeqCst))
    }

    async fn get_configuration(&self) -> Result<ClientConfiguration, RuntimeError> {
        self.record("get_configuration");
        let mut configuration = ClientConfiguration::new("offline://recording");
        configuration.settings = self.settings.lock().clone();
        Ok(configuration)
    }

    async fn inform_client_ready(&self) -> Result<(), RuntimeError> {
        self.record("inform_client_ready");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), RuntimeError> {
        self.record("disconnect");
        if self.fail_disconnect.load(Ordering::SeqCst) {
            return Err(RuntimeError::Unreachable("connection reset".to_string()));
        }
        Ok(())
    }
}

/// Clipboard that counts clears and can be told to fail.
#[derive(Default)]
pub(crate) struct RecordingNative {
    pub clears: AtomicUsize,
    pub fail: AtomicBool,
}

impl RecordingNative {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl NativeMethods for RecordingNative {
    fn empty_clipboard(&self) -> std::io::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(std::io::Error::other("clipboard locked by another process"));
        }
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
