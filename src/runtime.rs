//! Connection to the supervising runtime process.
//!
//! The transport is out of scope here: [`RuntimeProxy`] is the capability the
//! client operations need, and [`OfflineRuntime`] serves it in-process.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use lockstep_config::ClientConfig;

const OFFLINE_ADDRESS: &str = "offline://local";

/// Errors raised while talking to the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Runtime unreachable: {0}")]
    Unreachable(String),

    #[error("Not connected to the runtime")]
    NotConnected,
}

/// Application level configuration handed out by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the client is reachable at.
    pub client_address: String,
}

/// Session settings the client operations act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    pub intercept_keyboard: bool,
    pub intercept_mouse: bool,
    pub monitor_windows: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            intercept_keyboard: true,
            intercept_mouse: true,
            monitor_windows: true,
        }
    }
}

/// Everything the runtime sends the client for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfiguration {
    pub session_id: Uuid,
    pub app_config: AppConfig,
    pub settings: ClientSettings,
}

impl ClientConfiguration {
    /// A fresh session bound to `client_address`.
    pub fn new(client_address: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            app_config: AppConfig {
                client_address: client_address.into(),
            },
            settings: ClientSettings::default(),
        }
    }
}

/// Requests the client sends to its runtime.
#[async_trait]
pub trait RuntimeProxy: Send + Sync {
    /// Open the connection. `Ok(false)` means the runtime refused it.
    async fn connect(&self, token: Option<&str>) -> Result<bool, RuntimeError>;

    /// Fetch the configuration for the current session.
    async fn get_configuration(&self) -> Result<ClientConfiguration, RuntimeError>;

    /// Tell the runtime the client finished starting up.
    async fn inform_client_ready(&self) -> Result<(), RuntimeError>;

    /// Close the connection.
    async fn disconnect(&self) -> Result<(), RuntimeError>;
}

/// In-process runtime used when no supervising process is attached.
pub struct OfflineRuntime {
    expected_token: Option<String>,
    configuration: ClientConfiguration,
    connected: AtomicBool,
    ready: AtomicBool,
}

impl OfflineRuntime {
    pub fn new(expected_token: Option<String>, configuration: ClientConfiguration) -> Self {
        Self {
            expected_token,
            configuration,
            connected: AtomicBool::new(false),
            ready: AtomicBool::new(false),
        }
    }

    /// Accept the configured token and serve a fresh session.
    pub fn from_config(config: &ClientConfig) -> Self {
        let address = config
            .runtime_uri
            .clone()
            .unwrap_or_else(|| OFFLINE_ADDRESS.to_string());
        Self::new(config.auth_token.clone(), ClientConfiguration::new(address))
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn ensure_connected(&self) -> Result<(), RuntimeError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(RuntimeError::NotConnected)
        }
    }
}

#[async_trait]
impl RuntimeProxy for OfflineRuntime {
    async fn connect(&self, token: Option<&str>) -> Result<bool, RuntimeError> {
        let accepted = match self.expected_token.as_deref() {
            Some(expected) => token == Some(expected),
            None => true,
        };

        if accepted {
            self.connected.store(true, Ordering::SeqCst);
            info!("Offline runtime accepted connection");
        } else {
            debug!("Offline runtime rejected authentication token");
        }
        Ok(accepted)
    }

    async fn get_configuration(&self) -> Result<ClientConfiguration, RuntimeError> {
        self.ensure_connected()?;
        Ok(self.configuration.clone())
    }

    async fn inform_client_ready(&self) -> Result<(), RuntimeError> {
        self.ensure_connected()?;
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), RuntimeError> {
        self.ensure_connected()?;
        self.connected.store(false, Ordering::SeqCst);
        self.ready.store(false, Ordering::SeqCst);
        info!("Offline runtime closed connection");
        Ok(())
    }
}
