//! Shutdown signal handling for the client process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

/// Why the client is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl+C / SIGINT.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// Requested from inside the process.
    Requested,
}

impl std::fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownReason::Interrupt => write!(f, "INTERRUPT"),
            ShutdownReason::Terminate => write!(f, "TERMINATE"),
            ShutdownReason::Requested => write!(f, "REQUESTED"),
        }
    }
}

/// Fans shutdown requests out to every interested task.
#[derive(Clone)]
pub struct SignalHandler {
    sender: broadcast::Sender<ShutdownReason>,
    shutdown_requested: Arc<AtomicBool>,
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHandler {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self {
            sender,
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownReason> {
        self.sender.subscribe()
    }

    pub fn request_shutdown(&self, reason: ShutdownReason) {
        debug!("Shutdown requested: {}", reason);
        self.shutdown_requested.store(true, Ordering::SeqCst);
        let _ = self.sender.send(reason);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    /// Resolve once shutdown has been requested, including before the call.
    pub async fn wait_for_shutdown(&self) {
        let mut receiver = self.subscribe();
        if self.is_shutdown_requested() {
            return;
        }
        loop {
            match receiver.recv().await {
                Ok(_) => return,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }

    /// Set up OS signal handlers (Unix only).
    #[cfg(unix)]
    pub fn setup_os_signals(&self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let sigterm_handler = self.clone();
        tokio::spawn(async move {
            while sigterm.recv().await.is_some() {
                info!("Received SIGTERM");
                sigterm_handler.request_shutdown(ShutdownReason::Terminate);
            }
        });

        let mut sigint = signal(SignalKind::interrupt())?;
        let sigint_handler = self.clone();
        tokio::spawn(async move {
            while sigint.recv().await.is_some() {
                info!("Received SIGINT");
                sigint_handler.request_shutdown(ShutdownReason::Interrupt);
            }
        });

        info!("OS signal handlers installed (SIGTERM, SIGINT)");
        Ok(())
    }

    /// Set up OS signal handlers (non-Unix fallback).
    #[cfg(not(unix))]
    pub fn setup_os_signals(&self) -> std::io::Result<()> {
        let handler = self.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl+C");
                handler.request_shutdown(ShutdownReason::Interrupt);
            }
        });

        info!("OS signal handler installed (Ctrl+C)");
        Ok(())
    }
}
