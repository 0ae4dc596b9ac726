//! Configuration schema definitions.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sequence: SequenceConfig,

    #[serde(default)]
    pub hooks: HooksConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub client: ClientConfig,
}

/// Startup sequence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceConfig {
    /// Retries allowed per failing step. Zero means unbounded.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// How long to wait for a decision on a failed step.
    /// Omitted means wait indefinitely.
    #[serde(default)]
    pub decision_timeout_secs: Option<u64>,

    /// Whether completed steps are reverted when the client shuts down.
    #[serde(default = "default_true")]
    pub revert_on_shutdown: bool,
}

fn default_max_retries() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            decision_timeout_secs: None,
            revert_on_shutdown: true,
        }
    }
}

impl SequenceConfig {
    pub fn decision_timeout(&self) -> Option<Duration> {
        self.decision_timeout_secs.map(Duration::from_secs)
    }
}

/// System hook configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HooksConfig {
    /// How long to wait for an owner thread to report attachment.
    #[serde(default = "default_attach_timeout")]
    pub attach_timeout_secs: u64,

    /// Install the keyboard interception hook.
    #[serde(default = "default_true")]
    pub keyboard: bool,

    /// Install the mouse interception hook.
    #[serde(default = "default_true")]
    pub mouse: bool,

    /// Install the foreground window hook.
    #[serde(default = "default_true")]
    pub window: bool,
}

fn default_attach_timeout() -> u64 {
    5
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            attach_timeout_secs: default_attach_timeout(),
            keyboard: true,
            mouse: true,
            window: true,
        }
    }
}

impl HooksConfig {
    pub fn attach_timeout(&self) -> Duration {
        Duration::from_secs(self.attach_timeout_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file; `~` is expanded. Logs go to stderr only when unset.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Emit JSON lines instead of plain text.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
            json: false,
        }
    }
}

/// What the client answers when a startup step fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    Retry,
    #[default]
    Abort,
    Ignore,
}

impl FailurePolicy {
    pub const NAMES: [&'static str; 3] = ["retry", "abort", "ignore"];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "retry" => Some(Self::Retry),
            "abort" => Some(Self::Abort),
            "ignore" => Some(Self::Ignore),
            _ => None,
        }
    }
}

/// Client identity and behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Token presented to the runtime when connecting.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Address of the runtime host.
    #[serde(default)]
    pub runtime_uri: Option<String>,

    /// One of `retry`, `abort` or `ignore`.
    #[serde(default = "default_on_failure")]
    pub on_failure: String,
}

fn default_on_failure() -> String {
    "abort".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auth_token: None,
            runtime_uri: None,
            on_failure: default_on_failure(),
        }
    }
}

impl ClientConfig {
    /// The configured failure policy, falling back to abort when unknown.
    pub fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::parse(&self.on_failure).unwrap_or_default()
    }
}
