//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::validator::ValidationError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No lockstep configuration at {}", .0.display())]
    NotFound(PathBuf),

    #[error("Could not read lockstep configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Lockstep configuration is not valid TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// `${VAR}` placeholder whose variable is missing from the environment.
    #[error("Configuration references ${{{0}}}, which is not set")]
    EnvVarNotSet(String),

    #[error("Malformed ${{VAR}} placeholder pattern: {0}")]
    Placeholder(String),

    /// Every error the validator found, in check order.
    #[error("Configuration rejected: {}", summarize(.0))]
    Rejected(Vec<ValidationError>),
}

impl ConfigError {
    /// Dotted paths of the rejected settings, empty for other errors.
    pub fn rejected_paths(&self) -> Vec<&str> {
        match self {
            ConfigError::Rejected(errors) => errors.iter().map(|e| e.path.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
