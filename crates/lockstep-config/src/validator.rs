//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::{Config, FailurePolicy};

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Reject the configuration if any error was found, otherwise hand
    /// back the warnings.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(ConfigError::Rejected(self.errors))
        }
    }
}

/// A validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_sequence(config, &mut result);
        Self::validate_hooks(config, &mut result);
        Self::validate_logging(config, &mut result);
        Self::validate_client(config, &mut result);

        Ok(result)
    }

    fn validate_sequence(config: &Config, result: &mut ValidationResult) {
        if config.sequence.decision_timeout_secs == Some(0) {
            result.add_error(ValidationError::new(
                "sequence.decision_timeout_secs",
                "decision_timeout_secs must be greater than 0, omit it to wait indefinitely",
            ));
        }

        if config.sequence.max_retries == 0
            && FailurePolicy::parse(&config.client.on_failure) == Some(FailurePolicy::Retry)
        {
            result.add_warning(ValidationWarning::new(
                "sequence.max_retries",
                "Retries are unbounded and on_failure is 'retry', a persistently failing step will never finish",
            ));
        }
    }

    fn validate_hooks(config: &Config, result: &mut ValidationResult) {
        if config.hooks.attach_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "hooks.attach_timeout_secs",
                "attach_timeout_secs must be greater than 0",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        // Accept plain levels and EnvFilter style `target=level` directives.
        let unknown: Vec<&str> = config
            .logging
            .level
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .filter(|d| {
                let level = d.rsplit('=').next().unwrap_or(d);
                !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str())
            })
            .collect();

        if config.logging.level.trim().is_empty() || !unknown.is_empty() {
            result.add_error(ValidationError::new(
                "logging.level",
                format!(
                    "Unknown log level '{}', valid values: {:?}",
                    config.logging.level, LOG_LEVELS
                ),
            ));
        }

        if let Some(ref file) = config.logging.file {
            if file.file_name().is_none() {
                result.add_error(ValidationError::new(
                    "logging.file",
                    format!("Log file path has no file name: {:?}", file),
                ));
            }
        }
    }

    fn validate_client(config: &Config, result: &mut ValidationResult) {
        if FailurePolicy::parse(&config.client.on_failure).is_none() {
            result.add_error(ValidationError::new(
                "client.on_failure",
                format!(
                    "Unknown failure policy '{}', valid values: {:?}",
                    config.client.on_failure,
                    FailurePolicy::NAMES
                ),
            ));
        }

        if config.client.auth_token.is_none() {
            result.add_warning(ValidationWarning::new(
                "client.auth_token",
                "auth_token is not set, the runtime may reject the connection",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
