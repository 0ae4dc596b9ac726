//! `check-config` subcommand.

use std::path::Path;

use anyhow::bail;

use lockstep_config::{Config, ConfigLoader, ConfigValidator};

/// Load the configuration and print every finding.
pub(crate) fn check_config(path: Option<&Path>) -> anyhow::Result<()> {
    let config = ConfigLoader::load_or_default(path)?;
    report(&config)
}

fn report(config: &Config) -> anyhow::Result<()> {
    let result = ConfigValidator::validate(config)?;

    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}", error);
    }

    if !result.is_valid() {
        bail!("configuration has {} error(s)", result.errors.len());
    }

    println!(
        "Configuration OK ({} warning(s))",
        result.warnings.len()
    );
    Ok(())
}
