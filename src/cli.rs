//! CLI definitions for Lockstep.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Lockstep CLI.
#[derive(Parser)]
#[command(name = "lockstep")]
#[command(about = "Staged, reversible client startup")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (defaults to the user config directory)
    #[arg(short, long, env = "LOCKSTEP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Start the client and keep it running until interrupted (default)
    Run {
        /// Token presented to the runtime, overrides client.auth_token
        #[arg(long, env = "LOCKSTEP_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Answer for failed startup steps, overrides client.on_failure
        #[arg(long, value_parser = ["retry", "abort", "ignore"])]
        on_failure: Option<String>,

        /// Log filter, overrides logging.level
        #[arg(long)]
        log_level: Option<String>,
    },

    /// Load and validate the configuration
    CheckConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::try_parse_from([
            "lockstep",
            "--config",
            "/tmp/lockstep.toml",
            "run",
            "--on-failure",
            "retry",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/lockstep.toml")));
        match cli.command {
            Some(Commands::Run {
                on_failure,
                log_level,
                ..
            }) => {
                assert_eq!(on_failure.as_deref(), Some("retry"));
                assert_eq!(log_level.as_deref(), Some("debug"));
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let result = Cli::try_parse_from(["lockstep", "run", "--on-failure", "later"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_check_config() {
        let cli = Cli::try_parse_from(["lockstep", "check-config"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::CheckConfig)));
    }
}
