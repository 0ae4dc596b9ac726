//! Lockstep - staged, reversible client startup
//!
//! Main entry point for the Lockstep client.

use std::path::Path;

use clap::Parser;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use lockstep_config::LoggingConfig;

mod cli;
mod cmd_config;
mod cmd_run;
mod composition;
mod context;
mod decision;
mod native;
mod operations;
mod runtime;
mod signal;

use cli::{Cli, Commands};
use cmd_run::RunOverrides;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Initialize tracing with console and optional file output.
///
/// `RUST_LOG` takes precedence over the configured level. The log file is
/// rotated daily.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let console = if logging.json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(true).with_ansi(true).boxed()
    };

    let file = match logging.file.as_deref() {
        Some(path) => {
            let writer = rolling_writer(path)?;
            let layer = if logging.json {
                fmt::layer().json().with_writer(writer).boxed()
            } else {
                fmt::layer().with_writer(writer).with_ansi(false).boxed()
            };
            Some(layer)
        }
        None => None,
    };

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&logging.level))?;

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .with(env_filter)
        .init();

    Ok(())
}

fn rolling_writer(path: &Path) -> anyhow::Result<tracing_appender::non_blocking::NonBlocking> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let prefix = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("lockstep");
    let suffix = path.extension().and_then(|s| s.to_str()).unwrap_or("log");

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix(suffix)
        .max_log_files(30)
        .build(dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The guard flushes on drop and must live for the whole process.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    Ok(non_blocking)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run {
        token: None,
        on_failure: None,
        log_level: None,
    });

    match command {
        Commands::CheckConfig => cmd_config::check_config(cli.config.as_deref()),
        Commands::Run {
            token,
            on_failure,
            log_level,
        } => {
            let overrides = RunOverrides {
                token,
                on_failure,
                log_level,
            };
            let (config, warnings) = cmd_run::prepare_config(cli.config.as_deref(), overrides)?;

            init_tracing(&config.logging)?;
            info!(
                "# New client instance started at {}",
                chrono::Local::now().format(TIMESTAMP_FORMAT)
            );
            info!("Lockstep v{}", env!("CARGO_PKG_VERSION"));
            for warning in &warnings {
                warn!("Config warning at {}: {}", warning.path, warning.message);
            }

            let result = cmd_run::run_client(&config).await;

            info!(
                "# Client instance terminated at {}",
                chrono::Local::now().format(TIMESTAMP_FORMAT)
            );
            result
        }
    }
}
