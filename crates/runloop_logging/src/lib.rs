//! Shared logging utilities for Runloop binaries.
//!
//! Diagnostics go to a daily rolling file under `<RUNLOOP_HOME>/logs` and to
//! stderr. stdout is left alone: the human gate prompts and command output
//! live there.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "runloop=info,runloop_ledger=info,runloop_gate=info,runloop_drift=info";
const VERBOSE_LOG_FILTER: &str = "runloop=debug,runloop_ledger=debug,runloop_gate=debug,runloop_drift=debug,runloop_schema=debug";

/// Logging configuration shared by Runloop binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
}

/// Initialize tracing with a rolling file writer and stderr output.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// lifetime of the process.
pub fn init_logging(config: LogConfig<'_>) -> Result<Option<WorkerGuard>> {
    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let console_filter = if config.verbose {
        EnvFilter::new(VERBOSE_LOG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let mut guard = None;
    let file_layer = match ensure_logs_dir() {
        Ok(log_dir) => {
            let appender = tracing_appender::rolling::daily(
                log_dir,
                format!("{}.log", sanitize_name(config.app_name)),
            );
            let (writer, worker_guard) = tracing_appender::non_blocking(appender);
            guard = Some(worker_guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(file_filter),
            )
        }
        Err(err) => {
            eprintln!("Warning: failed to create logs directory: {:#}", err);
            None
        }
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

/// Get the Runloop home directory: `$RUNLOOP_HOME`, else `~/.runloop`.
pub fn runloop_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("RUNLOOP_HOME") {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .map(|home| home.join(".runloop"))
        .unwrap_or_else(|| PathBuf::from(".").join(".runloop"))
}

/// Get the logs directory: `<RUNLOOP_HOME>/logs`
pub fn logs_dir() -> PathBuf {
    runloop_home().join("logs")
}

/// Get the config file path: `<RUNLOOP_HOME>/config.toml`
pub fn config_path() -> PathBuf {
    runloop_home().join("config.toml")
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("runloop"), "runloop");
        assert_eq!(sanitize_name("run loop/x"), "run_loop_x");
    }

    #[test]
    fn test_paths_hang_off_home() {
        let home = runloop_home();
        assert_eq!(logs_dir(), home.join("logs"));
        assert_eq!(config_path(), home.join("config.toml"));
    }
}
