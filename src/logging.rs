//! Logging configuration for ipidbench
//!
//! Structured logging to stderr by default, or to a file when one is
//! given. Nothing is logged while a trial is running; progress lines
//! land between trials only.

use std::path::Path;
use std::sync::OnceLock;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

pub fn init_logging(debug: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if debug { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ipidbench={level}")));

    match log_file {
        Some(path) => {
            let default_dir = Path::new(".");
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(default_dir);
            std::fs::create_dir_all(dir)?;

            let appender =
                tracing_appender::rolling::never(dir, path.file_name().unwrap_or_default());
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            // Keep the writer alive for the life of the process.
            let _ = LOG_GUARD.set(guard);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
