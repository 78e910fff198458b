//! Log file setup
//!
//! The stdout log receives INFO and above, the stderr log WARN and above.
//! Console output goes to stderr at WARN (INFO with `--verbose`) and can be
//! tuned with `RUST_LOG`. Read-only queries use [`init_console`] and leave
//! the log files alone.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::{LogSettings, LogTarget};

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Cannot open log file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Logging is already initialized: {0}")]
    Install(#[from] TryInitError),
}

/// Keeps the background log writers alive; dropping it flushes them.
#[must_use = "dropping the guard stops the log writers"]
pub struct LoggingGuard {
    _stdout: WorkerGuard,
    _stderr: WorkerGuard,
}

/// Open a log file, truncating it unless `append` is set.
pub fn open_log(target: &LogTarget) -> Result<File, LoggingError> {
    let mut options = OpenOptions::new();
    options.create(true);
    if target.append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }

    options.open(&target.path).map_err(|source| LoggingError::Open {
        path: PathBuf::from(&target.path),
        source,
    })
}

/// Install the global subscriber.
pub fn init(settings: &LogSettings, verbose: bool) -> Result<LoggingGuard, LoggingError> {
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(open_log(&settings.stdout)?);
    let (stderr_writer, stderr_guard) = tracing_appender::non_blocking(open_log(&settings.stderr)?);

    let stdout_layer = fmt::layer()
        .with_writer(stdout_writer)
        .with_ansi(false)
        .with_target(false)
        .with_filter(LevelFilter::INFO);

    let stderr_layer = fmt::layer()
        .with_writer(stderr_writer)
        .with_ansi(false)
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(stderr_layer)
        .with(console_layer(verbose))
        .try_init()?;

    Ok(LoggingGuard {
        _stdout: stdout_guard,
        _stderr: stderr_guard,
    })
}

/// Install a console-only subscriber; no log file is opened.
pub fn init_console(verbose: bool) -> Result<(), LoggingError> {
    tracing_subscriber::registry()
        .with(console_layer(verbose))
        .try_init()?;
    Ok(())
}

fn console_layer<S>(verbose: bool) -> impl Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let level = if verbose {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(filter)
}
