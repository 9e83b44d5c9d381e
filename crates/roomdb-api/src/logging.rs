//! Logging setup for roomdb processes
//!
//! The library only emits `tracing` events. Binaries call
//! [`LogConfig::init`] once to install a subscriber; `RUST_LOG` overrides
//! the configured level.

use roomdb_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "roomdb.log";

/// Where log lines go
#[derive(Debug, Clone)]
pub enum LogOutput {
    /// Standard output
    Stdout,
    /// A daily rolling file
    File(PathBuf),
    /// Standard output and a daily rolling file
    Both(PathBuf),
}

/// Line format
#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    /// Multi-line, human-readable
    Pretty,
    /// One line per event
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive
    pub level: String,
    /// Output destination
    pub output: LogOutput,
    /// Format style
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: LogOutput::Stdout,
            format: LogFormat::Compact,
        }
    }
}

impl LogConfig {
    /// Info level to stdout
    pub fn info() -> Self {
        Self::default()
    }

    /// Debug level to stdout; shows slot I/O and lock traffic
    pub fn debug() -> Self {
        Self::default().with_level("debug")
    }

    /// Warn level to stdout; shows only rejected operations and timeouts
    pub fn warn() -> Self {
        Self::default().with_level("warn")
    }

    /// Log to a rolling file only
    pub fn with_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::File(path.into());
        self
    }

    /// Log to stdout and a rolling file
    pub fn with_both<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::Both(path.into());
        self
    }

    /// Set the line format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the filter directive
    pub fn with_level<S: Into<String>>(mut self, level: S) -> Self {
        self.level = level.into();
        self
    }

    /// Install the global subscriber.
    ///
    /// When logging to a file the returned guard must be kept alive; dropping
    /// it flushes and stops the background writer. Fails with
    /// `Error::Config` for an invalid filter or when a subscriber is
    /// already installed.
    ///
    /// ```rust,no_run
    /// use roomdb::logging::LogConfig;
    ///
    /// let _guard = LogConfig::info().with_file("logs/roomdb.log").init()?;
    /// # Ok::<(), roomdb::Error>(())
    /// ```
    pub fn init(self) -> Result<Option<WorkerGuard>> {
        let filter = self.filter()?;
        let registry = tracing_subscriber::registry().with(filter);

        let (installed, guard) = match (self.output, self.format) {
            (LogOutput::Stdout, LogFormat::Pretty) => {
                (registry.with(fmt::layer().pretty()).try_init(), None)
            }
            (LogOutput::Stdout, LogFormat::Compact) => {
                (registry.with(fmt::layer().compact()).try_init(), None)
            }
            (LogOutput::File(path), LogFormat::Pretty) => {
                let (writer, guard) = rolling_writer(&path);
                let layer = fmt::layer().with_writer(writer).with_ansi(false).pretty();
                (registry.with(layer).try_init(), Some(guard))
            }
            (LogOutput::File(path), LogFormat::Compact) => {
                let (writer, guard) = rolling_writer(&path);
                let layer = fmt::layer().with_writer(writer).with_ansi(false).compact();
                (registry.with(layer).try_init(), Some(guard))
            }
            (LogOutput::Both(path), _) => {
                // Both outputs share the compact format
                let (writer, guard) = rolling_writer(&path);
                let installed = registry
                    .with(fmt::layer().compact())
                    .with(fmt::layer().with_writer(writer).with_ansi(false).compact())
                    .try_init();
                (installed, Some(guard))
            }
        };

        installed.map_err(|e| Error::Config(format!("failed to install logger: {}", e)))?;
        Ok(guard)
    }

    fn filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .map_err(|e| Error::Config(format!("invalid log level {:?}: {}", self.level, e)))
    }
}

fn rolling_writer(path: &Path) -> (NonBlocking, WorkerGuard) {
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE);

    let appender = tracing_appender::rolling::daily(directory, file_name);
    tracing_appender::non_blocking(appender)
}
