//! Logging setup for the Vessel host.
//!
//! One `tracing-subscriber` stack for the whole process: an `EnvFilter`
//! (overridable via `RUST_LOG`), a formatted console layer, and an optional
//! non-blocking file layer. Initialization is guarded so embedding hosts and
//! tests can call it more than once without panicking.
//!
//! # Example
//!
//! ```rust,ignore
//! use vessel_runtime::logging::LoggingBuilder;
//!
//! let _guard = LoggingBuilder::new()
//!     .directive("vessel=debug")
//!     .file("logs/vessel.log")
//!     .init();
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Set once the global subscriber has been installed.
static LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Builder for the host's tracing subscriber.
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    directive: String,
    file: Option<PathBuf>,
    ansi: bool,
}

impl LoggingBuilder {
    /// Creates a builder with the default `info` directive.
    pub fn new() -> Self {
        Self {
            directive: "info".to_string(),
            file: None,
            ansi: true,
        }
    }

    /// Sets the default filter directive, e.g. `"info"` or `"vessel=debug"`.
    ///
    /// `RUST_LOG` takes precedence when set.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = directive.into();
        self
    }

    /// Additionally writes logs to `path` through a non-blocking appender.
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Disables ANSI colors on the console layer.
    pub fn plain(mut self) -> Self {
        self.ansi = false;
        self
    }

    /// Installs the global subscriber.
    ///
    /// Returns the file appender's worker guard when a file was configured;
    /// the caller must hold it for the lifetime of the process or buffered
    /// lines are lost. Returns `None` — without installing anything — when
    /// logging was already initialized.
    pub fn init(self) -> Option<WorkerGuard> {
        if LOGGING_INITIALIZED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.directive));
        let console = fmt::layer().with_ansi(self.ansi);

        match self.file {
            Some(path) => {
                let directory = path.parent().unwrap_or_else(|| Path::new("."));
                let file_name = path.file_name().unwrap_or_else(|| "vessel.log".as_ref());
                let appender = tracing_appender::rolling::never(directory, file_name);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let file_layer = fmt::layer().with_ansi(false).with_writer(writer);
                tracing_subscriber::registry()
                    .with(filter)
                    .with(console)
                    .with(file_layer)
                    .init();
                Some(guard)
            }
            None => {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(console)
                    .init();
                None
            }
        }
    }

    /// Whether the global subscriber has already been installed.
    pub fn is_initialized() -> bool {
        LOGGING_INITIALIZED.load(Ordering::SeqCst)
    }
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}
