//! Logging setup for bufferflow.
//!
//! Built on the `tracing` ecosystem: a console layer plus an optional daily
//! rolling file layer, each in text or JSON format. Library code only emits
//! `tracing` events; installing a subscriber is left to the embedding process
//! through [`init_logging`] or [`init_minimal_logging`].

use crate::config::LoggingConfig;
use crate::error::{CoreError, LoggingError};

use once_cell::sync::Lazy;
use std::io::stdout;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Initializes a minimal logging setup on `stderr`.
///
/// Filters with `RUST_LOG`, defaulting to "info". Errors from an already
/// installed subscriber are ignored, so tests may call this repeatedly.
pub fn init_minimal_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    let _ = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .try_init();
}

/// Creates the file layer and the guard that flushes it.
fn create_file_layer(log_path: &Path, format: &str) -> Result<(BoxedLayer, WorkerGuard), CoreError> {
    let directory = match log_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !directory.exists() {
        std::fs::create_dir_all(directory).map_err(|source| CoreError::Filesystem {
            message: "Failed to create log directory".to_string(),
            path: directory.to_path_buf(),
            source,
        })?;
    }

    let file_name = log_path
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new("bufferflow.log"));
    let file_appender = tracing_appender::rolling::daily(directory, file_name);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let layer: BoxedLayer = match format {
        "json" => fmt::layer().json().with_writer(non_blocking_writer).with_ansi(false).boxed(),
        _ => fmt::layer().with_writer(non_blocking_writer).with_ansi(false).boxed(),
    };
    Ok((layer, guard))
}

/// Keeps the file writer alive for the life of the process.
static LOG_WORKER_GUARD: Lazy<Mutex<Option<WorkerGuard>>> = Lazy::new(|| Mutex::new(None));

fn level_filter(level: &str) -> Result<String, CoreError> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        invalid_level => {
            return Err(CoreError::Logging(LoggingError::InitializationFailure(format!(
                "Invalid log level in config: {}",
                invalid_level
            ))));
        }
    };
    Ok(level.to_string())
}

/// Installs the global subscriber described by `config`.
///
/// With `is_reload` set, a failure to replace an existing subscriber is
/// reported on stderr and treated as success; the new file guard (if any)
/// still replaces the old one.
pub fn init_logging(config: &LoggingConfig, is_reload: bool) -> Result<(), CoreError> {
    let level = level_filter(&config.level)?;
    let format = config.format.to_lowercase();

    let stdout_filter = EnvFilter::try_new(&level).map_err(|e| LoggingError::FilterError(e.to_string()))?;
    let stdout_layer: BoxedLayer = match format.as_str() {
        "json" => fmt::layer()
            .json()
            .with_writer(stdout)
            .with_ansi(false)
            .with_filter(stdout_filter)
            .boxed(),
        _ => fmt::layer()
            .with_writer(stdout)
            .with_ansi(atty::is(atty::Stream::Stdout))
            .with_filter(stdout_filter)
            .boxed(),
    };

    let mut layers: Vec<BoxedLayer> = vec![stdout_layer];
    let mut new_file_guard: Option<WorkerGuard> = None;
    if let Some(log_path) = &config.file_path {
        let file_filter = EnvFilter::try_new(&level).map_err(|e| LoggingError::FilterError(e.to_string()))?;
        let (file_layer, guard) = create_file_layer(log_path, &format)?;
        new_file_guard = Some(guard);
        layers.push(file_layer.with_filter(file_filter).boxed());
    }

    let result = Registry::default().with(layers).try_init();

    match LOG_WORKER_GUARD.lock() {
        Ok(mut guard_slot) => *guard_slot = new_file_guard,
        Err(e) => eprintln!("[ERROR] Failed to lock LOG_WORKER_GUARD: {}. Log flushing may be affected.", e),
    }

    match result {
        Ok(()) => Ok(()),
        Err(e) if is_reload => {
            eprintln!(
                "[INFO] Re-initializing logging configuration attempted. Previous logger may persist. Error: {}",
                e
            );
            Ok(())
        }
        Err(e) => Err(CoreError::LoggingInitialization(format!(
            "Failed to set global tracing subscriber. Was it already initialized? Error: {}",
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_init_minimal_logging_runs_without_panic() {
        init_minimal_logging();
        init_minimal_logging();
        tracing::info!("Minimal logging test: info message after init_minimal_logging.");
    }

    #[test]
    fn test_create_file_layer_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("nested").join("bufferflow.log");

        let result = create_file_layer(&log_path, "json");
        assert!(result.is_ok(), "create_file_layer failed: {:?}", result.err());
        assert!(log_path.parent().unwrap().exists());
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        let config = LoggingConfig {
            level: "loud".to_string(),
            file_path: None,
            format: "text".to_string(),
        };
        let result = init_logging(&config, false);
        assert!(matches!(
            result,
            Err(CoreError::Logging(LoggingError::InitializationFailure(_)))
        ));
    }

    #[test]
    fn test_reload_tolerates_existing_subscriber() {
        init_minimal_logging();
        let temp_dir = TempDir::new().unwrap();
        let config = LoggingConfig {
            level: "debug".to_string(),
            file_path: Some(PathBuf::from(temp_dir.path().join("reload.log"))),
            format: "text".to_string(),
        };
        assert!(init_logging(&config, true).is_ok());
    }
}
