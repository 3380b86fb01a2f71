//! Error handling for the bufferflow core layer.
//!
//! The main error type for this crate is [`CoreError`], which wraps the more
//! specific [`ConfigError`] and [`LoggingError`]. Buffer and surface crates
//! define their own error enums and only reach for `CoreError` when they
//! surface configuration or logging failures.
//!
//! # Examples
//!
//! ```rust,ignore
//! use bufferflow_core::error::{ConfigError, CoreError};
//!
//! fn check_capacity(capacity: u32) -> Result<(), CoreError> {
//!     if capacity == 0 {
//!         return Err(ConfigError::ValidationError("slot capacity must be positive".to_string()).into());
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for bufferflow.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Errors related to configuration loading, parsing, or validation.
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),

    /// Errors that occur while installing the global tracing subscriber.
    #[error("Logging Initialization Failed: {0}")]
    LoggingInitialization(String),

    /// A logging configuration that cannot be turned into a subscriber.
    #[error("Logging Error: {0}")]
    Logging(#[from] LoggingError),

    /// Filesystem operations that are not covered by a configuration read error.
    #[error("Filesystem Error: {message} (Path: {path:?})")]
    Filesystem {
        message: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error type for configuration-related operations.
///
/// Typically wrapped by [`CoreError::Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the configuration file failed for a reason other than absence.
    #[error("Failed to read configuration file from {path:?}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or does not match the schema.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Parsing succeeded but a value is out of range.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Error type for logging-related operations.
#[derive(Error, Debug)]
pub enum LoggingError {
    /// The logging configuration could not be turned into a subscriber.
    #[error("Failed to initialize logging: {0}")]
    InitializationFailure(String),

    /// A log filter directive could not be parsed.
    #[error("Failed to set log filter: {0}")]
    FilterError(String),
}

/// Result alias used across the core crate.
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_core_error_config_variant() {
        let core_err = CoreError::Config(ConfigError::ValidationError("capacity is zero".to_string()));

        assert_eq!(
            format!("{}", core_err),
            "Configuration Error: Configuration validation failed: capacity is zero"
        );
        match core_err.source().unwrap().downcast_ref::<ConfigError>() {
            Some(ConfigError::ValidationError(msg)) => assert_eq!(msg, "capacity is zero"),
            _ => panic!("Incorrect source for CoreError::Config"),
        }
    }

    #[test]
    fn test_core_error_filesystem_variant() {
        let path = PathBuf::from("/tmp/bufferflow/logs");
        let core_err = CoreError::Filesystem {
            message: "Could not create log directory".to_string(),
            path: path.clone(),
            source: IoError::new(ErrorKind::PermissionDenied, "denied"),
        };

        assert_eq!(
            format!("{}", core_err),
            format!("Filesystem Error: Could not create log directory (Path: {:?})", path)
        );
        assert_eq!(
            core_err.source().unwrap().downcast_ref::<IoError>().unwrap().kind(),
            ErrorKind::PermissionDenied
        );
    }

    #[test]
    fn test_logging_error_wraps_into_core_error() {
        let core_err: CoreError = LoggingError::FilterError("bad directive".to_string()).into();
        assert_eq!(format!("{}", core_err), "Logging Error: Failed to set log filter: bad directive");
    }
}
