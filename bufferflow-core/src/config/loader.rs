//! Configuration loading for bufferflow.
//!
//! [`ConfigLoader`] locates, parses and validates a [`CoreConfig`]. The file
//! path comes from the `BUFFERFLOW_CONFIG` environment variable; when the
//! variable is unset or the file does not exist, defaults are used.
//!
//! ```rust,ignore
//! use bufferflow_core::config::ConfigLoader;
//!
//! match ConfigLoader::load() {
//!     Ok(config) => println!("slot capacity: {}", config.slot_cache.capacity),
//!     Err(e) => {
//!         bufferflow_core::logging::init_minimal_logging();
//!         tracing::error!("Configuration loading failed: {}", e);
//!     }
//! }
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::CoreConfig;
use crate::error::{ConfigError, CoreError};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "BUFFERFLOW_CONFIG";

/// Largest slot table a hardware composer may expose.
pub const MAX_SLOT_CAPACITY: u32 = 64;

/// Namespace for configuration loading.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the configuration named by `BUFFERFLOW_CONFIG`, or defaults.
    pub fn load() -> Result<CoreConfig, CoreError> {
        match env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load_from_path(PathBuf::from(path)),
            None => {
                let mut config = CoreConfig::default();
                Self::validate_config(&mut config)?;
                Ok(config)
            }
        }
    }

    /// Loads and validates the configuration at `path`.
    ///
    /// A missing file yields the default configuration; an empty file does too.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<CoreConfig, CoreError> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Configuration file not found, using defaults");
                String::new()
            }
            Err(e) => {
                return Err(CoreError::Config(ConfigError::ReadError {
                    path: path.to_path_buf(),
                    source: e,
                }));
            }
        };
        Self::from_toml_str(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<CoreConfig, CoreError> {
        let mut config: CoreConfig = if content.trim().is_empty() {
            CoreConfig::default()
        } else {
            toml::from_str(content).map_err(ConfigError::ParseError)?
        };
        Self::validate_config(&mut config)?;
        Ok(config)
    }

    /// Normalises log level and format, and range-checks sizing values.
    fn validate_config(config: &mut CoreConfig) -> Result<(), CoreError> {
        let level_lower = config.logging.level.to_lowercase();
        match level_lower.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {
                config.logging.level = level_lower;
            }
            _ => {
                return Err(CoreError::Config(ConfigError::ValidationError(format!(
                    "Invalid log level: '{}'. Must be one of trace, debug, info, warn, error.",
                    config.logging.level
                ))));
            }
        }

        let format_lower = config.logging.format.to_lowercase();
        match format_lower.as_str() {
            "text" | "json" => {
                config.logging.format = format_lower;
            }
            _ => {
                return Err(CoreError::Config(ConfigError::ValidationError(format!(
                    "Invalid log format: '{}'. Must be one of text, json.",
                    config.logging.format
                ))));
            }
        }

        let capacity = config.slot_cache.capacity;
        if capacity == 0 || capacity > MAX_SLOT_CAPACITY {
            return Err(CoreError::Config(ConfigError::ValidationError(format!(
                "Invalid slot cache capacity: {}. Must be between 1 and {}.",
                capacity, MAX_SLOT_CAPACITY
            ))));
        }

        if config.pipeline.jank_queue_capacity == 0 {
            return Err(CoreError::Config(ConfigError::ValidationError(
                "jank_queue_capacity must be at least 1.".to_string(),
            )));
        }
        if config.pipeline.frame_event_history == 0 {
            return Err(CoreError::Config(ConfigError::ValidationError(
                "frame_event_history must be at least 1.".to_string(),
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineFlavor;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_empty_input_yields_defaults() {
        let config = ConfigLoader::from_toml_str("").unwrap();
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn test_full_config_is_parsed_and_normalised() {
        let config = ConfigLoader::from_toml_str(
            r#"
            [logging]
            level = "DEBUG"
            format = "Json"

            [slot_cache]
            capacity = 8

            [pipeline]
            flavor = "legacy"
            jank_queue_capacity = 4
            frame_event_history = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.slot_cache.capacity, 8);
        assert_eq!(config.pipeline.flavor, PipelineFlavor::Legacy);
        assert_eq!(config.pipeline.jank_queue_capacity, 4);
        assert_eq!(config.pipeline.frame_event_history, 2);
    }

    #[rstest]
    #[case("[slot_cache]\ncapacity = 0")]
    #[case("[slot_cache]\ncapacity = 65")]
    #[case("[pipeline]\njank_queue_capacity = 0")]
    #[case("[pipeline]\nframe_event_history = 0")]
    #[case("[logging]\nlevel = \"verbose\"")]
    #[case("[logging]\nformat = \"xml\"")]
    fn test_out_of_range_values_are_rejected(#[case] input: &str) {
        let result = ConfigLoader::from_toml_str(input);
        assert!(
            matches!(result, Err(CoreError::Config(ConfigError::ValidationError(_)))),
            "Expected a validation error for {:?}, got {:?}",
            input,
            result
        );
    }

    #[test]
    fn test_unknown_fields_are_parse_errors() {
        let result = ConfigLoader::from_toml_str("[slot_cache]\nslots = 4");
        assert!(matches!(result, Err(CoreError::Config(ConfigError::ParseError(_)))));
    }

    #[test]
    fn test_load_from_path_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[slot_cache]\ncapacity = 3").unwrap();

        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(config.slot_cache.capacity, 3);
    }

    #[test]
    fn test_load_from_missing_path_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigLoader::load_from_path(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn test_load_from_directory_is_read_error() {
        let dir = TempDir::new().unwrap();
        let result = ConfigLoader::load_from_path(dir.path());
        assert!(matches!(result, Err(CoreError::Config(ConfigError::ReadError { .. }))));
    }
}
