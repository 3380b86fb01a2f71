//! Configuration management for bufferflow.
//!
//! - [`types`]: the configuration schema ([`CoreConfig`] and its sections).
//! - [`defaults`]: default values used when a field or section is absent.
//! - [`loader`]: [`ConfigLoader`], which reads TOML and validates it.

pub mod defaults;
pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::{CoreConfig, LoggingConfig, PipelineConfig, PipelineFlavor, SlotCacheConfig};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults as config_defaults;
    use std::path::PathBuf;

    #[test]
    fn test_new_core_config_default() {
        let config = CoreConfig::default();
        assert_eq!(config.logging, LoggingConfig::default());
        assert_eq!(config.slot_cache.capacity, config_defaults::DEFAULT_SLOT_CAPACITY);
        assert_eq!(config.pipeline.jank_queue_capacity, config_defaults::DEFAULT_JANK_QUEUE_CAPACITY);
        assert_eq!(config.pipeline.frame_event_history, config_defaults::DEFAULT_FRAME_EVENT_HISTORY);
        assert_eq!(config.pipeline.flavor, PipelineFlavor::BufferState);
    }

    #[test]
    fn test_core_config_deserialize_minimal() {
        let json_data = r#"{
            "logging": {
                "level": "debug"
            }
        }"#;
        let config: CoreConfig = serde_json::from_str(json_data).expect("Failed to deserialize CoreConfig");

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file_path, None);
        assert_eq!(config.logging.format, "text");
        assert_eq!(config.slot_cache, SlotCacheConfig::default());
    }

    #[test]
    fn test_core_config_deserialize_full_logging() {
        let json_data = r#"{
            "logging": {
                "level": "trace",
                "file_path": "/var/log/bufferflow.log",
                "format": "json"
            },
            "pipeline": { "flavor": "legacy" }
        }"#;
        let config: CoreConfig = serde_json::from_str(json_data).expect("Failed to deserialize CoreConfig");

        assert_eq!(config.logging.file_path, Some(PathBuf::from("/var/log/bufferflow.log")));
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.pipeline.flavor, PipelineFlavor::Legacy);
    }
}
