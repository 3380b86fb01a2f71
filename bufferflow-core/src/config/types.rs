//! Configuration data structures for bufferflow.
//!
//! - [`CoreConfig`]: the root structure.
//! - [`LoggingConfig`]: logging subsystem settings.
//! - [`SlotCacheConfig`]: hardware slot table sizing.
//! - [`PipelineConfig`]: per-surface pipeline behaviour.
//!
//! Missing fields take their values from [`super::defaults`]; unknown fields
//! are rejected via `#[serde(deny_unknown_fields)]`.

use super::defaults;
use serde::Deserialize;
use std::path::PathBuf;

/// Configuration settings for the logging subsystem.
///
/// ```
/// use bufferflow_core::config::LoggingConfig;
/// use std::path::PathBuf;
///
/// let default_log_config = LoggingConfig::default();
/// assert_eq!(default_log_config.level, "info");
/// assert_eq!(default_log_config.file_path, None);
/// assert_eq!(default_log_config.format, "text");
///
/// let toml_str = r#"
/// level = "debug"
/// file_path = "/var/log/bufferflow.log"
/// format = "json"
/// "#;
/// let log_config: LoggingConfig = toml::from_str(toml_str).unwrap();
/// assert_eq!(log_config.file_path, Some(PathBuf::from("/var/log/bufferflow.log")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// "trace", "debug", "info", "warn" or "error" (case-insensitive).
    #[serde(default = "defaults::default_log_level")]
    pub level: String,
    /// Optional file sink. `None` disables file logging.
    #[serde(default = "defaults::default_log_file_path")]
    pub file_path: Option<PathBuf>,
    /// "text" or "json" (case-insensitive).
    #[serde(default = "defaults::default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        defaults::default_logging_config()
    }
}

/// Sizing of the hardware composer slot table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlotCacheConfig {
    /// Number of slots the hardware composer exposes per surface.
    #[serde(default = "defaults::default_slot_capacity")]
    pub capacity: u32,
}

impl Default for SlotCacheConfig {
    fn default() -> Self {
        defaults::default_slot_cache_config()
    }
}

/// Which family of attribute setters a pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineFlavor {
    /// Buffer-state surfaces: crop, frame, buffer transform, dataspace, HDR
    /// metadata, damage. Legacy size/position/matrix setters are rejected.
    BufferState,
    /// Legacy queue-driven surfaces: only size, position and matrix.
    Legacy,
}

/// Per-surface pipeline behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default = "defaults::default_pipeline_flavor")]
    pub flavor: PipelineFlavor,
    /// Maximum number of submitted frames awaiting jank classification.
    #[serde(default = "defaults::default_jank_queue_capacity")]
    pub jank_queue_capacity: usize,
    /// Number of frames retained in the frame-event history.
    #[serde(default = "defaults::default_frame_event_history")]
    pub frame_event_history: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        defaults::default_pipeline_config()
    }
}

/// Root configuration structure.
///
/// ```
/// use bufferflow_core::config::{CoreConfig, PipelineFlavor};
///
/// let config: CoreConfig = toml::from_str(r#"
/// [slot_cache]
/// capacity = 16
/// "#).unwrap();
/// assert_eq!(config.slot_cache.capacity, 16);
/// assert_eq!(config.pipeline.flavor, PipelineFlavor::BufferState);
/// assert_eq!(config.logging.level, "info");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CoreConfig {
    #[serde(default = "defaults::default_logging_config")]
    pub logging: LoggingConfig,
    #[serde(default = "defaults::default_slot_cache_config")]
    pub slot_cache: SlotCacheConfig,
    #[serde(default = "defaults::default_pipeline_config")]
    pub pipeline: PipelineConfig,
}
