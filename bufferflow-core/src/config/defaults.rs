//! Default configuration values for bufferflow.
//!
//! These functions are referenced by `serde`'s `default` attribute in the
//! configuration structures.

use super::types::{LoggingConfig, PipelineConfig, PipelineFlavor, SlotCacheConfig};
use std::path::PathBuf;

/// Number of hardware composer slots when the display HAL does not say otherwise.
pub const DEFAULT_SLOT_CAPACITY: u32 = 64;

/// Upper bound on submitted frames awaiting jank classification.
pub const DEFAULT_JANK_QUEUE_CAPACITY: usize = 25;

/// Number of frames kept in the frame-event history.
pub const DEFAULT_FRAME_EVENT_HISTORY: usize = 8;

pub(super) fn default_logging_config() -> LoggingConfig {
    LoggingConfig {
        level: default_log_level(),
        file_path: default_log_file_path(),
        format: default_log_format(),
    }
}

pub(super) fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_log_file_path() -> Option<PathBuf> {
    None
}

pub(super) fn default_log_format() -> String {
    "text".to_string()
}

pub(super) fn default_slot_cache_config() -> SlotCacheConfig {
    SlotCacheConfig {
        capacity: default_slot_capacity(),
    }
}

pub(super) fn default_slot_capacity() -> u32 {
    DEFAULT_SLOT_CAPACITY
}

pub(super) fn default_pipeline_config() -> PipelineConfig {
    PipelineConfig {
        flavor: default_pipeline_flavor(),
        jank_queue_capacity: default_jank_queue_capacity(),
        frame_event_history: default_frame_event_history(),
    }
}

pub(super) fn default_pipeline_flavor() -> PipelineFlavor {
    PipelineFlavor::BufferState
}

pub(super) fn default_jank_queue_capacity() -> usize {
    DEFAULT_JANK_QUEUE_CAPACITY
}

pub(super) fn default_frame_event_history() -> usize {
    DEFAULT_FRAME_EVENT_HISTORY
}
