//! # bufferflow core library (`bufferflow-core`)
//!
//! Foundational pieces shared by the buffer and surface crates:
//!
//! - **Error handling**: [`CoreError`] and the specific [`ConfigError`] and
//!   [`LoggingError`].
//! - **Configuration**: TOML loading and validation through [`ConfigLoader`],
//!   covering logging, the hardware slot table and per-surface pipelines.
//! - **Logging**: `tracing` subscriber setup with console and file output.
//!
//! ```rust,ignore
//! use bufferflow_core::config::ConfigLoader;
//! use bufferflow_core::logging::init_logging;
//! use bufferflow_core::error::CoreError;
//!
//! fn main() -> Result<(), CoreError> {
//!     let core_config = ConfigLoader::load()?;
//!     init_logging(&core_config.logging, false)?;
//!     tracing::info!(slots = core_config.slot_cache.capacity, "bufferflow initialized");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;

pub use config::{ConfigLoader, CoreConfig, LoggingConfig, PipelineConfig, PipelineFlavor, SlotCacheConfig};
pub use error::{ConfigError, CoreError, LoggingError};
pub use logging::{init_logging, init_minimal_logging};
