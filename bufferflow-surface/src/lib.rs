//! # bufferflow surface
//!
//! The per-surface half of buffer admission. A [`BufferPipeline`] accepts
//! client submissions, latches them on the composition tick, assigns hardware
//! composer slots through a shared [`SlotCache`](bufferflow_buffers::SlotCache)
//! and hands released buffers back to their [`CompletionListener`].
//!
//! Around it sit the passive observers: the [`JankQueue`] of frames awaiting
//! classification, the [`FrameEventHistory`] and the [`TimingSink`] both feed.
//!
//! ```rust,ignore
//! use bufferflow_buffers::{ClientBufferCache, SlotCache};
//! use bufferflow_core::config::ConfigLoader;
//! use bufferflow_surface::{BufferPipeline, PipelineCreationArgs};
//! use std::sync::Arc;
//!
//! let config = ConfigLoader::load()?;
//! let registry = ClientBufferCache::shared();
//! let slots = Arc::new(SlotCache::from_config(&config.slot_cache));
//! let mut pipeline = BufferPipeline::new(PipelineCreationArgs::from_config(
//!     "StatusBar#0",
//!     &config.pipeline,
//!     slots,
//!     registry,
//! ));
//! ```

pub mod error;
pub mod frame_events;
pub mod geometry;
pub mod jank;
pub mod listener;
pub mod pending_counter;
pub mod pipeline;
pub mod presentation;
pub mod state;

pub use error::{LatchError, PipelineError};
pub use frame_events::{CompositorTiming, FrameEvent, FrameEventHistory};
pub use geometry::{BufferTransform, Dataspace, HdrMetadata, Matrix22, Rect, Region};
pub use jank::{FrameTimelineInfo, JankQueue, JankType, PresentState, SurfaceFrameRecord};
pub use listener::{CompletionListener, NullTimingSink, ReleasedBuffer, TimingSink};
pub use pending_counter::PendingBufferCounter;
pub use pipeline::{
    BufferPipeline, BufferSubmission, CurrentBuffer, LatchOutcome, PendingSubmission, PipelineCreationArgs,
    PreviousBuffer,
};
pub use presentation::{DesiredPresentTimePolicy, ImmediatePresentation, PresentationPolicy};
pub use state::{LayerState, PipelineCapabilities, SidebandStream};
