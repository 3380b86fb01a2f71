//! Callbacks from the pipeline to the client and to the timing collector.

use crate::frame_events::FrameEvent;
use crate::jank::SurfaceFrameRecord;
use bufferflow_buffers::{BufferId, CacheId, Fence, Nsecs};

/// What a client learns when the compositor is done with one of its buffers.
#[derive(Debug, Clone)]
pub struct ReleasedBuffer {
    pub buffer_id: BufferId,
    pub cache_id: CacheId,
    /// Frame number under which the buffer was latched.
    pub frame_number: u64,
    /// The client must wait on this before writing to the buffer again.
    pub release_fence: Fence,
    /// When the compositor handed the buffer back. `None` on forced delivery.
    pub ready_time: Option<Nsecs>,
}

/// Receives the release of a previously latched buffer.
///
/// Called exactly once per latched buffer, on the thread that drives the
/// pipeline. Submissions dropped before latch never reach the listener.
pub trait CompletionListener: Send + Sync {
    fn on_buffer_released(&self, released: ReleasedBuffer);
}

/// Collector of frame timing and jank classifications.
///
/// Delivery is best effort: a sink may discard anything it is given.
pub trait TimingSink: Send + Sync {
    fn on_frame_event(&self, surface: &str, event: &FrameEvent) {
        let _ = (surface, event);
    }

    fn on_jank_classified(&self, surface: &str, record: &SurfaceFrameRecord) {
        let _ = (surface, record);
    }
}

/// A sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTimingSink;

impl TimingSink for NullTimingSink {}
