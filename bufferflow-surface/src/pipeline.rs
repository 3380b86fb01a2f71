//! The per-surface buffer pipeline.
//!
//! A surface holds at most one pending submission and one current (latched)
//! buffer. Submitting while a buffer is pending drops the older one at once.
//! Latching promotes the pending submission, gives it a hardware composer slot
//! and moves the old current buffer to "previous", where it waits until its
//! release fence can be handed back to the client.
//!
//! ```text
//!   submit ──▶ pending ──latch──▶ current ──latch──▶ previous ──release──▶ listener
//!                 │
//!                 └─ submit again: dropped, listener never called
//! ```
//!
//! The pipeline takes `&mut self` everywhere; the caller serialises submit and
//! latch. Only the slot cache and the pending counter are shared with other
//! threads.

use crate::error::{LatchError, PipelineError};
use crate::frame_events::{CompositorTiming, FrameEventHistory};
use crate::geometry::{BufferTransform, Dataspace, HdrMetadata, Matrix22, Rect, Region};
use crate::jank::{FrameTimelineInfo, JankQueue, JankType, SurfaceFrameRecord};
use crate::listener::{CompletionListener, NullTimingSink, ReleasedBuffer, TimingSink};
use crate::pending_counter::PendingBufferCounter;
use crate::presentation::{ImmediatePresentation, PresentationPolicy};
use crate::state::{stage, LayerState, PipelineCapabilities, SidebandStream};
use bufferflow_buffers::{
    BufferId, BufferIdentity, BufferRegistry, CacheId, ErasedRecipient, Fence, FenceStatus, HwcSlot, Nsecs, SlotCache,
};
use bufferflow_core::config::defaults::{DEFAULT_FRAME_EVENT_HISTORY, DEFAULT_JANK_QUEUE_CAPACITY};
use bufferflow_core::config::{PipelineConfig, PipelineFlavor};
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};

/// A buffer offered by a client, as passed to [`BufferPipeline::submit`].
pub struct BufferSubmission {
    /// `None` when the client sent no buffer; such submissions are rejected.
    pub identity: Option<BufferIdentity>,
    pub cache_id: CacheId,
    pub frame_number: u64,
    pub acquire_fence: Fence,
    pub post_time: Nsecs,
    pub desired_present_time: Nsecs,
    pub is_auto_timestamp: bool,
    pub dequeue_time: Option<Nsecs>,
    pub timeline_info: FrameTimelineInfo,
    pub listener: Option<Arc<dyn CompletionListener>>,
}

impl BufferSubmission {
    /// An auto-timestamped submission with a signaled acquire fence.
    pub fn new(identity: Option<BufferIdentity>, cache_id: CacheId, frame_number: u64) -> Self {
        Self {
            identity,
            cache_id,
            frame_number,
            acquire_fence: Fence::signaled(),
            post_time: 0,
            desired_present_time: 0,
            is_auto_timestamp: true,
            dequeue_time: None,
            timeline_info: FrameTimelineInfo::default(),
            listener: None,
        }
    }

    pub fn with_acquire_fence(mut self, acquire_fence: Fence) -> Self {
        self.acquire_fence = acquire_fence;
        self
    }

    pub fn with_post_time(mut self, post_time: Nsecs) -> Self {
        self.post_time = post_time;
        self
    }

    /// Asks for presentation at `desired_present_time`, clearing the auto
    /// timestamp.
    pub fn with_desired_present_time(mut self, desired_present_time: Nsecs) -> Self {
        self.desired_present_time = desired_present_time;
        self.is_auto_timestamp = false;
        self
    }

    pub fn with_dequeue_time(mut self, dequeue_time: Nsecs) -> Self {
        self.dequeue_time = Some(dequeue_time);
        self
    }

    pub fn with_timeline_info(mut self, timeline_info: FrameTimelineInfo) -> Self {
        self.timeline_info = timeline_info;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn CompletionListener>) -> Self {
        self.listener = Some(listener);
        self
    }
}

/// The submission waiting for the next latch.
pub struct PendingSubmission {
    pub identity: BufferIdentity,
    pub cache_id: CacheId,
    pub frame_number: u64,
    pub acquire_fence: Fence,
    pub post_time: Nsecs,
    pub desired_present_time: Nsecs,
    pub is_auto_timestamp: bool,
    pub dequeue_time: Option<Nsecs>,
    pub timeline_info: FrameTimelineInfo,
    listener: Option<Arc<dyn CompletionListener>>,
}

/// The most recently latched buffer.
pub struct CurrentBuffer {
    pub identity: BufferIdentity,
    pub cache_id: CacheId,
    pub slot: HwcSlot,
    pub frame_number: u64,
    pub acquire_fence: Fence,
    pub latch_time: Nsecs,
    release_fence: Option<Fence>,
    listener: Option<Arc<dyn CompletionListener>>,
    crop: Rect,
    transform: BufferTransform,
}

impl CurrentBuffer {
    pub fn release_fence(&self) -> Option<&Fence> {
        self.release_fence.as_ref()
    }
}

/// A buffer replaced by a later latch whose release is still owed.
pub struct PreviousBuffer {
    pub identity: BufferIdentity,
    pub cache_id: CacheId,
    pub released_frame_number: u64,
    release_fence: Option<Fence>,
    listener: Option<Arc<dyn CompletionListener>>,
}

impl PreviousBuffer {
    pub fn release_fence(&self) -> Option<&Fence> {
        self.release_fence.as_ref()
    }

    fn deliver(self, ready_time: Option<Nsecs>) {
        let Some(listener) = self.listener else {
            trace!(buffer = %self.identity.id, "Released buffer has no listener");
            return;
        };
        listener.on_buffer_released(ReleasedBuffer {
            buffer_id: self.identity.id,
            cache_id: self.cache_id,
            frame_number: self.released_frame_number,
            release_fence: self.release_fence.unwrap_or_else(Fence::signaled),
            ready_time,
        });
    }
}

impl From<CurrentBuffer> for PreviousBuffer {
    fn from(current: CurrentBuffer) -> Self {
        Self {
            identity: current.identity,
            cache_id: current.cache_id,
            released_frame_number: current.frame_number,
            release_fence: current.release_fence,
            listener: current.listener,
        }
    }
}

/// Result of a successful latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatchOutcome {
    pub buffer: BufferId,
    pub slot: HwcSlot,
    pub frame_number: u64,
    /// Crop, transform or buffer size changed, or this is the first buffer.
    pub recompute_visible_regions: bool,
}

/// Everything a [`BufferPipeline`] is built from.
pub struct PipelineCreationArgs {
    pub name: String,
    pub flavor: PipelineFlavor,
    pub slot_cache: Arc<SlotCache>,
    pub registry: Arc<dyn BufferRegistry>,
    pub presentation_policy: Arc<dyn PresentationPolicy>,
    pub timing_sink: Arc<dyn TimingSink>,
    pub jank_queue_capacity: usize,
    pub frame_event_history: usize,
}

impl PipelineCreationArgs {
    pub fn new(name: impl Into<String>, slot_cache: Arc<SlotCache>, registry: Arc<dyn BufferRegistry>) -> Self {
        Self {
            name: name.into(),
            flavor: PipelineFlavor::BufferState,
            slot_cache,
            registry,
            presentation_policy: Arc::new(ImmediatePresentation),
            timing_sink: Arc::new(NullTimingSink),
            jank_queue_capacity: DEFAULT_JANK_QUEUE_CAPACITY,
            frame_event_history: DEFAULT_FRAME_EVENT_HISTORY,
        }
    }

    pub fn from_config(
        name: impl Into<String>,
        config: &PipelineConfig,
        slot_cache: Arc<SlotCache>,
        registry: Arc<dyn BufferRegistry>,
    ) -> Self {
        Self {
            flavor: config.flavor,
            jank_queue_capacity: config.jank_queue_capacity,
            frame_event_history: config.frame_event_history,
            ..Self::new(name, slot_cache, registry)
        }
    }

    pub fn with_flavor(mut self, flavor: PipelineFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    pub fn with_presentation_policy(mut self, policy: Arc<dyn PresentationPolicy>) -> Self {
        self.presentation_policy = policy;
        self
    }

    pub fn with_timing_sink(mut self, sink: Arc<dyn TimingSink>) -> Self {
        self.timing_sink = sink;
        self
    }
}

pub struct BufferPipeline {
    name: String,
    flavor: PipelineFlavor,
    capabilities: PipelineCapabilities,
    slot_cache: Arc<SlotCache>,
    registry: Arc<dyn BufferRegistry>,
    policy: Arc<dyn PresentationPolicy>,
    timing_sink: Arc<dyn TimingSink>,
    pending_counter: Arc<PendingBufferCounter>,
    pending: Option<PendingSubmission>,
    current: Option<CurrentBuffer>,
    previous: Option<PreviousBuffer>,
    staged: LayerState,
    drawing: LayerState,
    // Frame number of the current buffer.
    frame_number: u64,
    auto_refresh: bool,
    sideband_stream_changed: bool,
    jank_queue: JankQueue,
    frame_events: FrameEventHistory,
}

impl BufferPipeline {
    /// # Panics
    /// If the jank queue or frame event history capacity is zero.
    pub fn new(args: PipelineCreationArgs) -> Self {
        let pending_counter = Arc::new(PendingBufferCounter::new(&args.name));
        debug!(surface = %args.name, flavor = ?args.flavor, "Creating buffer pipeline");
        Self {
            capabilities: PipelineCapabilities::for_flavor(args.flavor),
            flavor: args.flavor,
            name: args.name,
            slot_cache: args.slot_cache,
            registry: args.registry,
            policy: args.presentation_policy,
            timing_sink: args.timing_sink,
            pending_counter,
            pending: None,
            current: None,
            previous: None,
            staged: LayerState::default(),
            drawing: LayerState::default(),
            frame_number: 0,
            auto_refresh: false,
            sideband_stream_changed: false,
            jank_queue: JankQueue::new(args.jank_queue_capacity),
            frame_events: FrameEventHistory::new(args.frame_event_history),
        }
    }

    /// Accepts a new buffer for the next latch.
    ///
    /// Returns false, changing nothing, when the submission carries no buffer.
    /// A submission already pending is dropped: its counter credit is returned
    /// without waiting on its fence and its listener is never called.
    pub fn submit(&mut self, submission: BufferSubmission) -> bool {
        let Some(identity) = submission.identity else {
            warn!(surface = %self.name, frame_number = submission.frame_number, "Rejected submission without a buffer");
            return false;
        };

        if let Some(dropped) = self.pending.take() {
            self.drop_pending(dropped);
        }

        let recipient = Arc::downgrade(&self.slot_cache) as Weak<dyn ErasedRecipient>;
        if !self.registry.register_erased_recipient(submission.cache_id, recipient) {
            debug!(
                surface = %self.name,
                cache_id = %submission.cache_id,
                "Cache id unknown to the registry; its slot is reclaimed only by eviction"
            );
        }

        self.pending_counter.increment();

        let mut record = SurfaceFrameRecord::new(
            submission.frame_number,
            identity.id,
            submission.timeline_info,
            submission.post_time,
        );
        record.desired_present_time = submission.desired_present_time;
        record.dequeue_time = submission.dequeue_time;
        self.jank_queue.push(record);

        let acquire_fence = submission.acquire_fence.clone();
        self.pending = Some(PendingSubmission {
            identity,
            cache_id: submission.cache_id,
            frame_number: submission.frame_number,
            acquire_fence: submission.acquire_fence,
            post_time: submission.post_time,
            desired_present_time: submission.desired_present_time,
            is_auto_timestamp: submission.is_auto_timestamp,
            dequeue_time: submission.dequeue_time,
            timeline_info: submission.timeline_info,
            listener: submission.listener,
        });
        self.add_frame_event(&acquire_fence, submission.post_time, submission.desired_present_time);

        trace!(surface = %self.name, buffer = %identity.id, frame_number = submission.frame_number, "Buffer submitted");
        true
    }

    fn drop_pending(&mut self, dropped: PendingSubmission) {
        self.pending_counter.decrement();
        self.jank_queue.mark_dropped(dropped.frame_number);
        debug!(
            surface = %self.name,
            buffer = %dropped.identity.id,
            frame_number = dropped.frame_number,
            "Dropped pending buffer replaced before latch"
        );
    }

    pub fn has_frame_update(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_buffer_due(&self, expected_present_time: Nsecs) -> bool {
        self.pending.as_ref().is_some_and(|pending| {
            self.policy
                .is_buffer_due(pending.desired_present_time, pending.is_auto_timestamp, expected_present_time)
        })
    }

    /// Promotes the pending submission to current.
    ///
    /// On error nothing changes. A failed acquire fence leaves the submission
    /// pending until the client replaces it.
    ///
    /// # Panics
    /// If the pending frame number is lower than the current one.
    pub fn latch(&mut self, latch_time: Nsecs, expected_present_time: Nsecs) -> Result<LatchOutcome, LatchError> {
        let buffer = match &self.pending {
            Some(pending) => pending.identity.id,
            None => return Err(LatchError::NoPendingBuffer),
        };
        if !self.is_buffer_due(expected_present_time) {
            return Err(LatchError::NotDue { expected_present_time });
        }
        if self.pending.as_ref().is_some_and(|p| p.acquire_fence.has_error()) {
            warn!(surface = %self.name, %buffer, "Not latching buffer whose acquire fence errored");
            return Err(LatchError::AcquireFenceError { buffer });
        }
        let Some(pending) = self.pending.take() else {
            return Err(LatchError::NoPendingBuffer);
        };

        let slot = self.slot_cache.get_slot(pending.cache_id);

        let prior_geometry = self
            .current
            .as_ref()
            .map(|current| (current.identity.size(), current.crop, current.transform));
        if let Some(current) = self.current.take() {
            if let Some(stale) = self.previous.take() {
                debug!(
                    surface = %self.name,
                    buffer = %stale.identity.id,
                    "Forcing release of a previous buffer superseded before delivery"
                );
                stale.deliver(None);
            }
            self.previous = Some(current.into());
        }

        assert!(
            pending.frame_number >= self.frame_number,
            "{}: frame number went backwards ({} after {})",
            self.name,
            pending.frame_number,
            self.frame_number
        );
        self.frame_number = pending.frame_number;

        self.pending_counter.decrement();

        self.apply_pending_state();
        let (width, height) = pending.identity.size();
        let crop = self.drawing.effective_crop(width, height);
        let transform = self.drawing.transform;
        let recompute_visible_regions = prior_geometry.map_or(true, |(size, prior_crop, prior_transform)| {
            size != (width, height) || prior_crop != crop || prior_transform != transform
        });

        self.jank_queue.mark_presented(pending.frame_number, latch_time);

        self.current = Some(CurrentBuffer {
            identity: pending.identity,
            cache_id: pending.cache_id,
            slot,
            frame_number: pending.frame_number,
            acquire_fence: pending.acquire_fence,
            latch_time,
            release_fence: None,
            listener: pending.listener,
            crop,
            transform,
        });
        self.update_frame_event_history(latch_time);

        trace!(surface = %self.name, %buffer, slot = slot.index(), frame_number = self.frame_number, "Latched buffer");
        Ok(LatchOutcome {
            buffer,
            slot,
            frame_number: self.frame_number,
            recompute_visible_regions,
        })
    }

    /// Merges `release_fence` into whatever the current or previous buffer
    /// `buffer_id` already holds.
    ///
    /// A buffer latched twice in a row is both current and previous; the fence
    /// then goes to current. Use [`Self::add_release_fence_for_frame`] to reach
    /// the earlier frame.
    pub fn add_release_fence(&mut self, buffer_id: BufferId, release_fence: Fence) -> Result<(), PipelineError> {
        self.merge_release_fence_where(buffer_id, release_fence, |_| true)
    }

    /// Like [`Self::add_release_fence`], but only for the buffer latched as
    /// `frame_number`.
    pub fn add_release_fence_for_frame(
        &mut self,
        buffer_id: BufferId,
        frame_number: u64,
        release_fence: Fence,
    ) -> Result<(), PipelineError> {
        self.merge_release_fence_where(buffer_id, release_fence, |frame| frame == frame_number)
    }

    fn merge_release_fence_where(
        &mut self,
        buffer_id: BufferId,
        release_fence: Fence,
        frame_matches: impl Fn(u64) -> bool,
    ) -> Result<(), PipelineError> {
        let target = if let Some(current) = self
            .current
            .as_mut()
            .filter(|c| c.identity.id == buffer_id && frame_matches(c.frame_number))
        {
            &mut current.release_fence
        } else if let Some(previous) = self
            .previous
            .as_mut()
            .filter(|p| p.identity.id == buffer_id && frame_matches(p.released_frame_number))
        {
            &mut previous.release_fence
        } else {
            warn!(surface = %self.name, buffer = %buffer_id, "Release fence for a buffer this surface does not hold");
            return Err(PipelineError::UnknownBuffer(buffer_id));
        };
        merge_release_fence(target, release_fence);
        Ok(())
    }

    /// Release fence from the display path for the buffer just shown.
    pub fn on_layer_displayed(&mut self, release_fence: Fence) {
        match self.current.as_mut() {
            Some(current) => merge_release_fence(&mut current.release_fence, release_fence),
            None => trace!(surface = %self.name, "Layer displayed without a current buffer"),
        }
    }

    /// Hands the previous buffer back to its client once its release fence has
    /// resolved. A buffer without a release fence is ready immediately.
    ///
    /// Returns true if a buffer was released.
    pub fn release_pending_buffer(&mut self, ready_time: Nsecs) -> bool {
        let ready = match &self.previous {
            Some(previous) => previous
                .release_fence
                .as_ref()
                .map_or(true, |fence| fence.status() != FenceStatus::Pending),
            None => return false,
        };
        if !ready {
            trace!(surface = %self.name, "Previous buffer release fence still pending");
            return false;
        }
        let Some(previous) = self.previous.take() else {
            return false;
        };
        if let Some(event) = self.frame_events.add_release(previous.released_frame_number, ready_time) {
            self.timing_sink.on_frame_event(&self.name, event);
        }
        previous.deliver(Some(ready_time));
        true
    }

    /// Releases everything regardless of fence state. Called when the surface
    /// goes away; running it again does nothing.
    pub fn teardown(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.drop_pending(pending);
        }
        if let Some(previous) = self.previous.take() {
            previous.deliver(None);
        }
        if let Some(current) = self.current.take() {
            PreviousBuffer::from(current).deliver(None);
        }
    }

    /// Commits staged attributes. Returns true if anything changed.
    pub fn apply_pending_state(&mut self) -> bool {
        self.sideband_stream_changed = false;
        if self.staged == self.drawing {
            return false;
        }
        self.drawing = self.staged.clone();
        true
    }

    /// Frame number the next composition shows.
    pub fn head_frame_number(&self, expected_present_time: Nsecs) -> u64 {
        match &self.pending {
            Some(pending) if self.is_buffer_due(expected_present_time) => pending.frame_number,
            _ => self.frame_number,
        }
    }

    /// True when there is no pending buffer or its acquire fence has signaled.
    pub fn fence_has_signaled(&self) -> bool {
        self.pending.as_ref().map_or(true, |pending| pending.acquire_fence.is_signaled())
    }

    pub fn frame_present_time_is_current(&self, expected_present_time: Nsecs) -> bool {
        match &self.pending {
            Some(pending) if !pending.is_auto_timestamp => pending.desired_present_time <= expected_present_time,
            _ => true,
        }
    }

    /// Records the refresh start for the frame on screen and reports whether
    /// the surface wants another composition.
    pub fn on_pre_composition(&mut self, refresh_start_time: Nsecs) -> bool {
        if self.current.is_some() {
            if let Some(event) = self.frame_events.add_pre_composition(self.frame_number, refresh_start_time) {
                self.timing_sink.on_frame_event(&self.name, event);
            }
        }
        self.has_frame_update() || self.sideband_stream_changed || self.auto_refresh
    }

    pub fn set_auto_refresh(&mut self, auto_refresh: bool) {
        self.auto_refresh = auto_refresh;
    }

    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh
    }

    /// Opens a frame event for the pending submission. Returns false if
    /// nothing is pending.
    pub fn add_frame_event(
        &mut self,
        acquire_fence: &Fence,
        posted_time: Nsecs,
        requested_present_time: Nsecs,
    ) -> bool {
        let Some(frame_number) = self.pending.as_ref().map(|p| p.frame_number) else {
            return false;
        };
        self.frame_events
            .add_queue(frame_number, acquire_fence.clone(), posted_time, requested_present_time);
        true
    }

    /// Stamps the current frame's event with its latch time.
    pub fn update_frame_event_history(&mut self, latch_time: Nsecs) -> bool {
        if self.current.is_none() {
            return false;
        }
        match self.frame_events.add_latch(self.frame_number, latch_time) {
            Some(event) => {
                self.timing_sink.on_frame_event(&self.name, event);
                true
            }
            None => false,
        }
    }

    /// Closes the current frame's event after composition.
    pub fn finalize_frame_event_history(
        &mut self,
        gpu_composition_done: Option<Fence>,
        compositor_timing: CompositorTiming,
    ) -> bool {
        if self.current.is_none() {
            return false;
        }
        match self
            .frame_events
            .add_post_composition(self.frame_number, gpu_composition_done, compositor_timing)
        {
            Some(event) => {
                self.timing_sink.on_frame_event(&self.name, event);
                true
            }
            None => false,
        }
    }

    pub fn record_display_present(&mut self, present_time: Nsecs) -> bool {
        if self.current.is_none() {
            return false;
        }
        match self.frame_events.add_display_present(self.frame_number, present_time) {
            Some(event) => {
                self.timing_sink.on_frame_event(&self.name, event);
                true
            }
            None => false,
        }
    }

    /// Classifies the queued record for `frame_number` and forwards it to the
    /// timing sink.
    pub fn classify_jank(&mut self, frame_number: u64, jank: JankType) -> Result<SurfaceFrameRecord, PipelineError> {
        let mut record = self
            .jank_queue
            .take(frame_number)
            .ok_or(PipelineError::MissingSurfaceFrame { frame_number })?;
        record.jank = Some(jank);
        self.timing_sink.on_jank_classified(&self.name, &record);
        Ok(record)
    }

    fn accepts(&self, capability: PipelineCapabilities, attribute: &'static str) -> bool {
        if self.capabilities.contains(capability) {
            return true;
        }
        warn!(surface = %self.name, flavor = ?self.flavor, attribute, "Setter not supported by this pipeline");
        false
    }

    pub fn set_crop(&mut self, crop: Rect) -> bool {
        self.accepts(PipelineCapabilities::BUFFER_GEOMETRY, "crop")
            && stage(&self.drawing.crop, &mut self.staged.crop, crop)
    }

    pub fn set_frame(&mut self, frame: Rect) -> bool {
        self.accepts(PipelineCapabilities::BUFFER_GEOMETRY, "frame")
            && stage(&self.drawing.frame, &mut self.staged.frame, frame)
    }

    pub fn set_transform(&mut self, transform: BufferTransform) -> bool {
        self.accepts(PipelineCapabilities::BUFFER_GEOMETRY, "transform")
            && stage(&self.drawing.transform, &mut self.staged.transform, transform)
    }

    pub fn set_transform_to_display_inverse(&mut self, inverse: bool) -> bool {
        self.accepts(PipelineCapabilities::BUFFER_GEOMETRY, "transform_to_display_inverse")
            && stage(
                &self.drawing.transform_to_display_inverse,
                &mut self.staged.transform_to_display_inverse,
                inverse,
            )
    }

    pub fn set_dataspace(&mut self, dataspace: Dataspace) -> bool {
        self.accepts(PipelineCapabilities::BUFFER_METADATA, "dataspace")
            && stage(&self.drawing.dataspace, &mut self.staged.dataspace, dataspace)
    }

    pub fn set_hdr_metadata(&mut self, hdr_metadata: HdrMetadata) -> bool {
        self.accepts(PipelineCapabilities::BUFFER_METADATA, "hdr_metadata")
            && stage(&self.drawing.hdr_metadata, &mut self.staged.hdr_metadata, hdr_metadata)
    }

    pub fn set_transparent_region_hint(&mut self, region: Region) -> bool {
        self.accepts(PipelineCapabilities::BUFFER_METADATA, "transparent_region_hint")
            && stage(
                &self.drawing.transparent_region_hint,
                &mut self.staged.transparent_region_hint,
                region,
            )
    }

    pub fn set_surface_damage_region(&mut self, damage: Region) -> bool {
        self.accepts(PipelineCapabilities::BUFFER_METADATA, "surface_damage")
            && stage(&self.drawing.surface_damage, &mut self.staged.surface_damage, damage)
    }

    pub fn set_api(&mut self, api: i32) -> bool {
        self.accepts(PipelineCapabilities::BUFFER_METADATA, "api")
            && stage(&self.drawing.api, &mut self.staged.api, api)
    }

    pub fn set_sideband_stream(&mut self, stream: Option<SidebandStream>) -> bool {
        if !self.accepts(PipelineCapabilities::BUFFER_METADATA, "sideband_stream") {
            return false;
        }
        let changed = stage(&self.drawing.sideband_stream, &mut self.staged.sideband_stream, stream);
        if changed {
            self.sideband_stream_changed = true;
        }
        changed
    }

    /// Replaces the acquire fence of the pending submission. Returns false if
    /// nothing is pending or the fence tracks the same completions.
    pub fn set_acquire_fence(&mut self, acquire_fence: Fence) -> bool {
        if !self.accepts(PipelineCapabilities::BUFFER_METADATA, "acquire_fence") {
            return false;
        }
        let Some(pending) = self.pending.as_mut() else {
            trace!(surface = %self.name, "Acquire fence set without a pending buffer");
            return false;
        };
        let changed = !pending.acquire_fence.same_completions(&acquire_fence);
        pending.acquire_fence = acquire_fence;
        changed
    }

    pub fn set_size(&mut self, width: u32, height: u32) -> bool {
        self.accepts(PipelineCapabilities::LEGACY_GEOMETRY, "size")
            && stage(&self.drawing.size, &mut self.staged.size, (width, height))
    }

    pub fn set_position(&mut self, x: f32, y: f32) -> bool {
        self.accepts(PipelineCapabilities::LEGACY_GEOMETRY, "position")
            && stage(&self.drawing.position, &mut self.staged.position, (x, y))
    }

    pub fn set_matrix(&mut self, matrix: Matrix22) -> bool {
        self.accepts(PipelineCapabilities::LEGACY_GEOMETRY, "matrix")
            && stage(&self.drawing.matrix, &mut self.staged.matrix, matrix)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flavor(&self) -> PipelineFlavor {
        self.flavor
    }

    pub fn capabilities(&self) -> PipelineCapabilities {
        self.capabilities
    }

    pub fn pending_counter(&self) -> Arc<PendingBufferCounter> {
        Arc::clone(&self.pending_counter)
    }

    pub fn pending(&self) -> Option<&PendingSubmission> {
        self.pending.as_ref()
    }

    pub fn current(&self) -> Option<&CurrentBuffer> {
        self.current.as_ref()
    }

    pub fn previous(&self) -> Option<&PreviousBuffer> {
        self.previous.as_ref()
    }

    /// Slot the hardware composer reads the current buffer from.
    pub fn current_slot(&self) -> Option<HwcSlot> {
        self.current.as_ref().map(|current| current.slot)
    }

    pub fn committed_state(&self) -> &LayerState {
        &self.drawing
    }

    pub fn staged_state(&self) -> &LayerState {
        &self.staged
    }

    pub fn jank_queue(&self) -> &JankQueue {
        &self.jank_queue
    }

    pub fn frame_event_history(&self) -> &FrameEventHistory {
        &self.frame_events
    }

    pub fn slot_cache(&self) -> &Arc<SlotCache> {
        &self.slot_cache
    }
}

impl Drop for BufferPipeline {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn merge_release_fence(target: &mut Option<Fence>, release_fence: Fence) {
    *target = Some(match target.take() {
        Some(existing) => existing.merged_with(&release_fence),
        None => release_fence,
    });
}
