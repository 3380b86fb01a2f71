//! Frame instrumentation queue.
//!
//! Every accepted submission leaves a [`SurfaceFrameRecord`] here until the
//! frame timeline classifies it. The queue is a strict FIFO: when a push takes
//! it past capacity the oldest record is evicted unclassified. Losing a record
//! costs diagnostics only, so eviction is traced and nothing else.

use bitflags::bitflags;
use bufferflow_buffers::{BufferId, Nsecs};
use std::collections::VecDeque;

/// Identifiers tying a frame to the vsync prediction and input event behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameTimelineInfo {
    pub vsync_id: i64,
    pub input_event_id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresentState {
    /// Queued, not yet latched or dropped.
    #[default]
    Unknown,
    Presented,
    Dropped,
}

bitflags! {
    /// Why a frame missed its deadline. Empty means on time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct JankType: u32 {
        const DISPLAY_HAL = 0x1;
        const COMPOSITOR_CPU_DEADLINE_MISSED = 0x2;
        const COMPOSITOR_GPU_DEADLINE_MISSED = 0x4;
        const APP_DEADLINE_MISSED = 0x8;
        const PREDICTION_ERROR = 0x10;
        const COMPOSITOR_SCHEDULING = 0x20;
        const BUFFER_STUFFING = 0x40;
        const UNKNOWN = 0x80;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceFrameRecord {
    pub frame_number: u64,
    pub buffer_id: BufferId,
    pub timeline: FrameTimelineInfo,
    pub post_time: Nsecs,
    pub desired_present_time: Nsecs,
    pub dequeue_time: Option<Nsecs>,
    pub latch_time: Option<Nsecs>,
    pub present_state: PresentState,
    /// Set once the record is classified.
    pub jank: Option<JankType>,
}

impl SurfaceFrameRecord {
    pub fn new(frame_number: u64, buffer_id: BufferId, timeline: FrameTimelineInfo, post_time: Nsecs) -> Self {
        Self {
            frame_number,
            buffer_id,
            timeline,
            post_time,
            desired_present_time: post_time,
            dequeue_time: None,
            latch_time: None,
            present_state: PresentState::Unknown,
            jank: None,
        }
    }
}

#[derive(Debug)]
pub struct JankQueue {
    capacity: usize,
    records: VecDeque<SurfaceFrameRecord>,
}

impl JankQueue {
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "A jank queue needs room for at least one record.");
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Appends `record`, returning the record evicted to stay within capacity.
    pub fn push(&mut self, record: SurfaceFrameRecord) -> Option<SurfaceFrameRecord> {
        self.records.push_back(record);
        if self.records.len() <= self.capacity {
            return None;
        }
        let evicted = self.records.pop_front();
        if let Some(evicted) = &evicted {
            tracing::trace!(frame_number = evicted.frame_number, "Jank record evicted unclassified");
        }
        evicted
    }

    /// Marks the oldest unresolved record for `frame_number` as dropped.
    pub fn mark_dropped(&mut self, frame_number: u64) -> bool {
        match self.find_unresolved(frame_number) {
            Some(record) => {
                record.present_state = PresentState::Dropped;
                true
            }
            None => false,
        }
    }

    /// Marks the oldest unresolved record for `frame_number` as presented at
    /// `latch_time`.
    pub fn mark_presented(&mut self, frame_number: u64, latch_time: Nsecs) -> bool {
        match self.find_unresolved(frame_number) {
            Some(record) => {
                record.present_state = PresentState::Presented;
                record.latch_time = Some(latch_time);
                true
            }
            None => false,
        }
    }

    /// Removes the oldest record for `frame_number`.
    pub fn take(&mut self, frame_number: u64) -> Option<SurfaceFrameRecord> {
        let index = self.records.iter().position(|r| r.frame_number == frame_number)?;
        self.records.remove(index)
    }

    pub fn get(&self, frame_number: u64) -> Option<&SurfaceFrameRecord> {
        self.records.iter().find(|r| r.frame_number == frame_number)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SurfaceFrameRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn find_unresolved(&mut self, frame_number: u64) -> Option<&mut SurfaceFrameRecord> {
        self.records
            .iter_mut()
            .find(|r| r.frame_number == frame_number && r.present_state == PresentState::Unknown)
    }
}
