//! Bounded per-surface history of frame timestamps.
//!
//! One [`FrameEvent`] is opened when a buffer is queued and filled in as the
//! frame is latched, composited and released. Only the newest entries are
//! kept; every update for a frame that already left the history is ignored.

use bufferflow_buffers::{Fence, Nsecs};
use std::collections::VecDeque;

/// Compositor deadlines reported alongside post-composition events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompositorTiming {
    pub deadline: Nsecs,
    pub interval: Nsecs,
    pub present_latency: Nsecs,
}

#[derive(Debug, Clone)]
pub struct FrameEvent {
    pub frame_number: u64,
    pub post_time: Nsecs,
    pub requested_present_time: Nsecs,
    pub acquire_fence: Fence,
    pub latch_time: Option<Nsecs>,
    pub first_refresh_start: Option<Nsecs>,
    pub last_refresh_start: Option<Nsecs>,
    pub gpu_composition_done: Option<Fence>,
    pub display_present_time: Option<Nsecs>,
    pub compositor_timing: Option<CompositorTiming>,
    pub release_ready_time: Option<Nsecs>,
}

impl FrameEvent {
    fn queued(frame_number: u64, acquire_fence: Fence, post_time: Nsecs, requested_present_time: Nsecs) -> Self {
        Self {
            frame_number,
            post_time,
            requested_present_time,
            acquire_fence,
            latch_time: None,
            first_refresh_start: None,
            last_refresh_start: None,
            gpu_composition_done: None,
            display_present_time: None,
            compositor_timing: None,
            release_ready_time: None,
        }
    }
}

#[derive(Debug)]
pub struct FrameEventHistory {
    capacity: usize,
    events: VecDeque<FrameEvent>,
}

impl FrameEventHistory {
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "A frame event history needs at least one entry.");
        Self {
            capacity,
            events: VecDeque::with_capacity(capacity),
        }
    }

    pub fn add_queue(
        &mut self,
        frame_number: u64,
        acquire_fence: Fence,
        post_time: Nsecs,
        requested_present_time: Nsecs,
    ) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events
            .push_back(FrameEvent::queued(frame_number, acquire_fence, post_time, requested_present_time));
    }

    pub fn add_latch(&mut self, frame_number: u64, latch_time: Nsecs) -> Option<&FrameEvent> {
        let event = self.find_mut(frame_number)?;
        event.latch_time = Some(latch_time);
        Some(event)
    }

    /// Records a refresh that showed `frame_number`. The first call sets the
    /// first refresh start; every call moves the last one.
    pub fn add_pre_composition(&mut self, frame_number: u64, refresh_start: Nsecs) -> Option<&FrameEvent> {
        let event = self.find_mut(frame_number)?;
        event.first_refresh_start.get_or_insert(refresh_start);
        event.last_refresh_start = Some(refresh_start);
        Some(event)
    }

    pub fn add_post_composition(
        &mut self,
        frame_number: u64,
        gpu_composition_done: Option<Fence>,
        compositor_timing: CompositorTiming,
    ) -> Option<&FrameEvent> {
        let event = self.find_mut(frame_number)?;
        // A frame composited by the hardware composer alone keeps no GPU fence.
        if gpu_composition_done.is_some() {
            event.gpu_composition_done = gpu_composition_done;
        }
        event.compositor_timing = Some(compositor_timing);
        Some(event)
    }

    pub fn add_display_present(&mut self, frame_number: u64, present_time: Nsecs) -> Option<&FrameEvent> {
        let event = self.find_mut(frame_number)?;
        event.display_present_time = Some(present_time);
        Some(event)
    }

    pub fn add_release(&mut self, frame_number: u64, ready_time: Nsecs) -> Option<&FrameEvent> {
        let event = self.find_mut(frame_number)?;
        event.release_ready_time = Some(ready_time);
        Some(event)
    }

    pub fn get(&self, frame_number: u64) -> Option<&FrameEvent> {
        self.events.iter().rev().find(|e| e.frame_number == frame_number)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // Newest first: a reused frame number refers to its latest queue.
    fn find_mut(&mut self, frame_number: u64) -> Option<&mut FrameEvent> {
        self.events.iter_mut().rev().find(|e| e.frame_number == frame_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_keeps_newest_entries() {
        let mut history = FrameEventHistory::new(3);
        for n in 1..=5 {
            history.add_queue(n, Fence::signaled(), n as Nsecs * 10, 0);
        }
        let frames: Vec<u64> = history.iter().map(|e| e.frame_number).collect();
        assert_eq!(frames, vec![3, 4, 5]);
        assert!(history.add_latch(1, 100).is_none(), "Evicted frames ignore updates.");
    }

    #[test]
    fn test_event_is_filled_in_over_its_lifetime() {
        let mut history = FrameEventHistory::new(8);
        history.add_queue(1, Fence::signaled(), 10, 20);
        history.add_latch(1, 30);
        history.add_pre_composition(1, 40);
        history.add_pre_composition(1, 56);
        let timing = CompositorTiming {
            deadline: 60,
            interval: 16,
            present_latency: 32,
        };
        history.add_post_composition(1, Some(Fence::signaled()), timing);
        history.add_display_present(1, 72);
        history.add_release(1, 90);

        let event = history.get(1).unwrap();
        assert_eq!(event.latch_time, Some(30));
        assert_eq!(event.first_refresh_start, Some(40));
        assert_eq!(event.last_refresh_start, Some(56));
        assert!(event.gpu_composition_done.as_ref().is_some_and(Fence::is_signaled));
        assert_eq!(event.display_present_time, Some(72));
        assert_eq!(event.compositor_timing, Some(timing));
        assert_eq!(event.release_ready_time, Some(90));
    }

    #[test]
    fn test_post_composition_without_gpu_fence_keeps_existing() {
        let mut history = FrameEventHistory::new(2);
        history.add_queue(4, Fence::signaled(), 0, 0);
        history.add_post_composition(4, Some(Fence::signaled()), CompositorTiming::default());
        history.add_post_composition(4, None, CompositorTiming::default());
        assert!(history.get(4).unwrap().gpu_composition_done.is_some());
    }
}
