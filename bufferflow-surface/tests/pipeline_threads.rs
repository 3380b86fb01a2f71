//! Submitter and compositor threads driving one pipeline.

use bufferflow_buffers::{
    BufferFormat, BufferId, BufferIdentity, BufferUsage, ClientBufferCache, ClientToken, Fence, SlotCache,
};
use bufferflow_surface::{BufferPipeline, BufferSubmission, CompletionListener, PipelineCreationArgs, ReleasedBuffer};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Default)]
struct Released {
    buffers: Mutex<Vec<BufferId>>,
}

impl CompletionListener for Released {
    fn on_buffer_released(&self, released: ReleasedBuffer) {
        assert!(released.release_fence.is_signaled() || released.ready_time.is_none());
        self.buffers.lock().unwrap().push(released.buffer_id);
    }
}

#[test]
fn test_every_latched_buffer_is_released_once() {
    const FRAMES: u64 = 500;

    let registry = ClientBufferCache::shared();
    let slots = Arc::new(SlotCache::new(3));
    let pipeline = Arc::new(Mutex::new(BufferPipeline::new(PipelineCreationArgs::new(
        "Threads#0",
        slots.clone(),
        registry.clone(),
    ))));
    let counter = pipeline.lock().unwrap().pending_counter();
    let listener = Arc::new(Released::default());
    let done = Arc::new(AtomicBool::new(false));

    let submitter = {
        let pipeline = pipeline.clone();
        let listener = listener.clone();
        let registry = registry.clone();
        let done = done.clone();
        thread::spawn(move || {
            for frame in 1..=FRAMES {
                let identity = BufferIdentity::new(16, 16, BufferFormat::Xrgb8888, BufferUsage::COMPOSER_OVERLAY);
                let cache_id = registry.add(ClientToken::new(7), identity);
                let submission =
                    BufferSubmission::new(Some(identity), cache_id, frame).with_listener(listener.clone());
                assert!(pipeline.lock().unwrap().submit(submission));
                if frame % 50 == 0 {
                    // Old buffers go away while the compositor keeps running.
                    registry.remove_client(ClientToken::new(7));
                }
            }
            done.store(true, Ordering::Release);
        })
    };

    let compositor = {
        let pipeline = pipeline.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut latched = Vec::new();
            let mut tick = 0;
            loop {
                let finished = done.load(Ordering::Acquire);
                {
                    let mut pipeline = pipeline.lock().unwrap();
                    tick += 1;
                    if let Ok(outcome) = pipeline.latch(tick, tick) {
                        latched.push(outcome.buffer);
                        pipeline.on_layer_displayed(Fence::signaled());
                    }
                    pipeline.release_pending_buffer(tick);
                    assert!(pipeline.pending_counter().get() <= 1);
                }
                if finished {
                    break;
                }
                thread::yield_now();
            }
            latched
        })
    };

    submitter.join().unwrap();
    let latched = compositor.join().unwrap();
    pipeline.lock().unwrap().teardown();

    let released = listener.buffers.lock().unwrap().clone();
    assert_eq!(released.len(), latched.len(), "Every latched buffer is released exactly once.");
    let unique: HashSet<BufferId> = released.iter().copied().collect();
    assert_eq!(unique.len(), released.len());
    assert_eq!(unique, latched.into_iter().collect::<HashSet<_>>());
    assert_eq!(counter.get(), 0);
    assert!(slots.len() <= 3);
}
