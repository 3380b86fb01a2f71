use std::sync::atomic::{AtomicI32, Ordering};

/// Count of submissions a surface has accepted but not yet latched or dropped.
///
/// Shared through `Arc` with whatever reports transaction backlog. The value is
/// traced under the counter name on every change and can never go negative; an
/// unmatched decrement panics.
#[derive(Debug)]
pub struct PendingBufferCounter {
    name: String,
    value: AtomicI32,
}

impl PendingBufferCounter {
    pub fn new(surface_name: &str) -> Self {
        Self {
            name: format!("BufferTX - {}", surface_name),
            value: AtomicI32::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self) -> i32 {
        self.value.load(Ordering::Acquire)
    }

    pub fn increment(&self) -> i32 {
        let value = self.value.fetch_add(1, Ordering::AcqRel) + 1;
        self.trace(value);
        value
    }

    /// # Panics
    /// If the counter is already zero.
    pub fn decrement(&self) -> i32 {
        let updated = self
            .value
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| if v > 0 { Some(v - 1) } else { None });
        match updated {
            Ok(previous) => {
                self.trace(previous - 1);
                previous - 1
            }
            Err(current) => panic!("{} would go negative (currently {})", self.name, current),
        }
    }

    fn trace(&self, value: i32) {
        tracing::trace!(target: "bufferflow::pending_buffers", counter = %self.name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_name_includes_surface() {
        assert_eq!(PendingBufferCounter::new("StatusBar#0").name(), "BufferTX - StatusBar#0");
    }

    #[test]
    fn test_increment_and_decrement_balance() {
        let counter = PendingBufferCounter::new("s");
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.increment(), 2);
        assert_eq!(counter.decrement(), 1);
        assert_eq!(counter.decrement(), 0);
        assert_eq!(counter.get(), 0);
    }

    #[test]
    #[should_panic(expected = "would go negative")]
    fn test_decrement_below_zero_panics() {
        PendingBufferCounter::new("s").decrement();
    }
}
