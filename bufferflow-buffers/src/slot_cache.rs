//! Hardware composer slot cache.
//!
//! A hardware composer addresses buffers by a small integer slot instead of the
//! full buffer identity. Re-registering a buffer with the composer is costly,
//! so [`SlotCache`] remembers which slot each cache identity was given and
//! hands out the same slot while the identity stays resident. The table never
//! grows past its capacity; on a miss with no free slot the least recently
//! used entry is evicted.
//!
//! [`SlotTable`] is the unlocked bookkeeping and can be driven directly in
//! tests. [`SlotCache`] wraps it in a single mutex so `get_slot` (latch thread)
//! and `notify_erased` (registry cleanup thread) serialise against each other.

use crate::buffer::CacheId;
use crate::registry::ErasedRecipient;
use bufferflow_core::config::SlotCacheConfig;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// Index of a hardware composer buffer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HwcSlot(u32);

impl HwcSlot {
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for HwcSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedSlot {
    slot: HwcSlot,
    recency: u64,
}

/// Slot assignments for one hardware composer layer.
///
/// Invariants, checked after every mutation: each resident entry owns a
/// distinct slot, `resident + free == capacity`, and the recency clock only
/// moves forward. A violation panics.
#[derive(Debug)]
pub struct SlotTable {
    capacity: u32,
    entries: HashMap<CacheId, CachedSlot>,
    // Stack; the top is handed out next.
    free_slots: Vec<HwcSlot>,
    // Logical clock bumped on every hit or insertion. Each touch gets a fresh
    // value, so the minimum is always unique.
    counter: u64,
}

impl SlotTable {
    /// Creates a table with every slot in `0..capacity` free. Slot 0 is handed
    /// out first.
    ///
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: u32) -> Self {
        assert!(capacity > 0, "A slot table needs at least one slot.");
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity as usize),
            free_slots: (0..capacity).rev().map(HwcSlot).collect(),
            counter: 0,
        }
    }

    /// Returns the slot for `cache_id`, allocating or evicting on a miss.
    pub fn get_slot(&mut self, cache_id: CacheId) -> HwcSlot {
        let tick = self.tick();
        if let Some(entry) = self.entries.get_mut(&cache_id) {
            entry.recency = tick;
            tracing::trace!(%cache_id, slot = entry.slot.index(), "Slot cache hit");
            return entry.slot;
        }

        let slot = match self.free_slots.pop() {
            Some(slot) => slot,
            None => self.evict_least_recently_used(),
        };
        self.entries.insert(cache_id, CachedSlot { slot, recency: tick });
        tracing::trace!(%cache_id, slot = slot.index(), "Slot cache miss");
        self.check_invariants();
        slot
    }

    /// Drops the entry for `cache_id` and frees its slot. No-op if absent.
    pub fn erase(&mut self, cache_id: CacheId) -> Option<HwcSlot> {
        let entry = self.entries.remove(&cache_id)?;
        self.free_slots.push(entry.slot);
        tracing::debug!(%cache_id, slot = entry.slot.index(), "Slot released by erase");
        self.check_invariants();
        Some(entry.slot)
    }

    /// Current slot of `cache_id` without touching its recency.
    pub fn peek(&self, cache_id: CacheId) -> Option<HwcSlot> {
        self.entries.get(&cache_id).map(|entry| entry.slot)
    }

    pub fn contains(&self, cache_id: CacheId) -> bool {
        self.entries.contains_key(&cache_id)
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn free_count(&self) -> usize {
        self.free_slots.len()
    }

    /// Resident identities, most recently used first.
    pub fn resident(&self) -> Vec<CacheId> {
        let mut resident: Vec<(CacheId, u64)> = self.entries.iter().map(|(id, entry)| (*id, entry.recency)).collect();
        resident.sort_by(|a, b| b.1.cmp(&a.1));
        resident.into_iter().map(|(id, _)| id).collect()
    }

    fn tick(&mut self) -> u64 {
        self.counter = self
            .counter
            .checked_add(1)
            .unwrap_or_else(|| panic!("slot cache recency clock overflowed"));
        self.counter
    }

    fn evict_least_recently_used(&mut self) -> HwcSlot {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.recency)
            .map(|(id, entry)| (*id, entry.slot));
        match victim {
            Some((cache_id, slot)) => {
                self.entries.remove(&cache_id);
                tracing::debug!(%cache_id, slot = slot.index(), "Evicted least recently used slot");
                slot
            }
            None => panic!(
                "slot table has no free slot and no resident entry (capacity {})",
                self.capacity
            ),
        }
    }

    fn check_invariants(&self) {
        assert_eq!(
            self.entries.len() + self.free_slots.len(),
            self.capacity as usize,
            "slot table accounting broken: {} resident + {} free != {}",
            self.entries.len(),
            self.free_slots.len(),
            self.capacity
        );
        let mut seen = HashSet::with_capacity(self.capacity as usize);
        for slot in self.entries.values().map(|entry| entry.slot).chain(self.free_slots.iter().copied()) {
            assert!(slot.index() < self.capacity, "{} out of range", slot);
            assert!(seen.insert(slot), "{} assigned twice", slot);
        }
        debug_assert!(self.entries.values().all(|entry| entry.recency <= self.counter));
    }
}

/// Thread-safe slot cache shared by a pipeline and the buffer registry.
#[derive(Debug)]
pub struct SlotCache {
    table: Mutex<SlotTable>,
}

impl SlotCache {
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: u32) -> Self {
        Self::from_table(SlotTable::new(capacity))
    }

    pub fn from_table(table: SlotTable) -> Self {
        Self { table: Mutex::new(table) }
    }

    pub fn from_config(config: &SlotCacheConfig) -> Self {
        Self::new(config.capacity)
    }

    // A poisoned lock means an invariant assertion already fired under it.
    fn lock(&self) -> MutexGuard<'_, SlotTable> {
        match self.table.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("slot cache used after an invariant violation"),
        }
    }

    /// See [`SlotTable::get_slot`].
    pub fn get_slot(&self, cache_id: CacheId) -> HwcSlot {
        self.lock().get_slot(cache_id)
    }

    /// Frees the slot held by `cache_id`, regardless of recency. No-op if the
    /// identity is not resident.
    pub fn notify_erased(&self, cache_id: CacheId) {
        self.lock().erase(cache_id);
    }

    pub fn peek(&self, cache_id: CacheId) -> Option<HwcSlot> {
        self.lock().peek(cache_id)
    }

    pub fn contains(&self, cache_id: CacheId) -> bool {
        self.lock().contains(cache_id)
    }

    pub fn capacity(&self) -> u32 {
        self.lock().capacity()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn free_count(&self) -> usize {
        self.lock().free_count()
    }

    pub fn resident(&self) -> Vec<CacheId> {
        self.lock().resident()
    }
}

impl ErasedRecipient for SlotCache {
    fn buffer_erased(&self, cache_id: CacheId) {
        self.notify_erased(cache_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ClientToken;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn id(n: u64) -> CacheId {
        CacheId::new(ClientToken::new(1), n)
    }

    #[test]
    fn test_first_slots_are_handed_out_in_order() {
        let mut table = SlotTable::new(4);
        assert_eq!(table.get_slot(id(1)), HwcSlot(0));
        assert_eq!(table.get_slot(id(2)), HwcSlot(1));
        assert_eq!(table.free_count(), 2);
    }

    #[test]
    fn test_hit_returns_same_slot() {
        let mut table = SlotTable::new(4);
        let slot = table.get_slot(id(1));
        table.get_slot(id(2));
        assert_eq!(table.get_slot(id(1)), slot);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_lru_evicts_least_recently_touched() {
        let mut table = SlotTable::new(2);
        let a = table.get_slot(id(1));
        let b = table.get_slot(id(2));
        table.get_slot(id(1));
        let c = table.get_slot(id(3));

        assert_eq!(c, b, "C must reuse B's slot.");
        assert!(table.contains(id(1)));
        assert!(!table.contains(id(2)));
        assert_eq!(table.peek(id(1)), Some(a));
    }

    #[rstest]
    #[case(1, 5)]
    #[case(3, 10)]
    #[case(8, 40)]
    fn test_resident_set_is_most_recent_distinct_ids(#[case] capacity: u32, #[case] distinct: u64) {
        let mut table = SlotTable::new(capacity);
        // Revisit earlier ids so recency differs from insertion order.
        let sequence: Vec<u64> = (1..=distinct).flat_map(|n| [n, (n + 1) / 2]).collect();
        for &n in &sequence {
            table.get_slot(id(n));
            assert!(table.len() <= capacity as usize);
        }

        let mut expected = Vec::new();
        for &n in sequence.iter().rev() {
            if !expected.contains(&id(n)) {
                expected.push(id(n));
            }
            if expected.len() == capacity as usize {
                break;
            }
        }
        assert_eq!(table.resident(), expected);
    }

    #[test]
    fn test_erase_of_absent_id_is_noop() {
        let mut table = SlotTable::new(2);
        table.get_slot(id(1));
        assert_eq!(table.erase(id(7)), None);
        assert_eq!(table.len(), 1);
        assert_eq!(table.free_count(), 1);
    }

    #[test]
    fn test_erased_slot_is_reused_before_eviction() {
        let mut table = SlotTable::new(2);
        table.get_slot(id(1));
        let b = table.get_slot(id(2));
        // id(2) is the most recent entry, yet erasing it frees its slot at once.
        assert_eq!(table.erase(id(2)), Some(b));
        assert_eq!(table.get_slot(id(3)), b);
        assert!(table.contains(id(1)), "No eviction should have happened.");
    }

    #[test]
    #[should_panic(expected = "at least one slot")]
    fn test_zero_capacity_panics() {
        let _ = SlotTable::new(0);
    }

    #[test]
    fn test_slot_cache_as_erased_recipient() {
        let cache = SlotCache::new(3);
        let slot = cache.get_slot(id(1));
        cache.buffer_erased(id(1));
        assert!(!cache.contains(id(1)));
        assert_eq!(cache.free_count(), 3);
        assert_eq!(cache.get_slot(id(2)), slot);
    }

    #[test]
    fn test_from_config_uses_capacity() {
        let cache = SlotCache::from_config(&SlotCacheConfig { capacity: 5 });
        assert_eq!(cache.capacity(), 5);
        assert!(cache.is_empty());
    }
}
