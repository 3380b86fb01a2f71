//! The client buffer cache: the registry that issues cache identities.
//!
//! Clients register a buffer once and then refer to it by [`CacheId`] in every
//! later submission. Components that keep per-buffer state (the slot cache)
//! register themselves as [`ErasedRecipient`]s and are told when the buffer is
//! destroyed. The registry is reached through the [`BufferRegistry`] trait so
//! pipelines and tests can substitute their own.

use crate::buffer::{BufferIdentity, CacheId, ClientToken};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Receives notice that a cached buffer was permanently destroyed.
pub trait ErasedRecipient: Send + Sync {
    fn buffer_erased(&self, cache_id: CacheId);
}

/// Registry contract consumed by buffer pipelines.
pub trait BufferRegistry: Send + Sync {
    /// Looks up the identity registered under `cache_id`.
    fn lookup(&self, cache_id: CacheId) -> Option<BufferIdentity>;

    /// Asks to be notified when `cache_id` is erased. Returns false if the id
    /// is unknown, in which case no notification will ever be delivered.
    fn register_erased_recipient(&self, cache_id: CacheId, recipient: Weak<dyn ErasedRecipient>) -> bool;
}

struct CachedBuffer {
    identity: BufferIdentity,
    recipients: Vec<Weak<dyn ErasedRecipient>>,
}

#[derive(Default)]
struct CacheState {
    next_id: u64,
    buffers: HashMap<CacheId, CachedBuffer>,
}

/// In-process implementation of [`BufferRegistry`].
///
/// Cache ids increase monotonically and are never reissued, so an id can never
/// alias a buffer registered later.
#[derive(Default)]
pub struct ClientBufferCache {
    state: Mutex<CacheState>,
}

impl ClientBufferCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for sharing the cache as a trait object.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    // Recipient lists and identities stay consistent across a panicking caller.
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `identity` for `token` and returns its cache identity.
    pub fn add(&self, token: ClientToken, identity: BufferIdentity) -> CacheId {
        let mut state = self.lock();
        state.next_id += 1;
        let cache_id = CacheId::new(token, state.next_id);
        state.buffers.insert(
            cache_id,
            CachedBuffer {
                identity,
                recipients: Vec::new(),
            },
        );
        tracing::trace!(%cache_id, buffer = %identity.id, "Buffer added to client cache");
        cache_id
    }

    /// Destroys the entry for `cache_id` and notifies its recipients.
    ///
    /// Recipients run after the registry lock is released. Returns false if
    /// the id was not cached.
    pub fn erase(&self, cache_id: CacheId) -> bool {
        let removed = self.lock().buffers.remove(&cache_id);
        match removed {
            Some(buffer) => {
                Self::notify(cache_id, buffer.recipients);
                true
            }
            None => false,
        }
    }

    /// Erases every buffer owned by `token`, e.g. when the client disconnects.
    /// Returns how many buffers were erased.
    pub fn remove_client(&self, token: ClientToken) -> usize {
        let removed: Vec<(CacheId, CachedBuffer)> = {
            let mut state = self.lock();
            let ids: Vec<CacheId> = state.buffers.keys().filter(|id| id.token == token).copied().collect();
            ids.into_iter()
                .filter_map(|id| state.buffers.remove(&id).map(|buffer| (id, buffer)))
                .collect()
        };
        let count = removed.len();
        for (cache_id, buffer) in removed {
            Self::notify(cache_id, buffer.recipients);
        }
        tracing::debug!(?token, count, "Client removed from buffer cache");
        count
    }

    fn notify(cache_id: CacheId, recipients: Vec<Weak<dyn ErasedRecipient>>) {
        for recipient in recipients.iter().filter_map(Weak::upgrade) {
            recipient.buffer_erased(cache_id);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, cache_id: CacheId) -> bool {
        self.lock().buffers.contains_key(&cache_id)
    }
}

impl BufferRegistry for ClientBufferCache {
    fn lookup(&self, cache_id: CacheId) -> Option<BufferIdentity> {
        self.lock().buffers.get(&cache_id).map(|buffer| buffer.identity)
    }

    fn register_erased_recipient(&self, cache_id: CacheId, recipient: Weak<dyn ErasedRecipient>) -> bool {
        let mut state = self.lock();
        let Some(buffer) = state.buffers.get_mut(&cache_id) else {
            return false;
        };
        buffer.recipients.retain(|existing| existing.strong_count() > 0);
        if !buffer.recipients.iter().any(|existing| existing.ptr_eq(&recipient)) {
            buffer.recipients.push(recipient);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{BufferFormat, BufferUsage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingRecipient {
        erased: Mutex<Vec<CacheId>>,
        calls: AtomicUsize,
    }

    impl ErasedRecipient for CountingRecipient {
        fn buffer_erased(&self, cache_id: CacheId) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.erased.lock().unwrap().push(cache_id);
        }
    }

    fn identity() -> BufferIdentity {
        BufferIdentity::new(32, 32, BufferFormat::Argb8888, BufferUsage::GPU_TEXTURE)
    }

    #[test]
    fn test_add_and_lookup() {
        let cache = ClientBufferCache::new();
        let buffer = identity();
        let cache_id = cache.add(ClientToken::new(1), buffer);

        assert_eq!(cache.lookup(cache_id), Some(buffer));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_ids_are_never_reused() {
        let cache = ClientBufferCache::new();
        let token = ClientToken::new(1);
        let first = cache.add(token, identity());
        assert!(cache.erase(first));
        let second = cache.add(token, identity());
        assert_ne!(first, second, "An erased cache id must not be reissued.");
    }

    #[test]
    fn test_erase_notifies_each_recipient_once() {
        let cache = ClientBufferCache::new();
        let cache_id = cache.add(ClientToken::new(1), identity());
        let recipient = Arc::new(CountingRecipient::default());
        let weak: Weak<dyn ErasedRecipient> = Arc::downgrade(&recipient) as Weak<dyn ErasedRecipient>;

        assert!(cache.register_erased_recipient(cache_id, weak.clone()));
        assert!(cache.register_erased_recipient(cache_id, weak));
        assert!(cache.erase(cache_id));

        assert_eq!(recipient.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*recipient.erased.lock().unwrap(), vec![cache_id]);
        assert!(!cache.erase(cache_id), "Erasing twice is a no-op.");
    }

    #[test]
    fn test_register_unknown_id_is_rejected() {
        let cache = ClientBufferCache::new();
        let recipient = Arc::new(CountingRecipient::default());
        let weak: Weak<dyn ErasedRecipient> = Arc::downgrade(&recipient) as Weak<dyn ErasedRecipient>;
        assert!(!cache.register_erased_recipient(CacheId::new(ClientToken::new(9), 99), weak));
    }

    #[test]
    fn test_dropped_recipients_are_skipped() {
        let cache = ClientBufferCache::new();
        let cache_id = cache.add(ClientToken::new(1), identity());
        {
            let recipient = Arc::new(CountingRecipient::default());
            let weak: Weak<dyn ErasedRecipient> = Arc::downgrade(&recipient) as Weak<dyn ErasedRecipient>;
            cache.register_erased_recipient(cache_id, weak);
        }
        assert!(cache.erase(cache_id));
    }

    #[test]
    fn test_remove_client_erases_only_its_buffers() {
        let cache = ClientBufferCache::new();
        let a = cache.add(ClientToken::new(1), identity());
        let b = cache.add(ClientToken::new(1), identity());
        let c = cache.add(ClientToken::new(2), identity());
        let recipient = Arc::new(CountingRecipient::default());
        for id in [a, b, c] {
            let weak: Weak<dyn ErasedRecipient> = Arc::downgrade(&recipient) as Weak<dyn ErasedRecipient>;
            cache.register_erased_recipient(id, weak);
        }

        assert_eq!(cache.remove_client(ClientToken::new(1)), 2);
        assert!(cache.contains(c));
        assert!(!cache.contains(a) && !cache.contains(b));
        assert_eq!(recipient.calls.load(Ordering::SeqCst), 2);
    }
}
