//! # bufferflow buffers
//!
//! Buffer-side building blocks of the compositor's admission path:
//!
//! - [`buffer`]: identities ([`BufferId`], [`CacheId`]) and buffer descriptions.
//! - [`fence`]: mergeable completion fences.
//! - [`registry`]: the client buffer cache that issues cache identities and
//!   announces when buffers are destroyed.
//! - [`slot_cache`]: the bounded LRU mapping from cache identities to
//!   hardware composer slots.

pub mod buffer;
pub mod fence;
pub mod registry;
pub mod slot_cache;

// Re-export key types for convenience.
pub use buffer::{BufferFormat, BufferId, BufferIdentity, BufferUsage, CacheId, ClientToken};
pub use fence::{Fence, FenceError, FenceSignaler, FenceStatus, Nsecs};
pub use registry::{BufferRegistry, ClientBufferCache, ErasedRecipient};
pub use slot_cache::{HwcSlot, SlotCache, SlotTable};
