//! Buffer identities and the value types that describe them.

use bitflags::bitflags;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Globally unique identifier of a graphics buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl BufferId {
    /// Creates a new, process-wide unique `BufferId`.
    pub fn new_unique() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        BufferId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps a raw id, e.g. one received from another process.
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer#{}", self.0)
    }
}

/// Identifies the client process a cached buffer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientToken(u64);

impl ClientToken {
    pub const fn new(token: u64) -> Self {
        Self(token)
    }
}

/// Cache identity issued by the client buffer cache.
///
/// Pairs the owning client with a 64-bit id. The registry guarantees an id is
/// never reused while a cache entry still refers to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheId {
    pub token: ClientToken,
    pub id: u64,
}

impl CacheId {
    pub const fn new(token: ClientToken, id: u64) -> Self {
        Self { token, id }
    }
}

impl fmt::Display for CacheId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cache#{}:{}", self.token.0, self.id)
    }
}

/// Pixel formats understood by the composition path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferFormat {
    /// 32-bit ARGB, 8 bits per channel, alpha first.
    Argb8888,
    /// 32-bit XRGB, alpha ignored.
    Xrgb8888,
    /// 32-bit RGBA with 10-bit color channels and 2-bit alpha.
    Rgba1010102,
    /// 64-bit half-float RGBA.
    RgbaFp16,
    /// YUV 4:2:0, Y plane followed by interleaved UV.
    Nv12,
}

bitflags! {
    /// How a buffer may be accessed by producers and the composition path.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const CPU_READ = 1 << 0;
        const CPU_WRITE = 1 << 1;
        const GPU_TEXTURE = 1 << 2;
        const GPU_RENDER_TARGET = 1 << 3;
        /// The buffer may be scanned out directly by a hardware overlay.
        const COMPOSER_OVERLAY = 1 << 4;
        const PROTECTED = 1 << 5;
    }
}

/// Immutable description of a graphics buffer.
///
/// The record itself is owned by the client buffer cache; pipelines and the
/// slot cache hold this value (or only its id), never the backing memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferIdentity {
    pub id: BufferId,
    pub width: u32,
    pub height: u32,
    pub format: BufferFormat,
    pub usage: BufferUsage,
}

impl BufferIdentity {
    /// Describes a new buffer and assigns it a unique [`BufferId`].
    pub fn new(width: u32, height: u32, format: BufferFormat, usage: BufferUsage) -> Self {
        debug_assert!(width > 0, "Buffer width must be positive.");
        debug_assert!(height > 0, "Buffer height must be positive.");
        Self {
            id: BufferId::new_unique(),
            width,
            height,
            format,
            usage,
        }
    }

    /// `(width, height)` in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_buffer_ids() {
        let id1 = BufferId::new_unique();
        let id2 = BufferId::new_unique();
        assert_ne!(id1, id2, "BufferId::new_unique should generate unique IDs.");
    }

    #[test]
    fn test_identity_carries_dimensions() {
        let identity = BufferIdentity::new(640, 480, BufferFormat::Argb8888, BufferUsage::GPU_TEXTURE);
        assert_eq!(identity.size(), (640, 480));
        assert!(identity.usage.contains(BufferUsage::GPU_TEXTURE));
        assert!(!identity.usage.contains(BufferUsage::PROTECTED));
    }

    #[test]
    fn test_cache_ids_distinguish_clients() {
        let a = CacheId::new(ClientToken::new(1), 7);
        let b = CacheId::new(ClientToken::new(2), 7);
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "cache#1:7");
    }
}
