//! Value types for the attributes a surface stages between latches.
//!
//! These are plain data; projection and clipping math belongs to the display
//! geometry layer.

use bitflags::bitflags;

/// Axis-aligned rectangle in buffer or layer-stack coordinates.
///
/// An empty rectangle means "unset" for crop and frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const EMPTY: Rect = Rect::new(0, 0, 0, 0);

    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle at the origin covering a `width` x `height` buffer.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(
            0,
            0,
            i32::try_from(width).unwrap_or(i32::MAX),
            i32::try_from(height).unwrap_or(i32::MAX),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    // Edges are computed in i64 so client-supplied extents cannot overflow.
    fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    fn from_edges(x1: i32, y1: i32, x2: i64, y2: i64) -> Self {
        let clamp = |extent: i64| i32::try_from(extent).unwrap_or(i32::MAX);
        Self::new(x1, y1, clamp(x2 - i64::from(x1)), clamp(y2 - i64::from(y1)))
    }

    pub fn intersects(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        i64::from(self.x) < other.right()
            && self.right() > i64::from(other.x)
            && i64::from(self.y) < other.bottom()
            && self.bottom() > i64::from(other.y)
    }

    /// Overlap of both rectangles; extents that do not fit in `i32` saturate.
    pub fn intersection(&self, other: &Self) -> Self {
        if !self.intersects(other) {
            return Self::EMPTY;
        }
        Self::from_edges(
            self.x.max(other.x),
            self.y.max(other.y),
            self.right().min(other.right()),
            self.bottom().min(other.bottom()),
        )
    }

    /// Bounding box of both rectangles; extents that do not fit in `i32`
    /// saturate.
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self::from_edges(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }
}

/// A set of rectangles, used for damage and transparency hints.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rect(rect: Rect) -> Self {
        let mut region = Self::new();
        region.add(rect);
        region
    }

    /// Adds `rect`; empty rectangles are ignored.
    pub fn add(&mut self, rect: Rect) {
        if !rect.is_empty() {
            self.rects.push(rect);
        }
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn bounds(&self) -> Rect {
        self.rects.iter().fold(Rect::EMPTY, |acc, r| acc.union(r))
    }
}

bitflags! {
    /// Buffer transform, using the hardware composer's encoding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferTransform: u32 {
        const FLIP_H = 0x01;
        const FLIP_V = 0x02;
        const ROT_90 = 0x04;
        const ROT_180 = Self::FLIP_H.bits() | Self::FLIP_V.bits();
        const ROT_270 = Self::ROT_180.bits() | Self::ROT_90.bits();
    }
}

impl BufferTransform {
    /// True when the transform swaps width and height.
    pub fn swaps_dimensions(self) -> bool {
        self.contains(Self::ROT_90)
    }
}

/// Color space of buffer contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dataspace {
    #[default]
    Unknown,
    Srgb,
    SrgbLinear,
    DisplayP3,
    Bt2020Pq,
    Bt2020Hlg,
}

/// SMPTE ST 2086 mastering display color volume.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Smpte2086 {
    pub display_primary_red: (f32, f32),
    pub display_primary_green: (f32, f32),
    pub display_primary_blue: (f32, f32),
    pub white_point: (f32, f32),
    pub max_luminance: f32,
    pub min_luminance: f32,
}

/// CTA-861.3 content light levels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cta8613 {
    pub max_content_light_level: f32,
    pub max_frame_average_light_level: f32,
}

/// Static and dynamic HDR metadata attached to a surface.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HdrMetadata {
    pub smpte2086: Option<Smpte2086>,
    pub cta8613: Option<Cta8613>,
    pub hdr10_plus: Vec<u8>,
}

/// 2x2 layer matrix used by legacy surfaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix22 {
    pub dsdx: f32,
    pub dtdx: f32,
    pub dtdy: f32,
    pub dsdy: f32,
}

impl Default for Matrix22 {
    fn default() -> Self {
        Self {
            dsdx: 1.0,
            dtdx: 0.0,
            dtdy: 0.0,
            dsdy: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_intersection_and_union() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(50, 50, 100, 100);
        assert_eq!(a.intersection(&b), Rect::new(50, 50, 50, 50));
        assert_eq!(a.union(&b), Rect::new(0, 0, 150, 150));
        assert_eq!(a.intersection(&Rect::new(200, 200, 5, 5)), Rect::EMPTY);
    }

    #[test]
    fn test_extreme_extents_do_not_overflow() {
        let wide = Rect::new(10, 0, i32::MAX, 10);
        let bounds = Rect::from_size(64, 32);
        assert!(wide.intersects(&bounds));
        assert_eq!(wide.intersection(&bounds), Rect::new(10, 0, 54, 10));
        assert_eq!(
            Rect::new(i32::MIN, 0, 1, 1).union(&Rect::new(i32::MAX - 1, 0, 1, 1)),
            Rect::new(i32::MIN, 0, i32::MAX, 1)
        );
        assert_eq!(Rect::from_size(u32::MAX, 1), Rect::new(0, 0, i32::MAX, 1));
    }

    #[test]
    fn test_region_ignores_empty_rects() {
        let mut region = Region::new();
        region.add(Rect::EMPTY);
        assert!(region.is_empty());
        region.add(Rect::new(10, 10, 5, 5));
        region.add(Rect::new(0, 0, 2, 2));
        assert_eq!(region.rects().len(), 2);
        assert_eq!(region.bounds(), Rect::new(0, 0, 15, 15));
    }

    #[test]
    fn test_transform_composition() {
        assert_eq!(BufferTransform::ROT_270, BufferTransform::ROT_90 | BufferTransform::ROT_180);
        assert!(BufferTransform::ROT_270.swaps_dimensions());
        assert!(!BufferTransform::ROT_180.swaps_dimensions());
    }
}
