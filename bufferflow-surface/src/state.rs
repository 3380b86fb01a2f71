//! Attribute state staged by setters and committed on latch.

use crate::geometry::{BufferTransform, Dataspace, HdrMetadata, Matrix22, Rect, Region};
use bitflags::bitflags;
use bufferflow_core::config::PipelineFlavor;

/// Opaque handle to a sideband video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SidebandStream(pub u64);

bitflags! {
    /// Setter families a pipeline accepts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineCapabilities: u32 {
        /// Crop, frame, buffer transform, transform-to-display-inverse.
        const BUFFER_GEOMETRY = 0x1;
        /// Dataspace, HDR metadata, damage, transparent region, api, sideband,
        /// acquire fence.
        const BUFFER_METADATA = 0x2;
        /// Size, position, matrix.
        const LEGACY_GEOMETRY = 0x4;
    }
}

impl PipelineCapabilities {
    pub fn for_flavor(flavor: PipelineFlavor) -> Self {
        match flavor {
            PipelineFlavor::BufferState => Self::BUFFER_GEOMETRY | Self::BUFFER_METADATA,
            PipelineFlavor::Legacy => Self::LEGACY_GEOMETRY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayerState {
    pub crop: Rect,
    pub frame: Rect,
    pub transform: BufferTransform,
    pub transform_to_display_inverse: bool,
    pub dataspace: Dataspace,
    pub hdr_metadata: HdrMetadata,
    pub transparent_region_hint: Region,
    pub surface_damage: Region,
    pub api: i32,
    pub sideband_stream: Option<SidebandStream>,
    pub size: (u32, u32),
    pub position: (f32, f32),
    pub matrix: Matrix22,
}

impl LayerState {
    /// Crop applied to a buffer of `width` x `height`; an unset crop covers the
    /// whole buffer.
    pub fn effective_crop(&self, width: u32, height: u32) -> Rect {
        let bounds = Rect::from_size(width, height);
        if self.crop.is_empty() {
            bounds
        } else {
            self.crop.intersection(&bounds)
        }
    }
}

/// Stages `value` and reports whether it differs from `committed`.
pub(crate) fn stage<T: PartialEq>(committed: &T, staged: &mut T, value: T) -> bool {
    let changed = *committed != value;
    *staged = value;
    changed
}
