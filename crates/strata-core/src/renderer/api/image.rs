// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Images, image views and samplers.

use super::format::Format;
use super::handle::ImageId;
use crate::math::Extent3D;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// How an image will be used.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ImageUsage: u32 {
        /// Source of a transfer.
        const TRANSFER_SRC = 1 << 0;
        /// Destination of a transfer.
        const TRANSFER_DST = 1 << 1;
        /// Sampled from shaders.
        const SAMPLED = 1 << 2;
        /// Read/written as a storage image.
        const STORAGE = 1 << 3;
        /// Rendered to as a color attachment.
        const COLOR_ATTACHMENT = 1 << 4;
        /// Rendered to as a depth/stencil attachment.
        const DEPTH_STENCIL_ATTACHMENT = 1 << 5;
    }
}

/// The dimensionality of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ImageDimension {
    D1,
    #[default]
    D2,
    D3,
    /// A 2D image whose array layers are grouped in sixes as cube faces.
    Cube,
}

/// Parameters for creating an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    /// Optional debug label.
    pub label: Option<String>,
    /// Dimensionality.
    pub dimension: ImageDimension,
    /// Texel format.
    pub format: Format,
    /// Size of mip level 0.
    pub extent: Extent3D,
    /// Number of mip levels.
    pub mip_levels: u32,
    /// Number of array layers (six per cube).
    pub array_layers: u32,
    /// Samples per texel.
    pub samples: u32,
    /// Intended usage.
    pub usage: ImageUsage,
}

impl ImageDescriptor {
    /// Total size in bytes of every subresource, tightly packed.
    pub fn data_size(&self) -> u64 {
        (0..self.mip_levels.max(1))
            .map(|level| {
                let e = self.extent.mip_level(level);
                self.format.data_size(e.width, e.height, e.depth)
            })
            .sum::<u64>()
            * self.array_layers.max(1) as u64
    }
}

/// Which aspects of an image a view or barrier addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ImageAspect {
    #[default]
    Color,
    Depth,
    Stencil,
    DepthStencil,
}

/// A range of mip levels and array layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSubresourceRange {
    /// Addressed aspect.
    pub aspect: ImageAspect,
    /// First mip level.
    pub base_mip_level: u32,
    /// Number of mip levels.
    pub level_count: u32,
    /// First array layer.
    pub base_array_layer: u32,
    /// Number of array layers.
    pub layer_count: u32,
}

impl ImageSubresourceRange {
    /// Covers `levels` mip levels and `layers` array layers of the color aspect.
    pub fn color(levels: u32, layers: u32) -> Self {
        Self {
            aspect: ImageAspect::Color,
            base_mip_level: 0,
            level_count: levels.max(1),
            base_array_layer: 0,
            layer_count: layers.max(1),
        }
    }
}

impl Default for ImageSubresourceRange {
    fn default() -> Self {
        Self::color(1, 1)
    }
}

/// The layers of one mip level, as addressed by a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSubresourceLayers {
    /// Addressed aspect.
    pub aspect: ImageAspect,
    /// The mip level.
    pub mip_level: u32,
    /// First array layer.
    pub base_array_layer: u32,
    /// Number of array layers.
    pub layer_count: u32,
}

/// How a view interprets its image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ImageViewType {
    D1,
    #[default]
    D2,
    D2Array,
    D3,
    Cube,
    CubeArray,
}

/// Parameters for creating an image view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageViewDescriptor {
    /// Optional debug label.
    pub label: Option<String>,
    /// The viewed image.
    pub image: ImageId,
    /// Interpretation of the image.
    pub view_type: ImageViewType,
    /// Reinterpreted format, or `None` to inherit the image's.
    pub format: Option<Format>,
    /// Visible subresources.
    pub range: ImageSubresourceRange,
}

/// Texel filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

/// Behavior outside the [0, 1] coordinate range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum AddressMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirrorRepeat,
    ClampToBorder,
}

/// Parameters for creating a sampler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplerDescriptor {
    /// Optional debug label.
    pub label: Option<String>,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Filter between mip levels.
    pub mipmap_filter: FilterMode,
    /// Addressing for the u, v and w coordinates.
    pub address_modes: [AddressMode; 3],
    /// Maximum anisotropy, or `None` to disable.
    pub max_anisotropy: Option<f32>,
    /// Highest mip level that may be sampled.
    pub lod_max: f32,
}
