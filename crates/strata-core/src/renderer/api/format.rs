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

//! Texel formats.

use serde::{Deserialize, Serialize};

/// The memory layout of one texel (or one compressed block) of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Format {
    R8Unorm,
    Rg8Unorm,
    Rgba8Unorm,
    Rgba8Srgb,
    Bgra8Unorm,
    Bgra8Srgb,
    R16Float,
    Rgba16Float,
    R32Float,
    Rg32Float,
    Rgba32Float,
    Depth32Float,
    Depth24PlusStencil8,
    Bc1RgbaUnorm,
    Bc3RgbaUnorm,
    Bc7RgbaUnorm,
}

impl Format {
    /// Returns `(block width, block height, bytes per block)`.
    ///
    /// Uncompressed formats use 1x1 blocks.
    pub fn block_info(self) -> (u32, u32, u32) {
        match self {
            Format::R8Unorm => (1, 1, 1),
            Format::Rg8Unorm | Format::R16Float => (1, 1, 2),
            Format::Rgba8Unorm
            | Format::Rgba8Srgb
            | Format::Bgra8Unorm
            | Format::Bgra8Srgb
            | Format::R32Float
            | Format::Depth32Float
            | Format::Depth24PlusStencil8 => (1, 1, 4),
            Format::Rgba16Float | Format::Rg32Float => (1, 1, 8),
            Format::Rgba32Float => (1, 1, 16),
            Format::Bc1RgbaUnorm => (4, 4, 8),
            Format::Bc3RgbaUnorm | Format::Bc7RgbaUnorm => (4, 4, 16),
        }
    }

    /// Returns `true` for block-compressed formats.
    pub fn is_compressed(self) -> bool {
        self.block_info().0 > 1
    }

    /// Returns `true` for formats with a depth and/or stencil aspect.
    pub fn is_depth_stencil(self) -> bool {
        matches!(self, Format::Depth32Float | Format::Depth24PlusStencil8)
    }

    /// Size in bytes of a tightly packed `width` x `height` x `depth` region.
    pub fn data_size(self, width: u32, height: u32, depth: u32) -> u64 {
        let (bw, bh, bytes) = self.block_info();
        let blocks_x = width.div_ceil(bw) as u64;
        let blocks_y = height.div_ceil(bh) as u64;
        blocks_x * blocks_y * depth.max(1) as u64 * bytes as u64
    }
}
