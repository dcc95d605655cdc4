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

//! Buffers and the copy regions that move data out of them.

use super::image::ImageSubresourceLayers;
use crate::math::{Extent3D, Origin3D};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// How a buffer will be used.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct BufferUsage: u32 {
        /// Source of a transfer.
        const TRANSFER_SRC = 1 << 0;
        /// Destination of a transfer.
        const TRANSFER_DST = 1 << 1;
        /// Uniform buffer.
        const UNIFORM = 1 << 2;
        /// Storage buffer.
        const STORAGE = 1 << 3;
        /// Index buffer.
        const INDEX = 1 << 4;
        /// Vertex buffer.
        const VERTEX = 1 << 5;
        /// Indirect draw/dispatch arguments.
        const INDIRECT = 1 << 6;
    }
}

/// Where a buffer's memory lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MemoryLocation {
    /// Fast device memory, only reachable through transfers.
    #[default]
    DeviceLocal,
    /// Memory the host can write directly.
    HostVisible,
}

/// Parameters for creating a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferDescriptor {
    /// Optional debug label.
    pub label: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Intended usage.
    pub usage: BufferUsage,
    /// Memory placement.
    pub memory: MemoryLocation,
}

/// One buffer-to-buffer copy region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferCopy {
    /// Offset in the source buffer.
    pub src_offset: u64,
    /// Offset in the destination buffer.
    pub dst_offset: u64,
    /// Number of bytes.
    pub size: u64,
}

/// One buffer-to-image copy region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferImageCopy {
    /// Offset of the first texel in the source buffer.
    pub buffer_offset: u64,
    /// Destination subresource.
    pub subresource: ImageSubresourceLayers,
    /// Destination offset inside the subresource.
    pub image_offset: Origin3D,
    /// Size of the copied block.
    pub image_extent: Extent3D,
}
