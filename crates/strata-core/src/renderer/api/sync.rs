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

//! Synchronization vocabulary: access masks, pipeline stages, image layouts,
//! barriers, and the submit/present descriptors handed to queues.

use super::handle::{
    BufferId, CommandBufferId, ImageId, SemaphoreId, SwapchainId,
};
use super::image::ImageSubresourceRange;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Memory access types a barrier makes available or visible.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AccessFlags: u32 {
        /// Indirect command reads.
        const INDIRECT_COMMAND_READ = 1 << 0;
        /// Index buffer reads.
        const INDEX_READ = 1 << 1;
        /// Vertex attribute reads.
        const VERTEX_ATTRIBUTE_READ = 1 << 2;
        /// Uniform buffer reads.
        const UNIFORM_READ = 1 << 3;
        /// Shader reads (sampled images, storage buffers).
        const SHADER_READ = 1 << 4;
        /// Shader writes.
        const SHADER_WRITE = 1 << 5;
        /// Color attachment reads.
        const COLOR_ATTACHMENT_READ = 1 << 6;
        /// Color attachment writes.
        const COLOR_ATTACHMENT_WRITE = 1 << 7;
        /// Depth/stencil attachment writes.
        const DEPTH_STENCIL_WRITE = 1 << 8;
        /// Transfer reads.
        const TRANSFER_READ = 1 << 9;
        /// Transfer writes.
        const TRANSFER_WRITE = 1 << 10;
        /// Host reads.
        const HOST_READ = 1 << 11;
        /// Host writes.
        const HOST_WRITE = 1 << 12;
        /// Any read.
        const MEMORY_READ = 1 << 13;
        /// Any write.
        const MEMORY_WRITE = 1 << 14;
    }
}

bitflags! {
    /// Pipeline stages a barrier or semaphore wait synchronizes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PipelineStage: u32 {
        /// Start of the pipeline.
        const TOP_OF_PIPE = 1 << 0;
        /// Indirect draw/dispatch argument reads.
        const DRAW_INDIRECT = 1 << 1;
        /// Vertex and index fetch.
        const VERTEX_INPUT = 1 << 2;
        /// Vertex shading.
        const VERTEX_SHADER = 1 << 3;
        /// Fragment shading.
        const FRAGMENT_SHADER = 1 << 4;
        /// Depth/stencil tests.
        const EARLY_FRAGMENT_TESTS = 1 << 5;
        /// Color attachment output.
        const COLOR_ATTACHMENT_OUTPUT = 1 << 6;
        /// Compute shading.
        const COMPUTE_SHADER = 1 << 7;
        /// Copies, blits and clears.
        const TRANSFER = 1 << 8;
        /// End of the pipeline.
        const BOTTOM_OF_PIPE = 1 << 9;
        /// Host access.
        const HOST = 1 << 10;
        /// Every command.
        const ALL_COMMANDS = 1 << 11;
    }
}

bitflags! {
    /// Operations a queue supports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct QueueCapabilities: u32 {
        /// Graphics commands.
        const GRAPHICS = 1 << 0;
        /// Compute commands.
        const COMPUTE = 1 << 1;
        /// Transfer commands.
        const TRANSFER = 1 << 2;
        /// Presentation to a surface.
        const PRESENT = 1 << 3;
    }
}

/// The layout an image's memory is arranged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ImageLayout {
    #[default]
    Undefined,
    General,
    TransferSrc,
    TransferDst,
    ShaderReadOnly,
    ColorAttachment,
    DepthStencilAttachment,
    PresentSrc,
}

/// Requirements for retrieving a queue from the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDescriptor {
    /// Optional debug label.
    pub label: Option<String>,
    /// Operations the queue must support.
    pub capabilities: QueueCapabilities,
    /// A specific queue family, or `None` to let the device pick.
    pub family: Option<u32>,
}

/// A buffer memory barrier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferBarrier {
    /// The buffer the barrier applies to.
    pub buffer: BufferId,
    /// Accesses made available.
    pub src_access: AccessFlags,
    /// Accesses made visible.
    pub dst_access: AccessFlags,
    /// Releasing queue family for an ownership transfer.
    pub src_queue_family: Option<u32>,
    /// Acquiring queue family for an ownership transfer.
    pub dst_queue_family: Option<u32>,
    /// Start of the range, in bytes.
    pub offset: u64,
    /// Size of the range, or `None` for the rest of the buffer.
    pub size: Option<u64>,
}

/// An image memory barrier, including a layout transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBarrier {
    /// The image the barrier applies to.
    pub image: ImageId,
    /// Layout before the barrier.
    pub old_layout: ImageLayout,
    /// Layout after the barrier.
    pub new_layout: ImageLayout,
    /// Accesses made available.
    pub src_access: AccessFlags,
    /// Accesses made visible.
    pub dst_access: AccessFlags,
    /// Releasing queue family for an ownership transfer.
    pub src_queue_family: Option<u32>,
    /// Acquiring queue family for an ownership transfer.
    pub dst_queue_family: Option<u32>,
    /// Subresources the barrier covers.
    pub range: ImageSubresourceRange,
}

/// A full pipeline barrier: one stage dependency plus its memory barriers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineBarrier {
    /// Stages that must complete first.
    pub src_stage: PipelineStage,
    /// Stages that wait.
    pub dst_stage: PipelineStage,
    /// Buffer barriers.
    pub buffers: Vec<BufferBarrier>,
    /// Image barriers.
    pub images: Vec<ImageBarrier>,
}

/// One batch of command buffers for [`queue_submit`](crate::renderer::GraphicsDevice::queue_submit).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitInfo {
    /// Semaphores to wait on, with the stage the wait applies to.
    pub wait_semaphores: Vec<(SemaphoreId, PipelineStage)>,
    /// Command buffers to execute, in order.
    pub command_buffers: Vec<CommandBufferId>,
    /// Semaphores signaled once the batch completes.
    pub signal_semaphores: Vec<SemaphoreId>,
}

/// Parameters for presenting one swapchain image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentInfo {
    /// The swapchain the image belongs to.
    pub swapchain: SwapchainId,
    /// The index returned by the matching acquire.
    pub image_index: u32,
    /// Semaphores to wait on before presenting.
    pub wait_semaphores: Vec<SemaphoreId>,
}
