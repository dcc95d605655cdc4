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

use crate::math::Extent2D;
use crate::renderer::api::*;
use crate::renderer::error::{RenderError, ResourceError};
use crate::renderer::traits::CommandRecorder;
use std::fmt::Debug;
use std::time::Duration;

/// The abstract device boundary.
///
/// The graph compiler, the upload engine, the command cache and the frame
/// coordinator are written purely against this trait. Every method takes
/// `&self`: implementations synchronize internally so a device can be shared
/// between the render thread and upload workers.
pub trait GraphicsDevice: Send + Sync + Debug + 'static {
    /// The handle naming this device, unique per backend.
    fn id(&self) -> DeviceId;

    // --- Queues & presentation ---

    /// Retrieves a queue matching the descriptor.
    /// ## Arguments
    /// * `descriptor` - The required capabilities and optional family.
    /// ## Returns
    /// The ID of a queue. Repeated calls with the same requirements may return the same queue.
    /// ## Errors
    /// * `ResourceError` - If no family supports the requested capabilities.
    fn get_queue(&self, descriptor: &QueueDescriptor) -> Result<QueueId, ResourceError>;

    /// Returns the family index of a queue.
    fn queue_family_index(&self, queue: QueueId) -> Result<u32, ResourceError>;

    /// Creates a swapchain for a window. The image extent follows the window's inner size.
    fn create_swapchain(
        &self,
        descriptor: &SwapchainDescriptor,
    ) -> Result<SwapchainId, ResourceError>;

    /// Recreates a swapchain in place against its window's current size.
    ///
    /// The ID stays valid; previously returned images are destroyed and the
    /// image count may change.
    fn recreate_swapchain(&self, swapchain: SwapchainId) -> Result<(), ResourceError>;

    /// Returns the images owned by a swapchain, in index order.
    fn swapchain_images(&self, swapchain: SwapchainId) -> Result<Vec<ImageId>, ResourceError>;

    /// Returns the current extent of a swapchain's images.
    fn swapchain_extent(&self, swapchain: SwapchainId) -> Result<Extent2D, ResourceError>;

    /// Acquires the next presentable image.
    /// ## Arguments
    /// * `swapchain` - The swapchain to acquire from.
    /// * `signal` - A semaphore signaled once the image is ready to be written.
    /// * `timeout` - How long to wait, or `None` to wait indefinitely.
    /// ## Returns
    /// The acquired index, or [`AcquireResult::OutOfDate`] if the swapchain must be recreated.
    /// ## Errors
    /// * `RenderError` - Any other failure, including a timeout.
    fn acquire_next_image(
        &self,
        swapchain: SwapchainId,
        signal: Option<SemaphoreId>,
        timeout: Option<Duration>,
    ) -> Result<AcquireResult, RenderError>;

    /// Submits batches of command buffers to a queue.
    /// ## Arguments
    /// * `queue` - The target queue.
    /// * `submits` - The batches, executed in order.
    /// * `fence` - Optionally signaled once every batch completes.
    fn queue_submit(
        &self,
        queue: QueueId,
        submits: &[SubmitInfo],
        fence: Option<FenceId>,
    ) -> Result<(), RenderError>;

    /// Queues a swapchain image for presentation.
    ///
    /// Stale and suboptimal swapchains are reported through [`PresentResult`],
    /// not as errors.
    fn queue_present(&self, queue: QueueId, info: &PresentInfo)
        -> Result<PresentResult, RenderError>;

    /// Blocks until every queue is idle.
    fn wait_idle(&self) -> Result<(), RenderError>;

    // --- Synchronization ---

    /// Creates a fence, optionally in the signaled state.
    fn create_fence(&self, signaled: bool) -> Result<FenceId, ResourceError>;

    /// Blocks until every fence in `fences` is signaled.
    /// ## Errors
    /// * `RenderError::Timeout` - If `timeout` elapsed first.
    fn wait_for_fences(&self, fences: &[FenceId], timeout: Option<Duration>)
        -> Result<(), RenderError>;

    /// Returns fences to the unsignaled state.
    fn reset_fences(&self, fences: &[FenceId]) -> Result<(), RenderError>;

    /// Returns `true` if a fence is signaled, without blocking.
    fn fence_status(&self, fence: FenceId) -> Result<bool, RenderError>;

    /// Creates a binary semaphore.
    fn create_semaphore(&self) -> Result<SemaphoreId, ResourceError>;

    /// Creates a device event.
    fn create_event(&self) -> Result<EventId, ResourceError>;

    // --- Commands ---

    /// Creates a command pool.
    fn create_command_pool(
        &self,
        descriptor: &CommandPoolDescriptor,
    ) -> Result<CommandPoolId, ResourceError>;

    /// Allocates one command buffer from a pool.
    fn allocate_command_buffer(
        &self,
        pool: CommandPoolId,
        level: CommandBufferLevel,
    ) -> Result<CommandBufferId, ResourceError>;

    /// Discards the recorded content of a command buffer.
    fn reset_command_buffer(&self, command_buffer: CommandBufferId) -> Result<(), RenderError>;

    /// Starts recording into a command buffer.
    ///
    /// The recording is committed by [`CommandRecorder::finish`]. Recording into
    /// a buffer that is pending execution is an error.
    fn begin_command_buffer(
        &self,
        command_buffer: CommandBufferId,
    ) -> Result<Box<dyn CommandRecorder>, RenderError>;

    // --- Resources ---

    /// Creates a new buffer.
    /// ## Arguments
    /// * `descriptor` - A reference to a `BufferDescriptor` containing the buffer configuration.
    /// ## Returns
    /// A `Result` containing the ID of the created buffer or an error if the creation fails.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Writes bytes into a host-visible buffer.
    /// ## Errors
    /// * `ResourceError` - If the buffer is not host-visible or the write is out of bounds.
    fn write_buffer(&self, buffer: BufferId, offset: u64, data: &[u8])
        -> Result<(), ResourceError>;

    /// Creates a new image.
    fn create_image(&self, descriptor: &ImageDescriptor) -> Result<ImageId, ResourceError>;

    /// Creates a view onto an image.
    fn create_image_view(
        &self,
        descriptor: &ImageViewDescriptor,
    ) -> Result<ImageViewId, ResourceError>;

    /// Creates a sampler.
    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError>;

    /// Creates a descriptor set layout.
    fn create_descriptor_set_layout(
        &self,
        descriptor: &DescriptorSetLayoutDescriptor,
    ) -> Result<DescriptorSetLayoutId, ResourceError>;

    /// Creates a descriptor pool.
    fn create_descriptor_pool(
        &self,
        descriptor: &DescriptorPoolDescriptor,
    ) -> Result<DescriptorPoolId, ResourceError>;

    /// Allocates a descriptor set from a pool.
    fn allocate_descriptor_set(
        &self,
        descriptor: &DescriptorSetDescriptor,
    ) -> Result<DescriptorSetId, ResourceError>;

    /// Applies descriptor writes.
    fn update_descriptor_sets(&self, writes: &[DescriptorWrite]) -> Result<(), ResourceError>;

    /// Creates a render pass.
    fn create_render_pass(
        &self,
        descriptor: &RenderPassDescriptor,
    ) -> Result<RenderPassId, ResourceError>;

    /// Creates a shader module from precompiled code.
    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError>;

    /// Creates a pipeline layout.
    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError>;

    /// Creates a graphics pipeline.
    fn create_graphics_pipeline(
        &self,
        descriptor: &GraphicsPipelineDescriptor,
    ) -> Result<PipelineId, ResourceError>;

    /// Creates a compute pipeline.
    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<PipelineId, ResourceError>;

    /// Creates a framebuffer.
    fn create_framebuffer(
        &self,
        descriptor: &FramebufferDescriptor,
    ) -> Result<FramebufferId, ResourceError>;

    /// Creates a query pool.
    fn create_query_pool(
        &self,
        descriptor: &QueryPoolDescriptor,
    ) -> Result<QueryPoolId, ResourceError>;

    /// Destroys any object created by this device.
    ///
    /// Swapchain images are owned by their swapchain and cannot be destroyed
    /// individually. Host handles are rejected.
    /// ## Errors
    /// * `ResourceError::InvalidHandle` - If the handle is unknown or already destroyed.
    fn destroy(&self, handle: NativeHandle) -> Result<(), ResourceError>;
}
