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

//! Opaque handles to native objects and the closed sum type over all of them.
//!
//! Every object a [`GraphicsDevice`](crate::renderer::GraphicsDevice) creates is
//! addressed by a small copyable id. [`NativeHandle`] tags those ids with their
//! kind so heterogeneous objects can be stored, looked up and destroyed
//! without downcasting.

use crate::platform::WindowId;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_handles {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            pub struct $name(pub u64);
        )*
    };
}

define_handles!(
    /// A logical device.
    DeviceId,
    /// A queue retrieved from the device.
    QueueId,
    /// A presentation swapchain.
    SwapchainId,
    /// A command pool.
    CommandPoolId,
    /// A command buffer allocated from a pool.
    CommandBufferId,
    /// A fence (device to host signal).
    FenceId,
    /// A semaphore (device to device signal).
    SemaphoreId,
    /// A buffer.
    BufferId,
    /// An image.
    ImageId,
    /// A view onto an image.
    ImageViewId,
    /// A sampler.
    SamplerId,
    /// A descriptor set layout.
    DescriptorSetLayoutId,
    /// A descriptor pool.
    DescriptorPoolId,
    /// A descriptor set allocated from a pool.
    DescriptorSetId,
    /// A render pass.
    RenderPassId,
    /// A shader module.
    ShaderModuleId,
    /// A pipeline layout.
    PipelineLayoutId,
    /// A graphics or compute pipeline.
    PipelineId,
    /// A framebuffer.
    FramebufferId,
    /// A query pool.
    QueryPoolId,
    /// A device event.
    EventId,
);

/// The kind of an object, native or engine-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ObjectKind {
    Window,
    Device,
    Queue,
    Swapchain,
    CommandPool,
    CommandBuffer,
    Fence,
    Semaphore,
    Buffer,
    Image,
    ImageView,
    Sampler,
    DescriptorSetLayout,
    DescriptorPool,
    DescriptorSet,
    RenderPass,
    ShaderModule,
    PipelineLayout,
    Pipeline,
    Framebuffer,
    QueryPool,
    Event,
    Camera,
    CommandContext,
    QueueSubmit,
    Present,
    FrameCoordinator,
}

impl ObjectKind {
    /// Returns `true` for objects owned by the device boundary, `false` for
    /// engine-side host objects.
    pub fn is_native(self) -> bool {
        !matches!(
            self,
            ObjectKind::Camera
                | ObjectKind::CommandContext
                | ObjectKind::QueueSubmit
                | ObjectKind::Present
                | ObjectKind::FrameCoordinator
        )
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A tagged handle to one created object.
///
/// Host variants carry an index into the arena of the agent that owns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum NativeHandle {
    Window(WindowId),
    Device(DeviceId),
    Queue(QueueId),
    Swapchain(SwapchainId),
    CommandPool(CommandPoolId),
    CommandBuffer(CommandBufferId),
    Fence(FenceId),
    Semaphore(SemaphoreId),
    Buffer(BufferId),
    Image(ImageId),
    ImageView(ImageViewId),
    Sampler(SamplerId),
    DescriptorSetLayout(DescriptorSetLayoutId),
    DescriptorPool(DescriptorPoolId),
    DescriptorSet(DescriptorSetId),
    RenderPass(RenderPassId),
    ShaderModule(ShaderModuleId),
    PipelineLayout(PipelineLayoutId),
    Pipeline(PipelineId),
    Framebuffer(FramebufferId),
    QueryPool(QueryPoolId),
    Event(EventId),
    Camera(u32),
    CommandContext(u32),
    QueueSubmit(u32),
    Present(u32),
    FrameCoordinator(u32),
}

macro_rules! handle_accessors {
    ($($fn_name:ident => $variant:ident($ty:ty)),* $(,)?) => {
        impl NativeHandle {
            /// Returns the kind of the referenced object.
            pub fn kind(&self) -> ObjectKind {
                match self {
                    $(NativeHandle::$variant(_) => ObjectKind::$variant,)*
                    NativeHandle::Camera(_) => ObjectKind::Camera,
                    NativeHandle::CommandContext(_) => ObjectKind::CommandContext,
                    NativeHandle::QueueSubmit(_) => ObjectKind::QueueSubmit,
                    NativeHandle::Present(_) => ObjectKind::Present,
                    NativeHandle::FrameCoordinator(_) => ObjectKind::FrameCoordinator,
                }
            }

            $(
                #[doc = concat!("Returns the id if this is a `", stringify!($variant), "` handle.")]
                pub fn $fn_name(&self) -> Option<$ty> {
                    match self {
                        NativeHandle::$variant(id) => Some(*id),
                        _ => None,
                    }
                }
            )*
        }
    };
}

handle_accessors!(
    as_window => Window(WindowId),
    as_device => Device(DeviceId),
    as_queue => Queue(QueueId),
    as_swapchain => Swapchain(SwapchainId),
    as_command_pool => CommandPool(CommandPoolId),
    as_command_buffer => CommandBuffer(CommandBufferId),
    as_fence => Fence(FenceId),
    as_semaphore => Semaphore(SemaphoreId),
    as_buffer => Buffer(BufferId),
    as_image => Image(ImageId),
    as_image_view => ImageView(ImageViewId),
    as_sampler => Sampler(SamplerId),
    as_descriptor_set_layout => DescriptorSetLayout(DescriptorSetLayoutId),
    as_descriptor_pool => DescriptorPool(DescriptorPoolId),
    as_descriptor_set => DescriptorSet(DescriptorSetId),
    as_render_pass => RenderPass(RenderPassId),
    as_shader_module => ShaderModule(ShaderModuleId),
    as_pipeline_layout => PipelineLayout(PipelineLayoutId),
    as_pipeline => Pipeline(PipelineId),
    as_framebuffer => Framebuffer(FramebufferId),
    as_query_pool => QueryPool(QueryPoolId),
    as_event => Event(EventId),
);

impl NativeHandle {
    /// Returns the arena index of an engine-side host object.
    pub fn host_index(&self) -> Option<usize> {
        match self {
            NativeHandle::Camera(i)
            | NativeHandle::CommandContext(i)
            | NativeHandle::QueueSubmit(i)
            | NativeHandle::Present(i)
            | NativeHandle::FrameCoordinator(i) => Some(*i as usize),
            _ => None,
        }
    }
}
