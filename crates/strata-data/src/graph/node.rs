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

//! Node payloads: one variant per kind of object the compiler can build.

use super::command::CommandNode;
use super::upload::UploadNode;
use super::{NodeRef, Ref};
use serde::{Deserialize, Serialize};
use strata_core::math::{Extent2D, Extent3D};
use strata_core::renderer::api::{
    BufferUsage, CommandBufferLevel, DescriptorPoolDescriptor, DescriptorSetLayoutDescriptor,
    Format, ImageDimension, ImageLayout, ImageSubresourceRange, ImageUsage, ImageViewType,
    MemoryLocation, ObjectKind, PipelineStage, PresentMode, PushConstantRange,
    QueryPoolDescriptor, QueueCapabilities, RasterState, RenderPassDescriptor,
    SamplerDescriptor, ShaderModuleDescriptor, ShaderStage,
};

/// A declarative node: a typed payload plus identity and per-frame binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Optional identifier, published in the id table once the node is built.
    pub id: Option<String>,
    /// Requests one instance per swapchain image.
    pub per_frame: bool,
    /// The `Frame` node this node is bound to, if bound explicitly.
    pub frame: Option<NodeRef>,
    /// The payload.
    pub kind: NodeKind,
}

impl Node {
    /// Creates an anonymous, single-instance node.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: None,
            per_frame: false,
            frame: None,
            kind,
        }
    }

    /// Sets the identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Flags the node as per-frame.
    pub fn per_frame(mut self) -> Self {
        self.per_frame = true;
        self
    }

    /// Flags the node as per-frame and binds it to a `Frame` node.
    pub fn bound_to(mut self, frame: NodeRef) -> Self {
        self.per_frame = true;
        self.frame = Some(frame);
        self
    }

    /// A label for logs: the id if present, otherwise the kind.
    pub fn label(&self) -> String {
        match &self.id {
            Some(id) => format!("{} '{id}'", self.kind.category()),
            None => self.kind.category().to_string(),
        }
    }
}

/// Compile categories, declared in the order the compiler processes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum NodeCategory {
    Renderer,
    Window,
    Device,
    Queue,
    Swapchain,
    Frame,
    CommandPool,
    CommandBuffer,
    Fence,
    Buffer,
    Image,
    Upload,
    ImageView,
    Sampler,
    DescriptorSetLayout,
    DescriptorPool,
    DescriptorSet,
    RenderPass,
    ShaderModule,
    PipelineLayout,
    Pipeline,
    Semaphore,
    Framebuffer,
    QueryPool,
    Event,
    Camera,
    CommandTree,
    CommandContext,
    QueueSubmit,
    Present,
    FrameCoordinator,
}

impl std::fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// The closed set of node kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum NodeKind {
    Renderer(RendererNode),
    Window(WindowNode),
    Device(DeviceNode),
    Queue(QueueNode),
    Swapchain(SwapchainNode),
    Frame(FrameNode),
    CommandPool(CommandPoolNode),
    CommandBuffer(CommandBufferNode),
    Fence(FenceNode),
    Buffer(BufferNode),
    Image(ImageNode),
    Upload(UploadNode),
    ImageView(ImageViewNode),
    Sampler(SamplerDescriptor),
    DescriptorSetLayout(DescriptorSetLayoutDescriptor),
    DescriptorPool(DescriptorPoolDescriptor),
    DescriptorSet(DescriptorSetNode),
    RenderPass(RenderPassDescriptor),
    ShaderModule(ShaderModuleDescriptor),
    PipelineLayout(PipelineLayoutNode),
    GraphicsPipeline(GraphicsPipelineNode),
    ComputePipeline(ComputePipelineNode),
    Semaphore,
    Framebuffer(FramebufferNode),
    QueryPool(QueryPoolDescriptor),
    Event,
    Camera(CameraNode),
    CommandTree(CommandNode),
    CommandContext(CommandContextNode),
    QueueSubmit(QueueSubmitNode),
    Present(PresentNode),
    FrameCoordinator(FrameCoordinatorNode),
}

impl NodeKind {
    /// The compile category of this kind.
    pub fn category(&self) -> NodeCategory {
        match self {
            NodeKind::Renderer(_) => NodeCategory::Renderer,
            NodeKind::Window(_) => NodeCategory::Window,
            NodeKind::Device(_) => NodeCategory::Device,
            NodeKind::Queue(_) => NodeCategory::Queue,
            NodeKind::Swapchain(_) => NodeCategory::Swapchain,
            NodeKind::Frame(_) => NodeCategory::Frame,
            NodeKind::CommandPool(_) => NodeCategory::CommandPool,
            NodeKind::CommandBuffer(_) => NodeCategory::CommandBuffer,
            NodeKind::Fence(_) => NodeCategory::Fence,
            NodeKind::Buffer(_) => NodeCategory::Buffer,
            NodeKind::Image(_) => NodeCategory::Image,
            NodeKind::Upload(_) => NodeCategory::Upload,
            NodeKind::ImageView(_) => NodeCategory::ImageView,
            NodeKind::Sampler(_) => NodeCategory::Sampler,
            NodeKind::DescriptorSetLayout(_) => NodeCategory::DescriptorSetLayout,
            NodeKind::DescriptorPool(_) => NodeCategory::DescriptorPool,
            NodeKind::DescriptorSet(_) => NodeCategory::DescriptorSet,
            NodeKind::RenderPass(_) => NodeCategory::RenderPass,
            NodeKind::ShaderModule(_) => NodeCategory::ShaderModule,
            NodeKind::PipelineLayout(_) => NodeCategory::PipelineLayout,
            NodeKind::GraphicsPipeline(_) | NodeKind::ComputePipeline(_) => NodeCategory::Pipeline,
            NodeKind::Semaphore => NodeCategory::Semaphore,
            NodeKind::Framebuffer(_) => NodeCategory::Framebuffer,
            NodeKind::QueryPool(_) => NodeCategory::QueryPool,
            NodeKind::Event => NodeCategory::Event,
            NodeKind::Camera(_) => NodeCategory::Camera,
            NodeKind::CommandTree(_) => NodeCategory::CommandTree,
            NodeKind::CommandContext(_) => NodeCategory::CommandContext,
            NodeKind::QueueSubmit(_) => NodeCategory::QueueSubmit,
            NodeKind::Present(_) => NodeCategory::Present,
            NodeKind::FrameCoordinator(_) => NodeCategory::FrameCoordinator,
        }
    }

    /// The kind of object built for this node, or `None` for configuration
    /// nodes (renderer, frame), actions (upload) and immutable trees.
    pub fn object_kind(&self) -> Option<ObjectKind> {
        Some(match self {
            NodeKind::Renderer(_)
            | NodeKind::Frame(_)
            | NodeKind::Upload(_)
            | NodeKind::CommandTree(_) => return None,
            NodeKind::Window(_) => ObjectKind::Window,
            NodeKind::Device(_) => ObjectKind::Device,
            NodeKind::Queue(_) => ObjectKind::Queue,
            NodeKind::Swapchain(_) => ObjectKind::Swapchain,
            NodeKind::CommandPool(_) => ObjectKind::CommandPool,
            NodeKind::CommandBuffer(_) => ObjectKind::CommandBuffer,
            NodeKind::Fence(_) => ObjectKind::Fence,
            NodeKind::Buffer(_) => ObjectKind::Buffer,
            NodeKind::Image(_) => ObjectKind::Image,
            NodeKind::ImageView(_) => ObjectKind::ImageView,
            NodeKind::Sampler(_) => ObjectKind::Sampler,
            NodeKind::DescriptorSetLayout(_) => ObjectKind::DescriptorSetLayout,
            NodeKind::DescriptorPool(_) => ObjectKind::DescriptorPool,
            NodeKind::DescriptorSet(_) => ObjectKind::DescriptorSet,
            NodeKind::RenderPass(_) => ObjectKind::RenderPass,
            NodeKind::ShaderModule(_) => ObjectKind::ShaderModule,
            NodeKind::PipelineLayout(_) => ObjectKind::PipelineLayout,
            NodeKind::GraphicsPipeline(_) | NodeKind::ComputePipeline(_) => ObjectKind::Pipeline,
            NodeKind::Semaphore => ObjectKind::Semaphore,
            NodeKind::Framebuffer(_) => ObjectKind::Framebuffer,
            NodeKind::QueryPool(_) => ObjectKind::QueryPool,
            NodeKind::Event => ObjectKind::Event,
            NodeKind::Camera(_) => ObjectKind::Camera,
            NodeKind::CommandContext(_) => ObjectKind::CommandContext,
            NodeKind::QueueSubmit(_) => ObjectKind::QueueSubmit,
            NodeKind::Present(_) => ObjectKind::Present,
            NodeKind::FrameCoordinator(_) => ObjectKind::FrameCoordinator,
        })
    }

    /// Returns `true` for objects that survive `Load`: windows, device and queues.
    pub fn is_device_level(&self) -> bool {
        matches!(
            self,
            NodeKind::Window(_) | NodeKind::Device(_) | NodeKind::Queue(_)
        )
    }

    /// Returns `true` if this kind can be replicated once per swapchain image.
    pub fn is_replicable(&self) -> bool {
        matches!(
            self,
            NodeKind::CommandPool(_)
                | NodeKind::CommandBuffer(_)
                | NodeKind::Fence(_)
                | NodeKind::Buffer(_)
                | NodeKind::Image(_)
                | NodeKind::ImageView(_)
                | NodeKind::Sampler(_)
                | NodeKind::DescriptorSet(_)
                | NodeKind::Semaphore
                | NodeKind::Framebuffer(_)
                | NodeKind::QueryPool(_)
                | NodeKind::Event
        )
    }

    /// References that must be built before this node (creation dependencies).
    pub fn owned_refs(&self) -> Vec<&Ref> {
        let mut out = Vec::new();
        match self {
            NodeKind::Swapchain(n) => out.push(&n.window),
            NodeKind::Frame(n) => out.push(&n.swapchain),
            NodeKind::CommandPool(n) => out.push(&n.queue),
            NodeKind::CommandBuffer(n) => out.push(&n.pool),
            NodeKind::Image(n) => {
                if let ImageExtent::Relative { swapchain, .. } = &n.extent {
                    out.push(swapchain);
                }
            }
            NodeKind::Upload(n) => {
                out.extend(n.destinations.iter());
                out.extend(n.target.queue.iter());
            }
            NodeKind::ImageView(n) => match &n.source {
                ViewSource::Image(r) | ViewSource::Swapchain(r) => out.push(r),
            },
            NodeKind::DescriptorSet(n) => {
                out.push(&n.pool);
                out.push(&n.layout);
            }
            NodeKind::PipelineLayout(n) => out.extend(n.set_layouts.iter()),
            NodeKind::GraphicsPipeline(n) => {
                out.push(&n.layout);
                out.push(&n.render_pass);
                out.extend(n.stages.iter().map(|s| &s.module));
            }
            NodeKind::ComputePipeline(n) => {
                out.push(&n.layout);
                out.push(&n.stage.module);
            }
            NodeKind::Framebuffer(n) => {
                out.push(&n.render_pass);
                out.extend(n.attachments.iter());
            }
            NodeKind::Camera(n) => out.push(&n.uniform_buffer),
            NodeKind::CommandContext(n) => {
                out.push(&n.tree);
                out.push(&n.command_buffer);
            }
            NodeKind::QueueSubmit(n) => {
                out.push(&n.queue);
                out.extend(n.command_buffers.iter());
                out.extend(n.wait_semaphores.iter().map(|w| &w.semaphore));
                out.extend(n.signal_semaphores.iter());
                out.extend(n.fence.iter());
            }
            NodeKind::Present(n) => {
                out.push(&n.queue);
                out.push(&n.swapchain);
                out.extend(n.wait_semaphores.iter());
            }
            NodeKind::FrameCoordinator(n) => {
                out.push(&n.frame);
                out.push(&n.acquire_semaphore);
                out.push(&n.in_flight_fence);
                out.extend(n.cameras.iter());
                out.extend(n.contexts.iter());
                out.extend(n.submits.iter());
                out.extend(n.presents.iter());
            }
            NodeKind::Renderer(_)
            | NodeKind::Window(_)
            | NodeKind::Device(_)
            | NodeKind::Queue(_)
            | NodeKind::Fence(_)
            | NodeKind::Buffer(_)
            | NodeKind::Sampler(_)
            | NodeKind::DescriptorSetLayout(_)
            | NodeKind::DescriptorPool(_)
            | NodeKind::RenderPass(_)
            | NodeKind::ShaderModule(_)
            | NodeKind::Semaphore
            | NodeKind::QueryPool(_)
            | NodeKind::Event
            | NodeKind::CommandTree(_) => {}
        }
        out
    }

    /// References resolved after every node is built: descriptor writes and
    /// command trees. These carry no ownership and may close cycles.
    pub fn lookup_refs(&self) -> Vec<&Ref> {
        let mut out = Vec::new();
        match self {
            NodeKind::DescriptorSet(n) => {
                for write in &n.writes {
                    write.resource.refs(&mut out);
                }
            }
            NodeKind::CommandTree(root) => root.refs(&mut out),
            _ => {}
        }
        out
    }
}

/// Global renderer configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererNode {
    /// Application name, used in logs.
    pub name: String,
    /// Overrides the configured number of upload workers.
    pub upload_workers: Option<usize>,
}

/// A window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowNode {
    /// Title.
    pub title: String,
    /// Requested inner size.
    pub extent: Extent2D,
}

/// The logical device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceNode {
    /// Enables backend validation.
    pub validation: bool,
}

/// A queue retrieved from the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueNode {
    /// Required capabilities.
    pub capabilities: QueueCapabilities,
    /// Explicit family, if any.
    pub family: Option<u32>,
}

/// A swapchain presenting to a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapchainNode {
    /// The window node.
    pub window: Ref,
    /// Image format.
    pub format: Format,
    /// Minimum image count.
    pub min_image_count: u32,
    /// Present mode.
    pub present_mode: PresentMode,
}

/// Binds per-frame nodes to a swapchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameNode {
    /// The swapchain whose image count sets N.
    pub swapchain: Ref,
    /// Frame slots cycled by the coordinator, clamped to N.
    pub frames_in_flight: Option<u32>,
}

/// A command pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandPoolNode {
    /// Queue whose family the pool serves.
    pub queue: Ref,
    /// Short-lived buffers.
    pub transient: bool,
    /// Individually resettable buffers.
    pub resettable: bool,
}

/// A command buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandBufferNode {
    /// The pool to allocate from.
    pub pool: Ref,
    /// Level.
    pub level: CommandBufferLevel,
}

/// A fence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FenceNode {
    /// Created signaled.
    pub signaled: bool,
}

/// A buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferNode {
    /// Size in bytes.
    pub size: u64,
    /// Usage.
    pub usage: BufferUsage,
    /// Memory placement.
    pub memory: MemoryLocation,
}

/// How an image's extent is determined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImageExtent {
    /// A fixed extent.
    Absolute(Extent3D),
    /// Relative to a swapchain's extent, using the fractional rule of
    /// [`Region`](strata_core::math::Region) for each axis.
    Relative {
        /// The swapchain node.
        swapchain: Ref,
        /// Width (fraction, absolute, or `0.0` for full).
        width: f32,
        /// Height (fraction, absolute, or `0.0` for full).
        height: f32,
    },
    /// Discovered from the source of the upload that targets this image.
    FromSource,
}

/// An image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageNode {
    /// Dimensionality.
    pub dimension: ImageDimension,
    /// Format. Ignored for images whose extent comes from their source.
    pub format: Format,
    /// Extent rule.
    pub extent: ImageExtent,
    /// Mip levels.
    pub mip_levels: u32,
    /// Array layers.
    pub array_layers: u32,
    /// Samples.
    pub samples: u32,
    /// Usage.
    pub usage: ImageUsage,
}

/// What an image view looks at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewSource {
    /// An image node.
    Image(Ref),
    /// The images of a swapchain node. Such views are always per-frame.
    Swapchain(Ref),
}

/// An image view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageViewNode {
    /// Viewed object.
    pub source: ViewSource,
    /// View type.
    pub view_type: ImageViewType,
    /// Format override.
    pub format: Option<Format>,
    /// Visible subresources.
    pub range: ImageSubresourceRange,
}

/// A descriptor set, expanded to one set per image when any of its
/// resources is per-frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorSetNode {
    /// The pool.
    pub pool: Ref,
    /// The layout.
    pub layout: Ref,
    /// Writes applied after the whole graph is built.
    pub writes: Vec<DescriptorWriteNode>,
}

/// One descriptor write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorWriteNode {
    /// Binding number.
    pub binding: u32,
    /// Array element.
    pub array_element: u32,
    /// The resource.
    pub resource: DescriptorResourceNode,
}

/// A resource referenced by a descriptor write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum DescriptorResourceNode {
    Buffer {
        buffer: Ref,
        offset: u64,
        range: Option<u64>,
    },
    Image {
        view: Ref,
        layout: ImageLayout,
    },
    Sampler(Ref),
    CombinedImageSampler {
        view: Ref,
        sampler: Ref,
        layout: ImageLayout,
    },
}

impl DescriptorResourceNode {
    fn refs<'a>(&'a self, out: &mut Vec<&'a Ref>) {
        match self {
            DescriptorResourceNode::Buffer { buffer, .. } => out.push(buffer),
            DescriptorResourceNode::Image { view, .. } => out.push(view),
            DescriptorResourceNode::Sampler(sampler) => out.push(sampler),
            DescriptorResourceNode::CombinedImageSampler { view, sampler, .. } => {
                out.push(view);
                out.push(sampler);
            }
        }
    }
}

/// A pipeline layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineLayoutNode {
    /// Set layout nodes, in set order.
    pub set_layouts: Vec<Ref>,
    /// Push constant ranges.
    pub push_constants: Vec<PushConstantRange>,
}

/// A shader module bound to a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderStageNode {
    /// The shader module node.
    pub module: Ref,
    /// Stage.
    pub stage: ShaderStage,
    /// Entry point.
    pub entry_point: String,
}

/// A graphics pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphicsPipelineNode {
    /// The layout node.
    pub layout: Ref,
    /// The render pass node.
    pub render_pass: Ref,
    /// Subpass index.
    pub subpass: u32,
    /// Stages.
    pub stages: Vec<ShaderStageNode>,
    /// Fixed-function state.
    pub raster: RasterState,
}

/// A compute pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputePipelineNode {
    /// The layout node.
    pub layout: Ref,
    /// The compute stage.
    pub stage: ShaderStageNode,
}

/// A framebuffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramebufferNode {
    /// The render pass node.
    pub render_pass: Ref,
    /// Attachment view nodes.
    pub attachments: Vec<Ref>,
    /// Explicit extent, or `None` to use the first attachment's.
    pub extent: Option<Extent2D>,
    /// Layers.
    pub layers: u32,
}

/// A camera whose parameters are written into a uniform buffer every frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraNode {
    /// The (usually per-frame) uniform buffer node.
    pub uniform_buffer: Ref,
    /// Eye position.
    pub eye: [f32; 3],
    /// Look-at target.
    pub target: [f32; 3],
    /// Up direction.
    pub up: [f32; 3],
    /// Vertical field of view, in degrees.
    pub fov_y_degrees: f32,
    /// Near plane.
    pub near: f32,
    /// Far plane.
    pub far: f32,
}

/// Binds a command tree to a command buffer node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandContextNode {
    /// The command tree node.
    pub tree: Ref,
    /// The (usually per-frame) command buffer node.
    pub command_buffer: Ref,
}

/// A semaphore wait in a submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemaphoreWait {
    /// The semaphore node.
    pub semaphore: Ref,
    /// Stage the wait applies to.
    pub stage: PipelineStage,
}

/// A queue submission performed every frame.
///
/// Command buffers resolve with the acquired image index, semaphores and the
/// fence with the frame slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSubmitNode {
    /// The queue node.
    pub queue: Ref,
    /// Command buffer nodes.
    pub command_buffers: Vec<Ref>,
    /// Semaphores to wait on.
    pub wait_semaphores: Vec<SemaphoreWait>,
    /// Semaphores to signal.
    pub signal_semaphores: Vec<Ref>,
    /// Fence to signal. The coordinator's in-flight fence takes precedence on
    /// its final submit.
    pub fence: Option<Ref>,
}

/// A present performed every frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentNode {
    /// The queue node.
    pub queue: Ref,
    /// The swapchain node.
    pub swapchain: Ref,
    /// Semaphores to wait on, resolved with the frame slot.
    pub wait_semaphores: Vec<Ref>,
}

/// Drives acquire, update, submit and present for one frame node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameCoordinatorNode {
    /// The frame node.
    pub frame: Ref,
    /// Per-slot semaphore signaled by image acquisition.
    pub acquire_semaphore: Ref,
    /// Per-slot fence guarding reuse of the slot.
    pub in_flight_fence: Ref,
    /// Cameras updated for each acquired image.
    pub cameras: Vec<Ref>,
    /// Command contexts updated for each acquired image.
    pub contexts: Vec<Ref>,
    /// Submits, in order.
    pub submits: Vec<Ref>,
    /// Presents, in order.
    pub presents: Vec<Ref>,
}
