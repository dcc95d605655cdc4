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

//! A small forward-rendering graph shared by the agent tests.

#![allow(dead_code)]

use std::sync::Arc;
use strata_core::math::{Extent2D, Region};
use strata_core::renderer::api::*;
use strata_core::EngineSettings;
use strata_data::graph::*;
use strata_data::{Graph, Node, NodeRef, Ref};
use strata_agents::GraphCompiler;
use strata_infra::{HeadlessBackend, HeadlessDevice, HeadlessWindow};

/// Bytes uploaded into the "vertices" buffer.
pub const VERTICES: [u8; 64] = {
    let mut bytes = [0u8; 64];
    let mut i = 0;
    while i < 64 {
        bytes[i] = i as u8;
        i += 1;
    }
    bytes
};

/// The camera declared by [`scene`].
pub fn camera() -> CameraNode {
    CameraNode {
        uniform_buffer: Ref::named("camera-ubo"),
        eye: [0.0, 2.0, 5.0],
        target: [0.0, 0.0, 0.0],
        up: [0.0, 1.0, 0.0],
        fov_y_degrees: 60.0,
        near: 0.1,
        far: 100.0,
    }
}

fn named(id: &str, kind: NodeKind) -> Node {
    Node::new(kind).with_id(id)
}

/// A window, device and queue, a 3-image swapchain, per-frame command
/// buffers, sync objects, camera uniforms and descriptor sets, one uploaded
/// vertex buffer, a render pass drawing into the swapchain images and a
/// frame coordinator driving it all.
pub fn scene() -> Graph {
    let mut graph = Graph::new();
    graph.add(named(
        "renderer",
        NodeKind::Renderer(RendererNode {
            name: "agents-test".to_string(),
            upload_workers: Some(2),
        }),
    ));
    graph.add(named(
        "main",
        NodeKind::Window(WindowNode {
            title: "Strata".to_string(),
            extent: Extent2D::new(640, 480),
        }),
    ));
    graph.add(named("gpu", NodeKind::Device(DeviceNode { validation: true })));
    graph.add(named(
        "graphics",
        NodeKind::Queue(QueueNode {
            capabilities: QueueCapabilities::GRAPHICS | QueueCapabilities::PRESENT,
            family: None,
        }),
    ));
    graph.add(named(
        "swapchain",
        NodeKind::Swapchain(SwapchainNode {
            window: Ref::named("main"),
            format: Format::Bgra8Srgb,
            min_image_count: 3,
            present_mode: PresentMode::Fifo,
        }),
    ));
    graph.add(named(
        "frame",
        NodeKind::Frame(FrameNode {
            swapchain: Ref::named("swapchain"),
            frames_in_flight: Some(2),
        }),
    ));
    graph.add(named(
        "pool",
        NodeKind::CommandPool(CommandPoolNode {
            queue: Ref::named("graphics"),
            transient: false,
            resettable: true,
        }),
    ));
    graph.add(
        named(
            "cmd",
            NodeKind::CommandBuffer(CommandBufferNode {
                pool: Ref::named("pool"),
                level: CommandBufferLevel::Primary,
            }),
        )
        .per_frame(),
    );
    graph.add(named("in-flight", NodeKind::Fence(FenceNode { signaled: true })).per_frame());
    graph.add(named("image-available", NodeKind::Semaphore).per_frame());
    graph.add(named("render-finished", NodeKind::Semaphore).per_frame());
    graph.add(
        named(
            "camera-ubo",
            NodeKind::Buffer(BufferNode {
                size: 256,
                usage: BufferUsage::UNIFORM,
                memory: MemoryLocation::HostVisible,
            }),
        )
        .per_frame(),
    );
    graph.add(named(
        "vertices",
        NodeKind::Buffer(BufferNode {
            size: 64,
            usage: BufferUsage::VERTEX | BufferUsage::TRANSFER_DST,
            memory: MemoryLocation::DeviceLocal,
        }),
    ));
    graph.add(Node::new(NodeKind::Upload(UploadNode {
        source: UploadSource::Memory(VERTICES.to_vec()),
        destinations: vec![Ref::named("vertices")],
        size: None,
        dst_offset: 0,
        image_encoding: None,
        target: TransferTarget {
            access: AccessFlags::VERTEX_ATTRIBUTE_READ,
            stage: PipelineStage::VERTEX_INPUT,
            layout: ImageLayout::Undefined,
            queue: Some(Ref::named("graphics")),
        },
    })));
    graph.add(named(
        "backbuffer",
        NodeKind::ImageView(ImageViewNode {
            source: ViewSource::Swapchain(Ref::named("swapchain")),
            view_type: ImageViewType::D2,
            format: None,
            range: ImageSubresourceRange::color(1, 1),
        }),
    ));
    graph.add(named(
        "camera-layout",
        NodeKind::DescriptorSetLayout(DescriptorSetLayoutDescriptor {
            label: None,
            bindings: vec![DescriptorSetLayoutBinding {
                binding: 0,
                ty: DescriptorType::UniformBuffer,
                count: 1,
                stages: ShaderStages::VERTEX,
            }],
        }),
    ));
    graph.add(named(
        "descriptors",
        NodeKind::DescriptorPool(DescriptorPoolDescriptor {
            label: None,
            max_sets: 8,
            sizes: vec![(DescriptorType::UniformBuffer, 8)],
        }),
    ));
    graph.add(named(
        "camera-set",
        NodeKind::DescriptorSet(DescriptorSetNode {
            pool: Ref::named("descriptors"),
            layout: Ref::named("camera-layout"),
            writes: vec![DescriptorWriteNode {
                binding: 0,
                array_element: 0,
                resource: DescriptorResourceNode::Buffer {
                    buffer: Ref::named("camera-ubo"),
                    offset: 0,
                    range: None,
                },
            }],
        }),
    ));
    graph.add(named(
        "pass",
        NodeKind::RenderPass(RenderPassDescriptor {
            label: None,
            attachments: vec![AttachmentDescription {
                format: Format::Bgra8Srgb,
                samples: 1,
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                initial_layout: ImageLayout::Undefined,
                final_layout: ImageLayout::PresentSrc,
            }],
            subpasses: vec![SubpassDescription {
                color: vec![0],
                ..Default::default()
            }],
            dependencies: Vec::new(),
        }),
    ));
    for (id, stage) in [("vs", "vertex"), ("fs", "fragment")] {
        graph.add(named(
            id,
            NodeKind::ShaderModule(ShaderModuleDescriptor {
                label: Some(stage.to_string()),
                code: vec![0x0723_0203],
            }),
        ));
    }
    graph.add(named(
        "layout",
        NodeKind::PipelineLayout(PipelineLayoutNode {
            set_layouts: vec![Ref::named("camera-layout")],
            push_constants: Vec::new(),
        }),
    ));
    graph.add(named(
        "pipeline",
        NodeKind::GraphicsPipeline(GraphicsPipelineNode {
            layout: Ref::named("layout"),
            render_pass: Ref::named("pass"),
            subpass: 0,
            stages: vec![
                ShaderStageNode {
                    module: Ref::named("vs"),
                    stage: ShaderStage::Vertex,
                    entry_point: "main".to_string(),
                },
                ShaderStageNode {
                    module: Ref::named("fs"),
                    stage: ShaderStage::Fragment,
                    entry_point: "main".to_string(),
                },
            ],
            raster: RasterState::default(),
        }),
    ));
    graph.add(named(
        "framebuffer",
        NodeKind::Framebuffer(FramebufferNode {
            render_pass: Ref::named("pass"),
            attachments: vec![Ref::named("backbuffer")],
            extent: None,
            layers: 1,
        }),
    ));
    graph.add(named("camera", NodeKind::Camera(camera())));
    graph.add(named(
        "tree",
        NodeKind::CommandTree(CommandNode::RenderPass {
            render_pass: Ref::named("pass"),
            framebuffer: Ref::named("framebuffer"),
            area: Region::FULL,
            clear_values: vec![ClearValue::Color([0.1, 0.1, 0.1, 1.0])],
            subpasses: vec![vec![
                CommandNode::BindPipeline {
                    bind_point: PipelineBindPoint::Graphics,
                    pipeline: Ref::named("pipeline"),
                },
                CommandNode::BindDescriptorSets {
                    bind_point: PipelineBindPoint::Graphics,
                    layout: Ref::named("layout"),
                    first_set: 0,
                    sets: vec![Ref::named("camera-set")],
                    dynamic_offsets: Vec::new(),
                },
                CommandNode::BindVertexBuffers {
                    first_binding: 0,
                    buffers: vec![(Ref::named("vertices"), 0)],
                },
                CommandNode::SetViewport {
                    region: Region::FULL,
                    min_depth: 0.0,
                    max_depth: 1.0,
                },
                CommandNode::SetScissor(Region::FULL),
                CommandNode::Draw {
                    vertex_count: 3,
                    instance_count: 1,
                    first_vertex: 0,
                    first_instance: 0,
                },
            ]],
        }),
    ));
    graph.add(named(
        "context",
        NodeKind::CommandContext(CommandContextNode {
            tree: Ref::named("tree"),
            command_buffer: Ref::named("cmd"),
        }),
    ));
    graph.add(named(
        "submit",
        NodeKind::QueueSubmit(QueueSubmitNode {
            queue: Ref::named("graphics"),
            command_buffers: vec![Ref::named("cmd")],
            wait_semaphores: vec![SemaphoreWait {
                semaphore: Ref::named("image-available"),
                stage: PipelineStage::COLOR_ATTACHMENT_OUTPUT,
            }],
            signal_semaphores: vec![Ref::named("render-finished")],
            fence: None,
        }),
    ));
    graph.add(named(
        "present",
        NodeKind::Present(PresentNode {
            queue: Ref::named("graphics"),
            swapchain: Ref::named("swapchain"),
            wait_semaphores: vec![Ref::named("render-finished")],
        }),
    ));
    graph.add(named(
        "coordinator",
        NodeKind::FrameCoordinator(FrameCoordinatorNode {
            frame: Ref::named("frame"),
            acquire_semaphore: Ref::named("image-available"),
            in_flight_fence: Ref::named("in-flight"),
            cameras: vec![Ref::named("camera")],
            contexts: vec![Ref::named("context")],
            submits: vec![Ref::named("submit")],
            presents: vec![Ref::named("present")],
        }),
    ));
    graph
}

/// A compiler on a fresh headless backend, with logging routed to the test harness.
pub fn compiler() -> (Arc<HeadlessBackend>, GraphCompiler) {
    let _ = env_logger::builder().is_test(true).try_init();
    let backend = Arc::new(HeadlessBackend::new());
    let compiler = GraphCompiler::new(backend.clone(), EngineSettings::default());
    (backend, compiler)
}

/// The headless device behind an initialized compiler.
pub fn device(backend: &HeadlessBackend) -> Arc<HeadlessDevice> {
    backend.device().expect("the compiler created a device")
}

/// The headless window declared as "main".
pub fn window(backend: &HeadlessBackend, compiler: &GraphCompiler) -> Arc<HeadlessWindow> {
    let id = compiler
        .find("main")
        .and_then(|instance| instance.at(0))
        .and_then(|handle| handle.as_window())
        .expect("main window is registered");
    backend.window(id).expect("the backend created the window")
}

/// The node carrying `id` in the live graph.
pub fn node(compiler: &GraphCompiler, id: &str) -> NodeRef {
    compiler
        .compiled()
        .and_then(|compiled| compiled.graph().find_by_id(id))
        .expect("node is part of the live graph")
}

/// Every handle registered under `id`.
pub fn handles(compiler: &GraphCompiler, id: &str) -> Vec<NativeHandle> {
    compiler
        .find(id)
        .map(|instance| instance.handles().to_vec())
        .unwrap_or_default()
}
