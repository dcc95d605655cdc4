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

//! Builds a triangle graph, runs it on the headless backend, resizes the
//! window halfway through and reloads the graph from a persisted copy.
//!
//! Pass a path to run a graph saved with `strata_data::persistence` instead.

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use std::sync::Arc;
use strata_data::persistence::{self, RonCodec};
use strata_sdk::prelude::*;

const FRAMES_PER_PHASE: u64 = 60;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    color: [f32; 3],
}

const VERTICES: &[Vertex] = &[
    Vertex { position: [0.0, -0.5, 0.0], color: [1.0, 0.0, 0.0] },
    Vertex { position: [0.5, 0.5, 0.0], color: [0.0, 1.0, 0.0] },
    Vertex { position: [-0.5, 0.5, 0.0], color: [0.0, 0.0, 1.0] },
];

fn node(id: &str, kind: NodeKind) -> Node {
    Node::new(kind).with_id(id)
}

fn named(id: &str) -> Ref {
    Ref::named(id)
}

fn triangle_graph() -> Graph {
    let mut graph = Graph::new();
    graph.add(node(
        "renderer",
        NodeKind::Renderer(RendererNode {
            name: "sandbox".to_string(),
            upload_workers: None,
        }),
    ));
    graph.add(node(
        "main",
        NodeKind::Window(WindowNode {
            title: "Strata Sandbox".to_string(),
            extent: Extent2D::new(1024, 768),
        }),
    ));
    graph.add(node("gpu", NodeKind::Device(DeviceNode { validation: false })));
    graph.add(node(
        "graphics",
        NodeKind::Queue(QueueNode {
            capabilities: QueueCapabilities::GRAPHICS | QueueCapabilities::PRESENT,
            family: None,
        }),
    ));
    graph.add(node(
        "swapchain",
        NodeKind::Swapchain(SwapchainNode {
            window: named("main"),
            format: Format::Bgra8Srgb,
            min_image_count: 3,
            present_mode: PresentMode::Fifo,
        }),
    ));
    graph.add(node(
        "frame",
        NodeKind::Frame(FrameNode {
            swapchain: named("swapchain"),
            frames_in_flight: Some(2),
        }),
    ));

    // Commands and synchronization
    graph.add(node(
        "pool",
        NodeKind::CommandPool(CommandPoolNode {
            queue: named("graphics"),
            transient: false,
            resettable: true,
        }),
    ));
    graph.add(
        node(
            "cmd",
            NodeKind::CommandBuffer(CommandBufferNode {
                pool: named("pool"),
                level: CommandBufferLevel::Primary,
            }),
        )
        .per_frame(),
    );
    graph.add(node("in-flight", NodeKind::Fence(FenceNode { signaled: true })).per_frame());
    graph.add(node("image-available", NodeKind::Semaphore).per_frame());
    graph.add(node("render-finished", NodeKind::Semaphore).per_frame());

    // Resources
    let vertex_bytes: &[u8] = bytemuck::cast_slice(VERTICES);
    graph.add(
        node(
            "camera-ubo",
            NodeKind::Buffer(BufferNode {
                size: 256,
                usage: BufferUsage::UNIFORM,
                memory: MemoryLocation::HostVisible,
            }),
        )
        .per_frame(),
    );
    graph.add(node(
        "vertices",
        NodeKind::Buffer(BufferNode {
            size: vertex_bytes.len() as u64,
            usage: BufferUsage::VERTEX | BufferUsage::TRANSFER_DST,
            memory: MemoryLocation::DeviceLocal,
        }),
    ));
    graph.add(Node::new(NodeKind::Upload(UploadNode {
        source: UploadSource::Memory(vertex_bytes.to_vec()),
        destinations: vec![named("vertices")],
        size: None,
        dst_offset: 0,
        image_encoding: None,
        target: TransferTarget {
            access: AccessFlags::VERTEX_ATTRIBUTE_READ,
            stage: PipelineStage::VERTEX_INPUT,
            layout: ImageLayout::Undefined,
            queue: Some(named("graphics")),
        },
    })));
    graph.add(node(
        "backbuffer",
        NodeKind::ImageView(ImageViewNode {
            source: ViewSource::Swapchain(named("swapchain")),
            view_type: ImageViewType::D2,
            format: None,
            range: ImageSubresourceRange::color(1, 1),
        }),
    ));
    graph.add(node(
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
    graph.add(node(
        "descriptors",
        NodeKind::DescriptorPool(DescriptorPoolDescriptor {
            label: None,
            max_sets: 8,
            sizes: vec![(DescriptorType::UniformBuffer, 8)],
        }),
    ));
    graph.add(node(
        "camera-set",
        NodeKind::DescriptorSet(DescriptorSetNode {
            pool: named("descriptors"),
            layout: named("camera-layout"),
            writes: vec![DescriptorWriteNode {
                binding: 0,
                array_element: 0,
                resource: DescriptorResourceNode::Buffer {
                    buffer: named("camera-ubo"),
                    offset: 0,
                    range: None,
                },
            }],
        }),
    ));

    // Pipeline
    graph.add(node(
        "pass",
        NodeKind::RenderPass(RenderPassDescriptor {
            label: Some("forward".to_string()),
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
    graph.add(node(
        "vs",
        NodeKind::ShaderModule(ShaderModuleDescriptor {
            label: Some("triangle.vert".to_string()),
            code: vec![0x0723_0203],
        }),
    ));
    graph.add(node(
        "fs",
        NodeKind::ShaderModule(ShaderModuleDescriptor {
            label: Some("triangle.frag".to_string()),
            code: vec![0x0723_0203],
        }),
    ));
    graph.add(node(
        "layout",
        NodeKind::PipelineLayout(PipelineLayoutNode {
            set_layouts: vec![named("camera-layout")],
            push_constants: Vec::new(),
        }),
    ));
    graph.add(node(
        "pipeline",
        NodeKind::GraphicsPipeline(GraphicsPipelineNode {
            layout: named("layout"),
            render_pass: named("pass"),
            subpass: 0,
            stages: vec![
                ShaderStageNode {
                    module: named("vs"),
                    stage: ShaderStage::Vertex,
                    entry_point: "main".to_string(),
                },
                ShaderStageNode {
                    module: named("fs"),
                    stage: ShaderStage::Fragment,
                    entry_point: "main".to_string(),
                },
            ],
            raster: RasterState::default(),
        }),
    ));
    graph.add(node(
        "framebuffer",
        NodeKind::Framebuffer(FramebufferNode {
            render_pass: named("pass"),
            attachments: vec![named("backbuffer")],
            extent: None,
            layers: 1,
        }),
    ));

    // Per-frame work
    graph.add(node(
        "camera",
        NodeKind::Camera(CameraNode {
            uniform_buffer: named("camera-ubo"),
            eye: [0.0, 0.0, 2.0],
            target: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            fov_y_degrees: 45.0,
            near: 0.1,
            far: 10.0,
        }),
    ));
    graph.add(node(
        "tree",
        NodeKind::CommandTree(CommandNode::RenderPass {
            render_pass: named("pass"),
            framebuffer: named("framebuffer"),
            area: Region::FULL,
            clear_values: vec![ClearValue::Color([0.02, 0.02, 0.05, 1.0])],
            subpasses: vec![vec![
                CommandNode::BindPipeline {
                    bind_point: PipelineBindPoint::Graphics,
                    pipeline: named("pipeline"),
                },
                CommandNode::BindDescriptorSets {
                    bind_point: PipelineBindPoint::Graphics,
                    layout: named("layout"),
                    first_set: 0,
                    sets: vec![named("camera-set")],
                    dynamic_offsets: Vec::new(),
                },
                CommandNode::BindVertexBuffers {
                    first_binding: 0,
                    buffers: vec![(named("vertices"), 0)],
                },
                CommandNode::SetViewport {
                    region: Region::FULL,
                    min_depth: 0.0,
                    max_depth: 1.0,
                },
                CommandNode::SetScissor(Region::FULL),
                CommandNode::Draw {
                    vertex_count: VERTICES.len() as u32,
                    instance_count: 1,
                    first_vertex: 0,
                    first_instance: 0,
                },
            ]],
        }),
    ));
    graph.add(node(
        "context",
        NodeKind::CommandContext(CommandContextNode {
            tree: named("tree"),
            command_buffer: named("cmd"),
        }),
    ));
    graph.add(node(
        "submit",
        NodeKind::QueueSubmit(QueueSubmitNode {
            queue: named("graphics"),
            command_buffers: vec![named("cmd")],
            wait_semaphores: vec![SemaphoreWait {
                semaphore: named("image-available"),
                stage: PipelineStage::COLOR_ATTACHMENT_OUTPUT,
            }],
            signal_semaphores: vec![named("render-finished")],
            fence: None,
        }),
    ));
    graph.add(node(
        "present",
        NodeKind::Present(PresentNode {
            queue: named("graphics"),
            swapchain: named("swapchain"),
            wait_semaphores: vec![named("render-finished")],
        }),
    ));
    graph.add(node(
        "coordinator",
        NodeKind::FrameCoordinator(FrameCoordinatorNode {
            frame: named("frame"),
            acquire_semaphore: named("image-available"),
            in_flight_fence: named("in-flight"),
            cameras: vec![named("camera")],
            contexts: vec![named("context")],
            submits: vec![named("submit")],
            presents: vec![named("present")],
        }),
    ));
    graph
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let graph = match std::env::args().nth(1) {
        Some(path) => persistence::load_from_path(&path)
            .with_context(|| format!("failed to read a graph from '{path}'"))?,
        None => triangle_graph(),
    };

    let backend = Arc::new(HeadlessBackend::new());
    let mut engine = Engine::init(backend.clone(), EngineSettings::from_env(), graph.clone())?;
    engine.run(Some(FRAMES_PER_PHASE))?;

    let window = engine
        .find("main")
        .and_then(|instance| instance.at(0))
        .and_then(|handle| handle.as_window())
        .and_then(|id| backend.window(id))
        .context("the graph declares no window named 'main'")?;
    window.resize(1280, 720);
    engine.run(Some(FRAMES_PER_PHASE))?;

    // Round-trip through the human-readable format and reload.
    let dir = std::env::temp_dir().join("strata-sandbox");
    std::fs::create_dir_all(&dir).context("failed to create the scratch directory")?;
    let path = dir.join("sandbox.ron");
    persistence::save_to_path(&graph, &RonCodec, &path)
        .with_context(|| format!("failed to save the graph to '{}'", path.display()))?;
    log::info!("Graph saved to '{}'", path.display());
    engine.load_file(&path)?;
    engine.run(Some(FRAMES_PER_PHASE))?;

    window.request_close();
    let remaining = engine.run(None)?;
    log::info!("Sandbox finished ({remaining} frame(s) after the close request).");
    Ok(())
}
