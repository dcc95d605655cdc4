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

//! Integration tests for graph persistence with both shipped codecs.

use std::path::PathBuf;
use strata_core::math::{Extent2D, Extent3D, Region};
use strata_core::persistence::{GraphFile, GraphHeader};
use strata_core::renderer::api::{
    AccessFlags, AttachmentDescription, BufferUsage, ClearValue, CommandBufferLevel,
    DescriptorPoolDescriptor, DescriptorSetLayoutBinding, DescriptorSetLayoutDescriptor,
    DescriptorType, Format, ImageDimension, ImageLayout, ImageSubresourceRange, ImageUsage,
    ImageViewType, LoadOp, MemoryLocation, PipelineBindPoint, PipelineStage, PresentMode,
    QueueCapabilities, RasterState, RenderPassDescriptor, SamplerDescriptor, ShaderModuleDescriptor,
    ShaderStage, ShaderStages, StoreOp, SubpassDescription,
};
use strata_data::graph::*;
use strata_data::persistence::{
    self, BinaryCodec, DeserializationError, GraphCodec, RonCodec,
};
use strata_data::{Graph, Node, NodeKind, Ref};

/// Helper: a graph touching most node kinds, with ids, per-frame flags,
/// fractional regions and both reference forms.
fn sample_graph() -> Graph {
    let mut graph = Graph::new();
    graph.add(Node::new(NodeKind::Renderer(RendererNode {
        name: "persistence".into(),
        upload_workers: Some(2),
    })));
    let window = graph.add(
        Node::new(NodeKind::Window(WindowNode {
            title: "main".into(),
            extent: Extent2D::new(1280, 720),
        }))
        .with_id("window"),
    );
    graph.add(Node::new(NodeKind::Device(DeviceNode { validation: true })));
    let queue = graph.add(
        Node::new(NodeKind::Queue(QueueNode {
            capabilities: QueueCapabilities::GRAPHICS | QueueCapabilities::PRESENT,
            family: Some(0),
        }))
        .with_id("queue"),
    );
    let swapchain = graph.add(Node::new(NodeKind::Swapchain(SwapchainNode {
        window: window.into(),
        format: Format::Bgra8Srgb,
        min_image_count: 3,
        present_mode: PresentMode::Mailbox,
    })));
    let frame = graph.add(Node::new(NodeKind::Frame(FrameNode {
        swapchain: swapchain.into(),
        frames_in_flight: Some(2),
    })));
    let pool = graph.add(Node::new(NodeKind::CommandPool(CommandPoolNode {
        queue: Ref::named("queue"),
        transient: false,
        resettable: true,
    })));
    let cb = graph.add(
        Node::new(NodeKind::CommandBuffer(CommandBufferNode {
            pool: pool.into(),
            level: CommandBufferLevel::Primary,
        }))
        .bound_to(frame),
    );
    let fence = graph.add(Node::new(NodeKind::Fence(FenceNode { signaled: true })).bound_to(frame));
    let ubo = graph.add(
        Node::new(NodeKind::Buffer(BufferNode {
            size: 192,
            usage: BufferUsage::UNIFORM | BufferUsage::TRANSFER_DST,
            memory: MemoryLocation::HostVisible,
        }))
        .per_frame()
        .with_id("camera-ubo"),
    );
    let texture = graph.add(Node::new(NodeKind::Image(ImageNode {
        dimension: ImageDimension::D2,
        format: Format::Rgba8Srgb,
        extent: ImageExtent::FromSource,
        mip_levels: 1,
        array_layers: 1,
        samples: 1,
        usage: ImageUsage::SAMPLED | ImageUsage::TRANSFER_DST,
    })));
    let depth = graph.add(Node::new(NodeKind::Image(ImageNode {
        dimension: ImageDimension::D2,
        format: Format::Depth32Float,
        extent: ImageExtent::Relative {
            swapchain: swapchain.into(),
            width: 0.5,
            height: 0.0,
        },
        mip_levels: 1,
        array_layers: 1,
        samples: 1,
        usage: ImageUsage::DEPTH_STENCIL_ATTACHMENT,
    })));
    graph.add(Node::new(NodeKind::Upload(UploadNode {
        source: UploadSource::File {
            path: PathBuf::from("assets/albedo.ktx"),
            offset: 16,
            length: None,
        },
        destinations: vec![texture.into()],
        size: None,
        dst_offset: 0,
        image_encoding: Some(ImageEncoding::Ktx),
        target: TransferTarget::default(),
    })));
    graph.add(Node::new(NodeKind::Upload(UploadNode {
        source: UploadSource::Memory(vec![0, 1, 2, 3, 255]),
        destinations: vec![Ref::named("camera-ubo")],
        size: Some(4),
        dst_offset: 8,
        image_encoding: None,
        target: TransferTarget {
            access: AccessFlags::UNIFORM_READ,
            stage: PipelineStage::VERTEX_SHADER,
            layout: ImageLayout::Undefined,
            queue: Some(queue.into()),
        },
    })));
    let backbuffer = graph.add(Node::new(NodeKind::ImageView(ImageViewNode {
        source: ViewSource::Swapchain(swapchain.into()),
        view_type: ImageViewType::D2,
        format: None,
        range: ImageSubresourceRange::default(),
    })));
    let depth_view = graph.add(Node::new(NodeKind::ImageView(ImageViewNode {
        source: ViewSource::Image(depth.into()),
        view_type: ImageViewType::D2,
        format: Some(Format::Depth32Float),
        range: ImageSubresourceRange::default(),
    })));
    let sampler = graph.add(Node::new(NodeKind::Sampler(SamplerDescriptor {
        max_anisotropy: Some(8.0),
        lod_max: 12.5,
        ..Default::default()
    })));
    let set_layout = graph.add(Node::new(NodeKind::DescriptorSetLayout(
        DescriptorSetLayoutDescriptor {
            label: Some("camera".into()),
            bindings: vec![DescriptorSetLayoutBinding {
                binding: 0,
                ty: DescriptorType::UniformBuffer,
                count: 1,
                stages: ShaderStages::VERTEX,
            }],
        },
    )));
    let descriptor_pool = graph.add(Node::new(NodeKind::DescriptorPool(DescriptorPoolDescriptor {
        label: None,
        max_sets: 8,
        sizes: vec![(DescriptorType::UniformBuffer, 8)],
    })));
    graph.add(Node::new(NodeKind::DescriptorSet(DescriptorSetNode {
        pool: descriptor_pool.into(),
        layout: set_layout.into(),
        writes: vec![
            DescriptorWriteNode {
                binding: 0,
                array_element: 0,
                resource: DescriptorResourceNode::Buffer {
                    buffer: ubo.into(),
                    offset: 0,
                    range: Some(192),
                },
            },
            DescriptorWriteNode {
                binding: 1,
                array_element: 0,
                resource: DescriptorResourceNode::Sampler(sampler.into()),
            },
        ],
    })));
    let render_pass = graph.add(Node::new(NodeKind::RenderPass(RenderPassDescriptor {
        label: Some("main".into()),
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
            depth_stencil: None,
            input: vec![],
        }],
        dependencies: vec![],
    })));
    let shader = graph.add(Node::new(NodeKind::ShaderModule(ShaderModuleDescriptor {
        label: None,
        code: vec![0x0723_0203, 1, 2, 3],
    })));
    let pipeline_layout = graph.add(Node::new(NodeKind::PipelineLayout(PipelineLayoutNode {
        set_layouts: vec![set_layout.into()],
        push_constants: vec![],
    })));
    graph.add(
        Node::new(NodeKind::GraphicsPipeline(GraphicsPipelineNode {
            layout: pipeline_layout.into(),
            render_pass: render_pass.into(),
            subpass: 0,
            stages: vec![
                ShaderStageNode {
                    module: shader.into(),
                    stage: ShaderStage::Vertex,
                    entry_point: "vs_main".into(),
                },
                ShaderStageNode {
                    module: shader.into(),
                    stage: ShaderStage::Fragment,
                    entry_point: "fs_main".into(),
                },
            ],
            raster: RasterState::default(),
        }))
        .with_id("pipeline"),
    );
    let acquire = graph.add(Node::new(NodeKind::Semaphore).bound_to(frame));
    let render_done = graph.add(Node::new(NodeKind::Semaphore).bound_to(frame));
    graph.add(
        Node::new(NodeKind::Framebuffer(FramebufferNode {
            render_pass: render_pass.into(),
            attachments: vec![backbuffer.into(), depth_view.into()],
            extent: None,
            layers: 1,
        }))
        .with_id("framebuffer"),
    );
    let camera = graph.add(Node::new(NodeKind::Camera(CameraNode {
        uniform_buffer: ubo.into(),
        eye: [0.0, 1.5, -4.0],
        target: [0.0, 0.0, 0.0],
        up: [0.0, 1.0, 0.0],
        fov_y_degrees: 60.0,
        near: 0.1,
        far: 100.0,
    })));
    let tree = graph.add(Node::new(NodeKind::CommandTree(CommandNode::Group {
        label: "main pass".into(),
        children: vec![CommandNode::RenderPass {
            render_pass: render_pass.into(),
            framebuffer: Ref::named("framebuffer"),
            area: Region::FULL,
            clear_values: vec![ClearValue::Color([0.1, 0.2, 0.3, 1.0])],
            subpasses: vec![vec![
                CommandNode::BindPipeline {
                    bind_point: PipelineBindPoint::Graphics,
                    pipeline: Ref::named("pipeline"),
                },
                CommandNode::SetViewport {
                    region: Region::new(0.0, 0.0, 0.5, 1.0),
                    min_depth: 0.0,
                    max_depth: 1.0,
                },
                CommandNode::SetScissor(Region::new(0.25, 0.0, 0.5, 200.0)),
                CommandNode::Draw {
                    vertex_count: 3,
                    instance_count: 1,
                    first_vertex: 0,
                    first_instance: 0,
                },
            ]],
        }],
    })));
    let context = graph.add(Node::new(NodeKind::CommandContext(CommandContextNode {
        tree: tree.into(),
        command_buffer: cb.into(),
    })));
    let submit = graph.add(Node::new(NodeKind::QueueSubmit(QueueSubmitNode {
        queue: queue.into(),
        command_buffers: vec![cb.into()],
        wait_semaphores: vec![SemaphoreWait {
            semaphore: acquire.into(),
            stage: PipelineStage::COLOR_ATTACHMENT_OUTPUT,
        }],
        signal_semaphores: vec![render_done.into()],
        fence: None,
    })));
    let present = graph.add(Node::new(NodeKind::Present(PresentNode {
        queue: queue.into(),
        swapchain: swapchain.into(),
        wait_semaphores: vec![render_done.into()],
    })));
    graph.add(Node::new(NodeKind::FrameCoordinator(FrameCoordinatorNode {
        frame: frame.into(),
        acquire_semaphore: acquire.into(),
        in_flight_fence: fence.into(),
        cameras: vec![camera.into()],
        contexts: vec![context.into()],
        submits: vec![submit.into()],
        presents: vec![present.into()],
    })));
    graph
}

fn assert_same_graph(original: &Graph, restored: &Graph) {
    assert_eq!(original.len(), restored.len());
    for ((_, a), (_, b)) in original.iter().zip(restored.iter()) {
        assert_eq!(a.kind.category(), b.kind.category());
        assert_eq!(a.id, b.id);
        assert_eq!(a.per_frame, b.per_frame);
        assert_eq!(a.frame, b.frame);
    }
    assert_eq!(original.ownership_edges(), restored.ownership_edges());
    assert_eq!(original.lookup_edges(), restored.lookup_edges());
    assert_eq!(original, restored);
}

// ─────────────────────────────────────────────────────────────────────────────
// Round trips
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_sample_graph_is_valid() {
    let layout = sample_graph().analyze().unwrap();
    assert_eq!(layout.order.len(), sample_graph().len());
}

#[test]
fn test_binary_round_trip_preserves_the_graph() {
    let graph = sample_graph();
    let bytes = persistence::save(&graph, &BinaryCodec).unwrap();
    let restored = persistence::load(&bytes).unwrap();
    assert_same_graph(&graph, &restored);
}

#[test]
fn test_text_round_trip_preserves_the_graph() {
    let graph = sample_graph();
    let bytes = persistence::save(&graph, &RonCodec).unwrap();
    let restored = persistence::load(&bytes).unwrap();
    assert_same_graph(&graph, &restored);
}

#[test]
fn test_text_payload_is_human_readable() {
    let bytes = persistence::save(&sample_graph(), &RonCodec).unwrap();
    let text = std::str::from_utf8(&bytes[GraphHeader::SIZE..]).unwrap();
    assert!(text.contains("Swapchain"));
    assert!(text.contains("\"camera-ubo\""));
}

#[test]
fn test_header_names_the_codec() {
    let bytes = persistence::save(&sample_graph(), &BinaryCodec).unwrap();
    let file = GraphFile::from_bytes(&bytes).unwrap();
    assert_eq!(file.header.strategy(), BinaryCodec.strategy_id());
    assert_eq!(file.header.payload_length as usize, file.payload.len());
}

#[test]
fn test_analysis_is_unchanged_by_a_round_trip() {
    let graph = sample_graph();
    let restored = persistence::load(&persistence::save(&graph, &BinaryCodec).unwrap()).unwrap();
    assert_eq!(graph.analyze(), restored.analyze());
}

// ─────────────────────────────────────────────────────────────────────────────
// Rejection
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_bad_magic_is_rejected() {
    let mut bytes = persistence::save(&sample_graph(), &BinaryCodec).unwrap();
    bytes[0] ^= 0xff;
    assert!(matches!(
        persistence::load(&bytes),
        Err(DeserializationError::InvalidHeader(_))
    ));
}

#[test]
fn test_truncated_payload_is_rejected() {
    let bytes = persistence::save(&sample_graph(), &RonCodec).unwrap();
    assert!(matches!(
        persistence::load(&bytes[..bytes.len() - 1]),
        Err(DeserializationError::InvalidHeader(_))
    ));
}

#[test]
fn test_unknown_strategy_is_rejected() {
    let bytes = GraphFile::new("SOMEONE_ELSES_V3", vec![1, 2, 3]).to_bytes();
    match persistence::load(&bytes) {
        Err(DeserializationError::UnknownStrategy(id)) => assert_eq!(id, "SOMEONE_ELSES_V3"),
        other => panic!("expected an unknown strategy, got {other:?}"),
    }
}

#[test]
fn test_payload_of_the_wrong_codec_is_rejected() {
    let ron = RonCodec.encode(&sample_graph()).unwrap();
    let bytes = GraphFile::new(BinaryCodec.strategy_id(), ron).to_bytes();
    assert!(matches!(
        persistence::load(&bytes),
        Err(DeserializationError::InvalidFormat(_))
    ));
}

#[test]
fn test_files_round_trip_through_the_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.strata");
    let graph = sample_graph();

    persistence::save_to_path(&graph, &RonCodec, &path).unwrap();
    let restored = persistence::load_from_path(&path).unwrap();
    assert_same_graph(&graph, &restored);

    assert!(matches!(
        persistence::load_from_path(dir.path().join("missing.strata")),
        Err(DeserializationError::Io(_))
    ));
}

#[test]
fn test_extents_survive_both_codecs() {
    let mut graph = Graph::new();
    graph.add(Node::new(NodeKind::Image(ImageNode {
        dimension: ImageDimension::D3,
        format: Format::R16Float,
        extent: ImageExtent::Absolute(Extent3D::new(64, 32, 8)),
        mip_levels: 4,
        array_layers: 1,
        samples: 1,
        usage: ImageUsage::STORAGE,
    })));
    for codec in [&BinaryCodec as &dyn GraphCodec, &RonCodec] {
        let restored = persistence::load(&persistence::save(&graph, codec).unwrap()).unwrap();
        assert_eq!(graph, restored);
    }
}
