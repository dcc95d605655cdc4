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

//! Integration tests for the graph compiler on the headless backend.

mod common;

use anyhow::Result;
use common::{compiler, device, handles, node, scene, window, VERTICES};
use strata_core::math::{Extent2D, Extent3D, Rect2D};
use strata_core::renderer::api::*;
use strata_core::platform::StrataWindow;
use strata_core::renderer::GraphicsDevice;
use strata_data::graph::*;
use strata_data::{Graph, Node, Ref};
use strata_agents::CompileError;
use strata_infra::RecordedCommand;

fn image_node(extent: ImageExtent, usage: ImageUsage) -> ImageNode {
    ImageNode {
        dimension: ImageDimension::D2,
        format: Format::Rgba8Unorm,
        extent,
        mip_levels: 1,
        array_layers: 1,
        samples: 1,
        usage,
    }
}

fn raw_upload(texels: Extent3D, into: &str) -> UploadNode {
    let size = (texels.width * texels.height * 4) as usize;
    UploadNode {
        source: UploadSource::Memory(vec![0xAB; size]),
        destinations: vec![Ref::named(into)],
        size: None,
        dst_offset: 0,
        image_encoding: Some(ImageEncoding::Raw {
            format: Format::Rgba8Unorm,
            extent: texels,
        }),
        target: TransferTarget::default(),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Init
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_init_builds_every_node() -> Result<()> {
    let (backend, mut compiler) = compiler();
    compiler.init(scene())?;
    let device = device(&backend);

    // Per-frame nodes follow the swapchain's three images.
    for id in ["cmd", "in-flight", "image-available", "camera-ubo", "backbuffer", "framebuffer"] {
        assert_eq!(handles(&compiler, id).len(), 3, "{id}");
    }
    assert_eq!(handles(&compiler, "vertices").len(), 1);
    assert_eq!(handles(&compiler, "pipeline").len(), 1);
    assert_eq!(device.live_count(ObjectKind::Swapchain), 1);

    let framebuffer = handles(&compiler, "framebuffer")[0]
        .as_framebuffer()
        .expect("framebuffer handle");
    let descriptor = device.framebuffer_descriptor(framebuffer).expect("live framebuffer");
    assert_eq!(descriptor.extent, Extent2D::new(640, 480));

    let vertices = handles(&compiler, "vertices")[0].as_buffer().expect("buffer handle");
    assert_eq!(device.buffer_contents(vertices).expect("live buffer"), VERTICES.to_vec());
    Ok(())
}

fn buffer_node(size: u64) -> NodeKind {
    NodeKind::Buffer(BufferNode {
        size,
        usage: BufferUsage::STORAGE | BufferUsage::TRANSFER_DST,
        memory: MemoryLocation::DeviceLocal,
    })
}

#[test]
fn test_upload_fills_plain_and_per_frame_destinations() -> Result<()> {
    let bytes: Vec<u8> = (0..128u8).collect();
    let mut graph = scene();
    graph.add(Node::new(buffer_node(128)).with_id("plain"));
    graph.add(Node::new(buffer_node(128)).with_id("mirrored").per_frame());
    graph.add(Node::new(NodeKind::Upload(UploadNode {
        source: UploadSource::Memory(bytes.clone()),
        destinations: vec![Ref::named("plain"), Ref::named("mirrored")],
        size: None,
        dst_offset: 0,
        image_encoding: None,
        target: TransferTarget {
            access: AccessFlags::SHADER_READ,
            stage: PipelineStage::FRAGMENT_SHADER,
            layout: ImageLayout::Undefined,
            queue: None,
        },
    })));

    let (backend, mut compiler) = compiler();
    compiler.init(graph)?;
    let device = device(&backend);

    let plain = handles(&compiler, "plain");
    let mirrored = handles(&compiler, "mirrored");
    assert_eq!(plain.len(), 1);
    assert_eq!(mirrored.len(), 3);
    for handle in plain.iter().chain(&mirrored) {
        let buffer = handle.as_buffer().expect("buffer handle");
        assert_eq!(device.buffer_contents(buffer).as_deref(), Some(bytes.as_slice()));
    }
    Ok(())
}

#[test]
fn test_descriptor_sets_expand_with_their_resources() -> Result<()> {
    let (backend, mut compiler) = compiler();
    compiler.init(scene())?;
    let device = device(&backend);

    let sets = handles(&compiler, "camera-set");
    let buffers = handles(&compiler, "camera-ubo");
    assert_eq!(sets.len(), 3);
    for (set, buffer) in sets.iter().zip(&buffers) {
        let writes = device.descriptor_writes(set.as_descriptor_set().expect("set handle"));
        assert_eq!(writes.len(), 1);
        assert_eq!(
            writes[0].resource,
            DescriptorResource::Buffer {
                buffer: buffer.as_buffer().expect("buffer handle"),
                offset: 0,
                range: None,
            }
        );
    }
    Ok(())
}

#[test]
fn test_contexts_are_recorded_once_per_image() -> Result<()> {
    let (backend, mut compiler) = compiler();
    compiler.init(scene())?;
    let device = device(&backend);

    let framebuffers = handles(&compiler, "framebuffer");
    for (i, cmd) in handles(&compiler, "cmd").iter().enumerate() {
        let cmd = cmd.as_command_buffer().expect("command buffer handle");
        assert_eq!(device.recording_count(cmd), 1);
        let commands = device.recorded_commands(cmd);
        let begin = commands
            .iter()
            .find_map(|command| match command {
                RecordedCommand::BeginRenderPass(info) => Some(info.clone()),
                _ => None,
            })
            .expect("the tree opens a render pass");
        assert_eq!(Some(begin.framebuffer), framebuffers[i].as_framebuffer());
        assert_eq!(begin.area, Rect2D::full(Extent2D::new(640, 480)));
        assert!(commands.iter().any(|c| matches!(c, RecordedCommand::Draw { .. })));
    }
    Ok(())
}

#[test]
fn test_second_init_is_rejected() -> Result<()> {
    let (_backend, mut compiler) = compiler();
    compiler.init(scene())?;
    let err = compiler.init(scene()).unwrap_err();
    assert!(matches!(err, CompileError::AlreadyInitialized));
    Ok(())
}

#[test]
fn test_init_requires_a_device() {
    let (_backend, mut compiler) = compiler();
    let mut graph = Graph::new();
    graph.add(Node::new(NodeKind::Semaphore).with_id("lonely"));
    let err = compiler.init(graph).unwrap_err();
    assert!(matches!(err, CompileError::Invalid { .. }));
    assert!(compiler.compiled().is_none());
}

#[test]
fn test_load_before_init_is_rejected() {
    let (_backend, mut compiler) = compiler();
    assert!(matches!(compiler.load(scene()), Err(CompileError::NotInitialized)));
}

#[test]
fn test_dangling_descriptor_writes_are_skipped() -> Result<()> {
    let (backend, mut compiler) = compiler();
    let mut graph = scene();
    graph.add(
        Node::new(NodeKind::DescriptorSet(DescriptorSetNode {
            pool: Ref::named("descriptors"),
            layout: Ref::named("camera-layout"),
            writes: vec![DescriptorWriteNode {
                binding: 0,
                array_element: 0,
                resource: DescriptorResourceNode::Buffer {
                    buffer: Ref::named("nowhere"),
                    offset: 0,
                    range: None,
                },
            }],
        }))
        .with_id("loose-set"),
    );
    compiler.init(graph)?;

    let set = handles(&compiler, "loose-set")[0]
        .as_descriptor_set()
        .expect("set handle");
    assert!(device(&backend).descriptor_writes(set).is_empty());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────
// Unload and load
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_unload_keeps_only_device_level_ids() -> Result<()> {
    let (backend, mut compiler) = compiler();
    compiler.init(scene())?;
    compiler.unload();
    let device = device(&backend);

    for id in ["gpu", "main", "graphics"] {
        assert!(compiler.ids().contains(id), "{id} survives an unload");
    }
    for id in ["swapchain", "cmd", "pipeline", "camera", "coordinator"] {
        assert!(!compiler.ids().contains(id), "{id} is dropped by an unload");
    }
    assert!(compiler.compiled().is_none());
    assert_eq!(device.live_count(ObjectKind::Pipeline), 0);
    assert_eq!(device.live_count(ObjectKind::Buffer), 0);
    assert_eq!(device.live_count(ObjectKind::Swapchain), 0);
    assert_eq!(device.live_count(ObjectKind::Image), 0);
    assert_eq!(device.live_count(ObjectKind::Framebuffer), 0);
    Ok(())
}

#[test]
fn test_load_reuses_window_device_and_queue() -> Result<()> {
    let (backend, mut compiler) = compiler();
    compiler.init(scene())?;
    let first_window = window(&backend, &compiler);
    let queue = compiler.find("graphics").cloned();
    let gpu = Some(NativeHandle::Device(device(&backend).id()));
    assert_eq!(handles(&compiler, "gpu").first().copied(), gpu);

    compiler.load(scene())?;

    assert_eq!(backend.devices().len(), 1);
    assert_eq!(handles(&compiler, "gpu").first().copied(), gpu);
    assert_eq!(window(&backend, &compiler).id(), first_window.id());
    assert_eq!(compiler.find("graphics").cloned(), queue);
    assert_eq!(handles(&compiler, "cmd").len(), 3);
    assert_eq!(device(&backend).live_count(ObjectKind::Swapchain), 1);
    Ok(())
}

#[test]
fn test_failed_load_leaves_nothing_behind() -> Result<()> {
    let (backend, mut compiler) = compiler();
    compiler.init(scene())?;
    let device = device(&backend);
    device.fail_next(ObjectKind::Pipeline, 1);

    let err = compiler.load(scene()).unwrap_err();
    assert!(matches!(err, CompileError::Creation { .. }));
    assert!(err.node().is_some_and(|node| node.contains("'pipeline'")), "{err}");
    assert!(compiler.compiled().is_none());
    assert!(!compiler.ids().contains("vertices"));
    for kind in [
        ObjectKind::Pipeline,
        ObjectKind::Buffer,
        ObjectKind::Swapchain,
        ObjectKind::DescriptorSet,
        ObjectKind::RenderPass,
    ] {
        assert_eq!(device.live_count(kind), 0, "{kind:?}");
    }

    // The device survives and a clean load succeeds.
    compiler.load(scene())?;
    assert_eq!(handles(&compiler, "pipeline").len(), 1);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────
// Resize
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_resize_follows_the_new_surface() -> Result<()> {
    let (backend, mut compiler) = compiler();
    compiler.init(scene())?;
    let device = device(&backend);
    let old_cmd = handles(&compiler, "cmd");

    device.set_swapchain_image_count(Some(2));
    window(&backend, &compiler).resize(800, 600);
    compiler.resize(node(&compiler, "swapchain"))?;

    let cmd = handles(&compiler, "cmd");
    assert_eq!(cmd.len(), 2);
    assert!(old_cmd.iter().all(|handle| !device.is_alive(*handle)));
    assert_eq!(handles(&compiler, "camera-set").len(), 2);
    for framebuffer in handles(&compiler, "framebuffer") {
        let framebuffer = framebuffer.as_framebuffer().expect("framebuffer handle");
        let descriptor = device.framebuffer_descriptor(framebuffer).expect("live framebuffer");
        assert_eq!(descriptor.extent, Extent2D::new(800, 600));
    }
    for handle in &cmd {
        let cmd = handle.as_command_buffer().expect("command buffer handle");
        assert_eq!(device.recording_count(cmd), 1);
    }

    // Nodes that do not depend on the swapchain are untouched.
    let vertices = handles(&compiler, "vertices")[0].as_buffer().expect("buffer handle");
    assert_eq!(device.buffer_contents(vertices).expect("live buffer"), VERTICES.to_vec());

    let compiled = compiler.compiled().expect("still compiled");
    assert_eq!(compiled.coordinators()[0].frames_in_flight, 2);
    let state = compiled.swapchain(node(&compiler, "swapchain")).expect("swapchain state");
    assert_eq!(state.extent, Extent2D::new(800, 600));
    assert_eq!(device.swapchain_recreations(state.swapchain), 1);
    Ok(())
}

#[test]
fn test_frames_in_flight_never_exceed_the_image_count() -> Result<()> {
    let (backend, mut compiler) = compiler();
    compiler.init(scene())?;
    device(&backend).set_swapchain_image_count(Some(1));
    compiler.resize(node(&compiler, "swapchain"))?;

    let compiled = compiler.compiled().expect("still compiled");
    assert_eq!(compiled.coordinators()[0].frames_in_flight, 1);
    assert_eq!(handles(&compiler, "cmd").len(), 1);
    Ok(())
}

#[test]
fn test_relative_images_follow_the_swapchain() -> Result<()> {
    let (backend, mut compiler) = compiler();
    let mut graph = scene();
    graph.add(
        Node::new(NodeKind::Image(image_node(
            ImageExtent::Relative {
                swapchain: Ref::named("swapchain"),
                width: 0.5,
                height: 0.0,
            },
            ImageUsage::COLOR_ATTACHMENT,
        )))
        .with_id("half-width"),
    );
    compiler.init(graph)?;
    let device = device(&backend);
    let extent_of = |compiler: &strata_agents::GraphCompiler| {
        let image = handles(compiler, "half-width")[0].as_image().expect("image handle");
        device.image_descriptor(image).expect("live image").extent
    };

    assert_eq!(extent_of(&compiler), Extent3D::new(320, 480, 1));
    window(&backend, &compiler).resize(800, 600);
    compiler.resize(node(&compiler, "swapchain"))?;
    assert_eq!(extent_of(&compiler), Extent3D::new(400, 600, 1));
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────
// Uploads
// ─────────────────────────────────────────────────────────────────────

fn upload_graph(image: ImageNode, texels: Extent3D) -> Graph {
    let mut graph = Graph::new();
    graph.add(Node::new(NodeKind::Device(DeviceNode { validation: false })).with_id("gpu"));
    graph.add(
        Node::new(NodeKind::Queue(QueueNode {
            capabilities: QueueCapabilities::GRAPHICS | QueueCapabilities::TRANSFER,
            family: None,
        }))
        .with_id("graphics"),
    );
    graph.add(Node::new(NodeKind::Image(image)).with_id("texture"));
    graph.add(Node::new(NodeKind::Upload(raw_upload(texels, "texture"))));
    graph.add(
        Node::new(NodeKind::ImageView(ImageViewNode {
            source: ViewSource::Image(Ref::named("texture")),
            view_type: ImageViewType::D2,
            format: None,
            range: ImageSubresourceRange::color(1, 1),
        }))
        .with_id("texture-view"),
    );
    graph
}

#[test]
fn test_images_can_take_their_extent_from_the_upload() -> Result<()> {
    let (backend, mut compiler) = compiler();
    let texels = Extent3D::new(2, 2, 1);
    compiler.init(upload_graph(
        image_node(ImageExtent::FromSource, ImageUsage::SAMPLED | ImageUsage::TRANSFER_DST),
        texels,
    ))?;
    let device = device(&backend);

    let image = handles(&compiler, "texture")[0].as_image().expect("image handle");
    assert_eq!(device.image_descriptor(image).expect("live image").extent, texels);
    assert_eq!(device.image_layout(image), Some(ImageLayout::ShaderReadOnly));
    assert_eq!(device.image_subresource(image, 0, 0), Some(vec![0xAB; 16]));

    let view = handles(&compiler, "texture-view")[0].as_image_view().expect("view handle");
    assert_eq!(device.image_view_target(view), Some(image));
    Ok(())
}

#[test]
fn test_upload_contract_violations_are_fatal() -> Result<()> {
    let (backend, mut compiler) = compiler();
    let err = compiler
        .init(upload_graph(
            image_node(
                ImageExtent::Absolute(Extent3D::new(4, 4, 1)),
                ImageUsage::SAMPLED | ImageUsage::TRANSFER_DST,
            ),
            Extent3D::new(8, 8, 1),
        ))
        .unwrap_err();

    assert!(err.is_contract_violation(), "{err}");
    assert!(compiler.compiled().is_none());
    let device = device(&backend);
    assert_eq!(device.live_count(ObjectKind::Image), 0);
    assert_eq!(device.live_count(ObjectKind::Buffer), 0);
    Ok(())
}
