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

//! Integration tests for command context recording on the headless backend.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use strata_core::math::{Extent2D, Rect2D, Region};
use strata_core::renderer::api::*;
use strata_core::renderer::{DeviceDescriptor, GraphicsDevice, RenderBackend};
use strata_data::graph::{BufferBarrierNode, CommandNode};
use strata_data::Ref;
use strata_infra::{HeadlessBackend, HeadlessDevice, RecordedCommand};
use strata_lanes::{Bindings, CommandContext};

/// Helper: resolves named refs from a map, per-frame when several handles are listed.
struct TestBindings {
    objects: HashMap<String, Vec<NativeHandle>>,
    surface: Extent2D,
    framebuffers: HashMap<FramebufferId, Extent2D>,
}

impl TestBindings {
    fn with(mut self, id: &str, handles: Vec<NativeHandle>) -> Self {
        self.objects.insert(id.to_string(), handles);
        self
    }
}

impl Bindings for TestBindings {
    fn resolve(&self, reference: &Ref, index: usize) -> Option<NativeHandle> {
        let Ref::Named(id) = reference else {
            return None;
        };
        match self.objects.get(id)?.as_slice() {
            [single] => Some(*single),
            handles => handles.get(index).copied(),
        }
    }

    fn surface_extent(&self) -> Extent2D {
        self.surface
    }

    fn framebuffer_extent(&self, framebuffer: FramebufferId) -> Option<Extent2D> {
        self.framebuffers.get(&framebuffer).copied()
    }
}

fn setup(slots: usize) -> Result<(HeadlessBackend, Arc<HeadlessDevice>, TestBindings, Vec<CommandBufferId>)> {
    let _ = env_logger::builder().is_test(true).try_init();
    let backend = HeadlessBackend::new();
    backend.create_device(&DeviceDescriptor::default())?;
    let device = backend.device().expect("device is retained");
    let queue = device.get_queue(&QueueDescriptor {
        label: None,
        capabilities: QueueCapabilities::GRAPHICS,
        family: None,
    })?;
    let pool = device.create_command_pool(&CommandPoolDescriptor {
        label: Some("frame-commands".into()),
        queue,
        transient: false,
        resettable: true,
    })?;
    let mut buffers = Vec::new();
    for _ in 0..slots {
        buffers.push(device.allocate_command_buffer(pool, CommandBufferLevel::Primary)?);
    }
    let bindings = TestBindings {
        objects: HashMap::new(),
        surface: Extent2D::new(1280, 720),
        framebuffers: HashMap::new(),
    }
    .with(
        "commands",
        buffers.iter().map(|b| NativeHandle::CommandBuffer(*b)).collect(),
    );
    Ok((backend, device, bindings, buffers))
}

fn draw() -> CommandNode {
    CommandNode::Draw {
        vertex_count: 3,
        instance_count: 1,
        first_vertex: 0,
        first_instance: 0,
    }
}

// ─────────────────────────────────────────────────────────────────────
// Per-frame resolution
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_per_frame_leaves_bind_the_slot_instance() -> Result<()> {
    let (_backend, device, bindings, buffers) = setup(3)?;
    let bindings = bindings
        .with(
            "uniforms",
            (10..13).map(|i| NativeHandle::DescriptorSet(DescriptorSetId(i))).collect(),
        )
        .with("layout", vec![NativeHandle::PipelineLayout(PipelineLayoutId(1))]);
    let tree = Arc::new(CommandNode::BindDescriptorSets {
        bind_point: PipelineBindPoint::Graphics,
        layout: Ref::named("layout"),
        first_set: 0,
        sets: vec![Ref::named("uniforms")],
        dynamic_offsets: vec![],
    });

    let mut context = CommandContext::new("per-frame", tree, Ref::named("commands"), 3);
    context.build(device.as_ref(), &bindings)?;

    for (slot, buffer) in buffers.iter().enumerate() {
        assert_eq!(
            device.recorded_commands(*buffer),
            vec![RecordedCommand::BindDescriptorSets {
                bind_point: PipelineBindPoint::Graphics,
                layout: PipelineLayoutId(1),
                first_set: 0,
                sets: vec![DescriptorSetId(10 + slot as u64)],
                dynamic_offsets: vec![],
            }]
        );
    }
    Ok(())
}

#[test]
fn test_unresolved_leaves_are_skipped() -> Result<()> {
    let (_backend, device, bindings, buffers) = setup(1)?;
    let tree = Arc::new(CommandNode::List(vec![
        CommandNode::BindPipeline {
            bind_point: PipelineBindPoint::Graphics,
            pipeline: Ref::named("missing-pipeline"),
        },
        CommandNode::Barrier {
            src_stage: PipelineStage::TRANSFER,
            dst_stage: PipelineStage::VERTEX_INPUT,
            buffers: vec![BufferBarrierNode {
                buffer: Ref::named("missing-buffer"),
                src_access: AccessFlags::TRANSFER_WRITE,
                dst_access: AccessFlags::VERTEX_ATTRIBUTE_READ,
                src_queue_family: None,
                dst_queue_family: None,
            }],
            images: vec![],
        },
        draw(),
    ]));

    let mut context = CommandContext::new("partial", tree, Ref::named("commands"), 1);
    context.build(device.as_ref(), &bindings)?;

    assert_eq!(
        device.recorded_commands(buffers[0]),
        vec![RecordedCommand::Draw {
            vertex_count: 3,
            instance_count: 1,
            first_vertex: 0,
            first_instance: 0,
        }]
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────
// Fractional regions
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_regions_resolve_against_the_current_extent() -> Result<()> {
    let (_backend, device, bindings, buffers) = setup(1)?;
    let mut bindings = bindings
        .with("pass", vec![NativeHandle::RenderPass(RenderPassId(1))])
        .with("target", vec![NativeHandle::Framebuffer(FramebufferId(2))]);
    bindings
        .framebuffers
        .insert(FramebufferId(2), Extent2D::new(400, 200));

    let half = Region::new(0.0, 0.0, 0.5, 0.5);
    let tree = Arc::new(CommandNode::List(vec![
        CommandNode::SetScissor(half),
        CommandNode::RenderPass {
            render_pass: Ref::named("pass"),
            framebuffer: Ref::named("target"),
            area: Region::FULL,
            clear_values: vec![],
            subpasses: vec![vec![CommandNode::SetScissor(half)], vec![draw()]],
        },
    ]));

    let mut context = CommandContext::new("regions", tree, Ref::named("commands"), 1);
    context.build(device.as_ref(), &bindings)?;

    let commands = device.recorded_commands(buffers[0]);
    assert_eq!(
        commands[0],
        RecordedCommand::SetScissor(Rect2D {
            x: 0,
            y: 0,
            extent: Extent2D::new(640, 360),
        })
    );
    match &commands[1] {
        RecordedCommand::BeginRenderPass(info) => {
            assert_eq!(info.area, Rect2D::full(Extent2D::new(400, 200)))
        }
        other => panic!("expected a render pass, got {other:?}"),
    }
    assert_eq!(
        commands[2],
        RecordedCommand::SetScissor(Rect2D {
            x: 0,
            y: 0,
            extent: Extent2D::new(200, 100),
        })
    );
    assert_eq!(commands[3], RecordedCommand::NextSubpass);
    assert_eq!(commands.last(), Some(&RecordedCommand::EndRenderPass));
    Ok(())
}

#[test]
fn test_rebuild_picks_up_a_new_surface_extent() -> Result<()> {
    let (_backend, device, mut bindings, buffers) = setup(2)?;
    let tree = Arc::new(CommandNode::SetViewport {
        region: Region::FULL,
        min_depth: 0.0,
        max_depth: 1.0,
    });
    let mut context = CommandContext::new("viewport", tree, Ref::named("commands"), 2);
    context.build(device.as_ref(), &bindings)?;

    bindings.surface = Extent2D::new(320, 240);
    assert!(!context.update(device.as_ref(), &bindings, 0)?);
    context.rebuild();
    assert!(context.update(device.as_ref(), &bindings, 0)?);

    let viewport = |buffer: CommandBufferId| match device.recorded_commands(buffer).first() {
        Some(RecordedCommand::SetViewport(v)) => (v.width, v.height),
        other => panic!("expected a viewport, got {other:?}"),
    };
    assert_eq!(viewport(buffers[0]), (320.0, 240.0));
    assert_eq!(viewport(buffers[1]), (1280.0, 720.0));
    assert!(context.is_dirty(1));
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────
// Structure
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_groups_wrap_their_children_in_debug_labels() -> Result<()> {
    let (_backend, device, bindings, buffers) = setup(1)?;
    let tree = Arc::new(CommandNode::Group {
        label: "shadows".into(),
        children: vec![CommandNode::Dispatch { x: 8, y: 8, z: 1 }],
    });
    let mut context = CommandContext::new("grouped", tree, Ref::named("commands"), 1);
    context.build(device.as_ref(), &bindings)?;

    assert_eq!(
        device.recorded_commands(buffers[0]),
        vec![
            RecordedCommand::BeginDebugGroup("shadows".into()),
            RecordedCommand::Dispatch { x: 8, y: 8, z: 1 },
            RecordedCommand::EndDebugGroup,
        ]
    );
    Ok(())
}

#[test]
fn test_rerecording_replaces_the_previous_commands() -> Result<()> {
    let (_backend, device, bindings, buffers) = setup(1)?;
    let mut context = CommandContext::new("twice", Arc::new(draw()), Ref::named("commands"), 1);
    context.build(device.as_ref(), &bindings)?;
    context.build(device.as_ref(), &bindings)?;

    assert_eq!(device.recorded_commands(buffers[0]).len(), 1);
    assert_eq!(device.recording_count(buffers[0]), 2);
    Ok(())
}
