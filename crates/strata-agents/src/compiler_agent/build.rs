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

//! Per-node creation: device objects, host objects and uploads.

use super::agent::GraphCompiler;
use super::compiled::{
    CameraEntry, CompiledGraph, ContextEntry, CoordinatorEntry, Resolver, SwapchainState,
};
use super::error::CompileError;
use std::collections::HashSet;
use std::sync::Arc;
use strata_core::math::{resolve_size, Extent3D};
use strata_core::renderer::api::{
    CommandBufferLevel, CommandPoolDescriptor, ComputePipelineDescriptor, DescriptorResource,
    DescriptorSetDescriptor, DescriptorWrite, FramebufferDescriptor, GraphicsPipelineDescriptor,
    ImageDescriptor, ImageViewDescriptor, NativeHandle, PipelineLayoutDescriptor,
    ShaderStageDescriptor, SwapchainDescriptor,
};
use strata_core::renderer::{GraphicsDevice, ResourceError};
use strata_data::graph::{
    DescriptorResourceNode, DescriptorWriteNode, ImageExtent, ShaderStageNode, UploadNode,
    ViewSource,
};
use strata_data::{Instance, Node, NodeCategory, NodeKind, NodeRef, Ref};
use strata_lanes::upload_lane::{ConsumerState, UploadDestination, UploadTask};
use strata_lanes::{CommandContext, UploadHandle};

/// An upload submitted during a compile and not yet waited on.
pub(crate) struct PendingUpload {
    node: NodeRef,
    label: String,
    handle: UploadHandle,
    /// One entry per `NewImage` destination: the image node it fills.
    creates: Vec<NodeRef>,
}

/// State shared by the nodes of one compile.
#[derive(Default)]
pub(crate) struct Session {
    pub(crate) upload_workers: Option<usize>,
    pub(crate) claimed_windows: HashSet<usize>,
    pub(crate) claimed_queues: HashSet<usize>,
    pub(crate) pending: Vec<PendingUpload>,
}

fn creation(node: &str) -> impl FnOnce(ResourceError) -> CompileError + '_ {
    move |source| CompileError::Creation {
        node: node.to_string(),
        source,
    }
}

fn is_source_image(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Image(image) if matches!(image.extent, ImageExtent::FromSource)
    )
}

impl GraphCompiler {
    /// Builds `nodes` in the given order, then finishes their uploads and
    /// writes their descriptor sets.
    ///
    /// Uploads creating images are waited on before the first node that
    /// may depend on those images; every other upload runs alongside the
    /// rest of the build.
    pub(crate) fn build_nodes(
        &mut self,
        compiled: &mut CompiledGraph,
        session: &mut Session,
        nodes: &[NodeRef],
    ) -> Result<(), CompileError> {
        for &node in nodes {
            let category = compiled.graph().node(node).map(|n| n.kind.category());
            if category > Some(NodeCategory::Upload) {
                self.finish_uploads(compiled, session, true)?;
            }
            self.build_node(compiled, session, node)?;
        }
        self.finish_uploads(compiled, session, false)?;

        for &node in nodes {
            let orphan = compiled
                .graph()
                .node(node)
                .is_some_and(|n| is_source_image(&n.kind))
                && compiled.instance(node).is_none()
                && compiled.instance_count(node) > 0;
            if orphan {
                return Err(CompileError::Invalid {
                    node: compiled.label(node),
                    reason: "no upload creates this image".to_string(),
                });
            }
        }

        self.write_descriptor_sets(compiled, nodes)
    }

    fn build_node(
        &mut self,
        compiled: &mut CompiledGraph,
        session: &mut Session,
        node_ref: NodeRef,
    ) -> Result<(), CompileError> {
        let Some(node) = compiled.graph().node(node_ref).cloned() else {
            return Ok(());
        };
        let label = compiled.label(node_ref);
        let per_frame = compiled.layout().is_per_frame(node_ref);

        let instance = match &node.kind {
            NodeKind::Renderer(renderer) => {
                log::info!("Compiling renderer '{}'", renderer.name);
                session.upload_workers = renderer.upload_workers;
                None
            }
            NodeKind::Window(window) => Some(self.bind_window(session, &node, window, &label)?),
            NodeKind::Device(device) => Some(self.bind_device(session, &node, device, &label)?),
            NodeKind::Queue(queue) => Some(self.bind_queue(session, &node, queue, &label)?),
            NodeKind::Swapchain(_) => Some(self.build_swapchain(compiled, node_ref, &node, &label)?),
            NodeKind::Frame(_) => None,
            NodeKind::Upload(upload) => {
                self.submit_upload(compiled, session, node_ref, upload, &label)?;
                None
            }
            NodeKind::CommandTree(tree) => {
                compiled.trees.insert(node_ref, Arc::new(tree.clone()));
                None
            }
            kind if is_source_image(kind) => None,
            NodeKind::Camera(camera) => {
                compiled.cameras.push(CameraEntry {
                    node: node_ref,
                    camera: camera.clone(),
                });
                Some(Instance::Single(NativeHandle::Camera(
                    compiled.cameras.len() as u32 - 1,
                )))
            }
            NodeKind::CommandContext(context) => {
                let tree = compiled
                    .graph()
                    .resolve(&context.tree)
                    .and_then(|tree| compiled.trees.get(&tree))
                    .cloned()
                    .ok_or_else(|| CompileError::Unresolved {
                        node: label.clone(),
                        reference: context.tree.to_string(),
                        expected: "command tree",
                    })?;
                let slots = self.slot_count(compiled, &context.command_buffer);
                if slots == 0 {
                    return Err(CompileError::Unresolved {
                        node: label,
                        reference: context.command_buffer.to_string(),
                        expected: "command buffer",
                    });
                }
                compiled.contexts.push(ContextEntry {
                    node: node_ref,
                    context: CommandContext::new(
                        label.clone(),
                        tree,
                        context.command_buffer.clone(),
                        slots,
                    ),
                });
                Some(Instance::Single(NativeHandle::CommandContext(
                    compiled.contexts.len() as u32 - 1,
                )))
            }
            NodeKind::QueueSubmit(submit) => {
                compiled.submits.push(submit.clone());
                Some(Instance::Single(NativeHandle::QueueSubmit(
                    compiled.submits.len() as u32 - 1,
                )))
            }
            NodeKind::Present(present) => {
                compiled.presents.push(present.clone());
                Some(Instance::Single(NativeHandle::Present(
                    compiled.presents.len() as u32 - 1,
                )))
            }
            NodeKind::FrameCoordinator(coordinator) => {
                let Some((swapchain, requested)) = frame_of(compiled, &coordinator.frame) else {
                    return Err(CompileError::Unresolved {
                        node: label,
                        reference: coordinator.frame.to_string(),
                        expected: "frame bound to a swapchain",
                    });
                };
                let frames_in_flight = self.frames_in_flight(compiled, swapchain, requested);
                compiled.coordinators.push(CoordinatorEntry {
                    node: node_ref,
                    swapchain,
                    frames_in_flight,
                    desc: coordinator.clone(),
                });
                Some(Instance::Single(NativeHandle::FrameCoordinator(
                    compiled.coordinators.len() as u32 - 1,
                )))
            }
            _ => {
                let device = self.device()?;
                let count = compiled.instance_count(node_ref);
                let mut handles = Vec::with_capacity(count);
                for index in 0..count {
                    match self.create_object(device.as_ref(), compiled, &node, &label, index) {
                        Ok(handle) => handles.push(handle),
                        Err(err) => {
                            for handle in handles {
                                forget(compiled, handle);
                                if let Err(e) = device.destroy(handle) {
                                    log::warn!("Failed to destroy {handle:?} of {label}: {e}");
                                }
                            }
                            return Err(err);
                        }
                    }
                }
                Some(if per_frame {
                    Instance::PerFrame(handles)
                } else {
                    match handles.first() {
                        Some(handle) => Instance::Single(*handle),
                        None => Instance::PerFrame(handles),
                    }
                })
            }
        };

        if let Some(instance) = instance {
            log::debug!("Built {label} ({} instance(s))", instance.len());
            self.publish(compiled, node_ref, &node, instance);
        }
        Ok(())
    }

    /// Stores an instance and registers the node's id.
    fn publish(&mut self, compiled: &mut CompiledGraph, node_ref: NodeRef, node: &Node, instance: Instance) {
        if let Some(id) = &node.id {
            self.ids.set(id.clone(), instance.clone());
        }
        compiled.instances[node_ref.index()] = Some(instance);
    }

    /// Frame slots of a coordinator presenting to `swapchain`: the frame's
    /// request (or the engine default) clamped to the image count.
    pub(crate) fn frames_in_flight(
        &self,
        compiled: &CompiledGraph,
        swapchain: NodeRef,
        requested: Option<u32>,
    ) -> u32 {
        let images = compiled
            .swapchain(swapchain)
            .map_or(1, |state| state.images.len().max(1)) as u32;
        requested
            .unwrap_or(self.settings.frames_in_flight)
            .clamp(1, images)
    }

    /// Number of slots of a command context recording into `command_buffer`.
    pub(crate) fn slot_count(&self, compiled: &CompiledGraph, command_buffer: &Ref) -> usize {
        if let Some(node) = compiled.graph().resolve(command_buffer) {
            return compiled.instance(node).map_or(0, Instance::len);
        }
        match command_buffer {
            Ref::Named(name) => self.ids.find(name).map_or(0, Instance::len),
            Ref::Node(_) => 0,
        }
    }

    fn require<T>(
        &self,
        compiled: &CompiledGraph,
        node: &str,
        reference: &Ref,
        index: usize,
        pick: fn(&NativeHandle) -> Option<T>,
        expected: &'static str,
    ) -> Result<T, CompileError> {
        compiled
            .resolve(&self.ids, reference, index)
            .and_then(|handle| pick(&handle))
            .ok_or_else(|| CompileError::Unresolved {
                node: node.to_string(),
                reference: reference.to_string(),
                expected,
            })
    }

    fn build_swapchain(
        &mut self,
        compiled: &mut CompiledGraph,
        node_ref: NodeRef,
        node: &Node,
        label: &str,
    ) -> Result<Instance, CompileError> {
        let NodeKind::Swapchain(desc) = &node.kind else {
            return Err(CompileError::Invalid {
                node: label.to_string(),
                reason: "not a swapchain".to_string(),
            });
        };
        let device = self.device()?;
        let window = self.require(compiled, label, &desc.window, 0, NativeHandle::as_window, "window")?;
        let swapchain = device
            .create_swapchain(&SwapchainDescriptor {
                label: node.id.clone(),
                window,
                format: desc.format,
                min_image_count: desc.min_image_count,
                present_mode: desc.present_mode,
            })
            .map_err(creation(label))?;

        let state = device.swapchain_extent(swapchain).and_then(|extent| {
            Ok(SwapchainState {
                swapchain,
                window,
                extent,
                images: device.swapchain_images(swapchain)?,
            })
        });
        match state {
            Ok(state) => {
                log::info!(
                    "{label}: {} image(s) of {}x{}",
                    state.images.len(),
                    state.extent.width,
                    state.extent.height
                );
                compiled.swapchains.insert(node_ref, state);
                Ok(Instance::Single(NativeHandle::Swapchain(swapchain)))
            }
            Err(source) => {
                if let Err(e) = device.destroy(NativeHandle::Swapchain(swapchain)) {
                    log::warn!("Failed to destroy the swapchain of {label}: {e}");
                }
                Err(CompileError::Creation {
                    node: label.to_string(),
                    source,
                })
            }
        }
    }

    /// Creates instance `index` of a device object node.
    fn create_object(
        &self,
        device: &dyn GraphicsDevice,
        compiled: &mut CompiledGraph,
        node: &Node,
        label: &str,
        index: usize,
    ) -> Result<NativeHandle, CompileError> {
        let name = node.id.clone();
        let handle = match &node.kind {
            NodeKind::CommandPool(pool) => {
                let queue = self.require(compiled, label, &pool.queue, index, NativeHandle::as_queue, "queue")?;
                NativeHandle::CommandPool(
                    device
                        .create_command_pool(&CommandPoolDescriptor {
                            label: name,
                            queue,
                            transient: pool.transient,
                            resettable: pool.resettable,
                        })
                        .map_err(creation(label))?,
                )
            }
            NodeKind::CommandBuffer(buffer) => {
                let pool = self.require(
                    compiled,
                    label,
                    &buffer.pool,
                    index,
                    NativeHandle::as_command_pool,
                    "command pool",
                )?;
                if buffer.level != CommandBufferLevel::Primary {
                    log::debug!("{label}: allocating a secondary command buffer");
                }
                NativeHandle::CommandBuffer(
                    device
                        .allocate_command_buffer(pool, buffer.level)
                        .map_err(creation(label))?,
                )
            }
            NodeKind::Fence(fence) => {
                NativeHandle::Fence(device.create_fence(fence.signaled).map_err(creation(label))?)
            }
            NodeKind::Buffer(buffer) => NativeHandle::Buffer(
                device
                    .create_buffer(&strata_core::renderer::api::BufferDescriptor {
                        label: name,
                        size: buffer.size,
                        usage: buffer.usage,
                        memory: buffer.memory,
                    })
                    .map_err(creation(label))?,
            ),
            NodeKind::Image(image) => {
                let extent = match &image.extent {
                    ImageExtent::Absolute(extent) => *extent,
                    ImageExtent::Relative {
                        swapchain,
                        width,
                        height,
                    } => {
                        let surface = compiled
                            .graph()
                            .resolve(swapchain)
                            .and_then(|node| compiled.swapchain(node))
                            .map(|state| state.extent)
                            .ok_or_else(|| CompileError::Unresolved {
                                node: label.to_string(),
                                reference: swapchain.to_string(),
                                expected: "swapchain",
                            })?;
                        Extent3D::new(
                            resolve_size(*width, surface.width).max(1),
                            resolve_size(*height, surface.height).max(1),
                            1,
                        )
                    }
                    ImageExtent::FromSource => {
                        return Err(CompileError::Invalid {
                            node: label.to_string(),
                            reason: "images sized by their source are created by an upload".to_string(),
                        })
                    }
                };
                let descriptor = ImageDescriptor {
                    label: name,
                    dimension: image.dimension,
                    format: image.format,
                    extent,
                    mip_levels: image.mip_levels,
                    array_layers: image.array_layers,
                    samples: image.samples,
                    usage: image.usage,
                };
                let id = device.create_image(&descriptor).map_err(creation(label))?;
                compiled.image_descriptors.insert(id, descriptor);
                NativeHandle::Image(id)
            }
            NodeKind::ImageView(view) => {
                let (image, extent) = match &view.source {
                    ViewSource::Image(image) => {
                        let image = self.require(compiled, label, image, index, NativeHandle::as_image, "image")?;
                        let extent = compiled
                            .image_descriptors
                            .get(&image)
                            .map(|desc| desc.extent.to_2d());
                        (image, extent)
                    }
                    ViewSource::Swapchain(swapchain) => {
                        let state = compiled
                            .graph()
                            .resolve(swapchain)
                            .and_then(|node| compiled.swapchain(node))
                            .ok_or_else(|| CompileError::Unresolved {
                                node: label.to_string(),
                                reference: swapchain.to_string(),
                                expected: "swapchain",
                            })?;
                        let image = state.images.get(index).copied().ok_or_else(|| {
                            CompileError::Invalid {
                                node: label.to_string(),
                                reason: format!("the swapchain has no image {index}"),
                            }
                        })?;
                        (image, Some(state.extent))
                    }
                };
                let id = device
                    .create_image_view(&ImageViewDescriptor {
                        label: name,
                        image,
                        view_type: view.view_type,
                        format: view.format,
                        range: view.range,
                    })
                    .map_err(creation(label))?;
                if let Some(extent) = extent {
                    compiled.view_extents.insert(id, extent);
                }
                NativeHandle::ImageView(id)
            }
            NodeKind::Sampler(desc) => {
                NativeHandle::Sampler(device.create_sampler(desc).map_err(creation(label))?)
            }
            NodeKind::DescriptorSetLayout(desc) => NativeHandle::DescriptorSetLayout(
                device
                    .create_descriptor_set_layout(desc)
                    .map_err(creation(label))?,
            ),
            NodeKind::DescriptorPool(desc) => NativeHandle::DescriptorPool(
                device.create_descriptor_pool(desc).map_err(creation(label))?,
            ),
            NodeKind::DescriptorSet(set) => {
                let pool = self.require(
                    compiled,
                    label,
                    &set.pool,
                    index,
                    NativeHandle::as_descriptor_pool,
                    "descriptor pool",
                )?;
                let layout = self.require(
                    compiled,
                    label,
                    &set.layout,
                    index,
                    NativeHandle::as_descriptor_set_layout,
                    "descriptor set layout",
                )?;
                NativeHandle::DescriptorSet(
                    device
                        .allocate_descriptor_set(&DescriptorSetDescriptor {
                            label: name,
                            pool,
                            layout,
                        })
                        .map_err(creation(label))?,
                )
            }
            NodeKind::RenderPass(desc) => {
                NativeHandle::RenderPass(device.create_render_pass(desc).map_err(creation(label))?)
            }
            NodeKind::ShaderModule(desc) => NativeHandle::ShaderModule(
                device.create_shader_module(desc).map_err(creation(label))?,
            ),
            NodeKind::PipelineLayout(layout) => {
                let set_layouts = layout
                    .set_layouts
                    .iter()
                    .map(|set| {
                        self.require(
                            compiled,
                            label,
                            set,
                            index,
                            NativeHandle::as_descriptor_set_layout,
                            "descriptor set layout",
                        )
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                NativeHandle::PipelineLayout(
                    device
                        .create_pipeline_layout(&PipelineLayoutDescriptor {
                            label: name,
                            set_layouts,
                            push_constants: layout.push_constants.clone(),
                        })
                        .map_err(creation(label))?,
                )
            }
            NodeKind::GraphicsPipeline(pipeline) => {
                let layout = self.require(
                    compiled,
                    label,
                    &pipeline.layout,
                    index,
                    NativeHandle::as_pipeline_layout,
                    "pipeline layout",
                )?;
                let render_pass = self.require(
                    compiled,
                    label,
                    &pipeline.render_pass,
                    index,
                    NativeHandle::as_render_pass,
                    "render pass",
                )?;
                let stages = pipeline
                    .stages
                    .iter()
                    .map(|stage| self.shader_stage(compiled, label, stage, index))
                    .collect::<Result<Vec<_>, _>>()?;
                NativeHandle::Pipeline(
                    device
                        .create_graphics_pipeline(&GraphicsPipelineDescriptor {
                            label: name,
                            layout,
                            render_pass,
                            subpass: pipeline.subpass,
                            stages,
                            raster: pipeline.raster.clone(),
                        })
                        .map_err(creation(label))?,
                )
            }
            NodeKind::ComputePipeline(pipeline) => {
                let layout = self.require(
                    compiled,
                    label,
                    &pipeline.layout,
                    index,
                    NativeHandle::as_pipeline_layout,
                    "pipeline layout",
                )?;
                let stage = self.shader_stage(compiled, label, &pipeline.stage, index)?;
                NativeHandle::Pipeline(
                    device
                        .create_compute_pipeline(&ComputePipelineDescriptor {
                            label: name,
                            layout,
                            stage,
                        })
                        .map_err(creation(label))?,
                )
            }
            NodeKind::Semaphore => {
                NativeHandle::Semaphore(device.create_semaphore().map_err(creation(label))?)
            }
            NodeKind::Event => NativeHandle::Event(device.create_event().map_err(creation(label))?),
            NodeKind::Framebuffer(framebuffer) => {
                let render_pass = self.require(
                    compiled,
                    label,
                    &framebuffer.render_pass,
                    index,
                    NativeHandle::as_render_pass,
                    "render pass",
                )?;
                let attachments = framebuffer
                    .attachments
                    .iter()
                    .map(|view| {
                        self.require(compiled, label, view, index, NativeHandle::as_image_view, "image view")
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let extent = framebuffer
                    .extent
                    .or_else(|| {
                        attachments
                            .first()
                            .and_then(|view| compiled.view_extents.get(view).copied())
                    })
                    .ok_or_else(|| CompileError::Invalid {
                        node: label.to_string(),
                        reason: "no extent and no attachment to take it from".to_string(),
                    })?;
                let id = device
                    .create_framebuffer(&FramebufferDescriptor {
                        label: name,
                        render_pass,
                        attachments,
                        extent,
                        layers: framebuffer.layers,
                    })
                    .map_err(creation(label))?;
                compiled.framebuffer_extents.insert(id, extent);
                NativeHandle::Framebuffer(id)
            }
            NodeKind::QueryPool(desc) => {
                NativeHandle::QueryPool(device.create_query_pool(desc).map_err(creation(label))?)
            }
            _ => {
                return Err(CompileError::Invalid {
                    node: label.to_string(),
                    reason: "not a device object".to_string(),
                })
            }
        };
        Ok(handle)
    }

    fn shader_stage(
        &self,
        compiled: &CompiledGraph,
        label: &str,
        stage: &ShaderStageNode,
        index: usize,
    ) -> Result<ShaderStageDescriptor, CompileError> {
        Ok(ShaderStageDescriptor {
            module: self.require(
                compiled,
                label,
                &stage.module,
                index,
                NativeHandle::as_shader_module,
                "shader module",
            )?,
            stage: stage.stage,
            entry_point: stage.entry_point.clone(),
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Uploads
    // ─────────────────────────────────────────────────────────────────────

    fn submit_upload(
        &mut self,
        compiled: &CompiledGraph,
        session: &mut Session,
        node_ref: NodeRef,
        upload: &UploadNode,
        label: &str,
    ) -> Result<(), CompileError> {
        let device = self.device()?;
        let mut destinations = Vec::new();
        let mut creates = Vec::new();

        for destination in &upload.destinations {
            let target = compiled.graph().resolve(destination);
            let kind = target
                .and_then(|target| compiled.graph().node(target))
                .map(|node| (&node.kind, node.id.clone()));
            let count = target.map_or(0, |target| compiled.instance_count(target));
            match (target, kind) {
                (Some(_), Some((NodeKind::Buffer(buffer), _))) => {
                    for index in 0..count {
                        let id = self.require(
                            compiled,
                            label,
                            destination,
                            index,
                            NativeHandle::as_buffer,
                            "buffer",
                        )?;
                        destinations.push(UploadDestination::Buffer {
                            buffer: id,
                            capacity: buffer.size,
                        });
                    }
                }
                (Some(target), Some((NodeKind::Image(image), id)))
                    if matches!(image.extent, ImageExtent::FromSource) =>
                {
                    for _ in 0..count {
                        destinations.push(UploadDestination::NewImage(ImageDescriptor {
                            label: id.clone(),
                            dimension: image.dimension,
                            format: image.format,
                            extent: Extent3D::new(1, 1, 1),
                            mip_levels: image.mip_levels,
                            array_layers: image.array_layers,
                            samples: image.samples,
                            usage: image.usage,
                        }));
                        creates.push(target);
                    }
                }
                (Some(_), Some((NodeKind::Image(_), _))) => {
                    for index in 0..count {
                        let image = self.require(
                            compiled,
                            label,
                            destination,
                            index,
                            NativeHandle::as_image,
                            "image",
                        )?;
                        let descriptor = compiled.image_descriptors.get(&image).cloned().ok_or_else(
                            || CompileError::Invalid {
                                node: label.to_string(),
                                reason: format!("{destination} is not an image this graph created"),
                            },
                        )?;
                        destinations.push(UploadDestination::Image { image, descriptor });
                    }
                }
                _ => {
                    return Err(CompileError::Unresolved {
                        node: label.to_string(),
                        reference: destination.to_string(),
                        expected: "buffer or image node",
                    })
                }
            }
        }

        let queue_family = match &upload.target.queue {
            Some(queue) => {
                let queue = self.require(compiled, label, queue, 0, NativeHandle::as_queue, "queue")?;
                Some(device.queue_family_index(queue).map_err(creation(label))?)
            }
            None => None,
        };

        let mut task = UploadTask::new(label, upload.source.clone(), destinations).with_consumer(
            ConsumerState {
                access: upload.target.access,
                stage: upload.target.stage,
                layout: upload.target.layout,
                queue_family,
            },
        );
        task.size = upload.size;
        task.dst_offset = upload.dst_offset;
        task.encoding = upload.image_encoding;

        let uploads = self.uploads.as_ref().ok_or(CompileError::NotInitialized)?;
        log::debug!("Queued {label} from {}", upload.source.describe());
        session.pending.push(PendingUpload {
            node: node_ref,
            label: label.to_string(),
            handle: uploads.submit(task),
            creates,
        });
        Ok(())
    }

    /// Waits for pending uploads: only those creating images when
    /// `creating_only` is set, otherwise all of them.
    ///
    /// Every selected upload is waited on even after one fails; the first
    /// failure is returned.
    pub(crate) fn finish_uploads(
        &mut self,
        compiled: &mut CompiledGraph,
        session: &mut Session,
        creating_only: bool,
    ) -> Result<(), CompileError> {
        let (now, later): (Vec<_>, Vec<_>) = std::mem::take(&mut session.pending)
            .into_iter()
            .partition(|upload| !creating_only || !upload.creates.is_empty());
        session.pending = later;

        let mut first_error = None;
        for upload in now {
            let PendingUpload {
                node,
                label,
                handle,
                creates,
            } = upload;
            match handle.finish() {
                Ok(receipt) => {
                    log::debug!(
                        "{label}: {} byte(s) staged in {} region(s)",
                        receipt.staged_bytes,
                        receipt.regions
                    );
                    self.adopt_images(compiled, &creates, receipt.created_images);
                }
                Err(source) => {
                    if source.is_contract_violation() {
                        log::error!("{label} ({node}) broke its contract: {source}");
                    } else {
                        log::error!("{label} ({node}) failed: {source}");
                    }
                    first_error.get_or_insert(CompileError::Upload {
                        node: label,
                        source,
                    });
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Publishes images created by an upload as the instances of the image
    /// nodes they were created for.
    fn adopt_images(
        &mut self,
        compiled: &mut CompiledGraph,
        creates: &[NodeRef],
        created: Vec<(strata_core::renderer::api::ImageId, ImageDescriptor)>,
    ) {
        let mut grouped: Vec<(NodeRef, Vec<NativeHandle>)> = Vec::new();
        for (&node, (image, descriptor)) in creates.iter().zip(created) {
            compiled.image_descriptors.insert(image, descriptor);
            match grouped.iter_mut().find(|(n, _)| *n == node) {
                Some((_, handles)) => handles.push(NativeHandle::Image(image)),
                None => grouped.push((node, vec![NativeHandle::Image(image)])),
            }
        }

        for (node_ref, handles) in grouped {
            let Some(node) = compiled.graph().node(node_ref).cloned() else {
                continue;
            };
            if compiled.instance(node_ref).is_some() {
                log::warn!(
                    "{} is filled by more than one upload; replacing its images",
                    compiled.label(node_ref)
                );
                self.destroy_node(compiled, node_ref);
            }
            let instance = if compiled.layout().is_per_frame(node_ref) {
                Instance::PerFrame(handles)
            } else {
                Instance::Single(handles[0])
            };
            self.publish(compiled, node_ref, &node, instance);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Descriptor sets and command contexts
    // ─────────────────────────────────────────────────────────────────────

    /// Writes every instance of the descriptor sets among `nodes`.
    ///
    /// Instance `i` of a set receives instance `i` of each per-frame
    /// resource. A resource that does not resolve skips its write.
    fn write_descriptor_sets(
        &self,
        compiled: &CompiledGraph,
        nodes: &[NodeRef],
    ) -> Result<(), CompileError> {
        let device = self.device()?;
        for &node in nodes {
            let Some(NodeKind::DescriptorSet(set)) = compiled.graph().node(node).map(|n| &n.kind) else {
                continue;
            };
            let Some(instance) = compiled.instance(node) else {
                continue;
            };
            let label = compiled.label(node);
            for (index, handle) in instance.handles().iter().enumerate() {
                let Some(id) = handle.as_descriptor_set() else {
                    continue;
                };
                let writes: Vec<DescriptorWrite> = set
                    .writes
                    .iter()
                    .filter_map(|write| {
                        let resource = self.descriptor_resource(compiled, write, index);
                        if resource.is_none() {
                            log::warn!(
                                "{label}: skipping binding {} of instance {index}, its resource does not resolve",
                                write.binding
                            );
                        }
                        Some(DescriptorWrite {
                            set: id,
                            binding: write.binding,
                            array_element: write.array_element,
                            resource: resource?,
                        })
                    })
                    .collect();
                if !writes.is_empty() {
                    device.update_descriptor_sets(&writes).map_err(creation(&label))?;
                }
            }
        }
        Ok(())
    }

    fn descriptor_resource(
        &self,
        compiled: &CompiledGraph,
        write: &DescriptorWriteNode,
        index: usize,
    ) -> Option<DescriptorResource> {
        let resolve = |reference: &Ref| compiled.resolve(&self.ids, reference, index);
        Some(match &write.resource {
            DescriptorResourceNode::Buffer {
                buffer,
                offset,
                range,
            } => DescriptorResource::Buffer {
                buffer: resolve(buffer)?.as_buffer()?,
                offset: *offset,
                range: *range,
            },
            DescriptorResourceNode::Image { view, layout } => DescriptorResource::Image {
                view: resolve(view)?.as_image_view()?,
                layout: *layout,
            },
            DescriptorResourceNode::Sampler(sampler) => {
                DescriptorResource::Sampler(resolve(sampler)?.as_sampler()?)
            }
            DescriptorResourceNode::CombinedImageSampler {
                view,
                sampler,
                layout,
            } => DescriptorResource::CombinedImageSampler {
                view: resolve(view)?.as_image_view()?,
                sampler: resolve(sampler)?.as_sampler()?,
                layout: *layout,
            },
        })
    }

    /// Records every command context. With `resize`, each context is first
    /// resized to the current instance count of its command buffer.
    pub(crate) fn build_contexts(
        &self,
        compiled: &mut CompiledGraph,
        resize: bool,
    ) -> Result<(), CompileError> {
        let device = self.device()?;
        let mut contexts = std::mem::take(&mut compiled.contexts);
        let mut result = Ok(());
        for entry in &mut contexts {
            if resize {
                let slots = self.slot_count(compiled, entry.context.command_buffer());
                entry.context.resize(slots);
            }
            let resolver = Resolver {
                compiled: &*compiled,
                ids: &self.ids,
                surface: compiled.surface_extent_for(entry.context.command_buffer()),
            };
            if let Err(source) = entry.context.build(device.as_ref(), &resolver) {
                result = Err(CompileError::Record {
                    node: compiled.label(entry.node),
                    source,
                });
                break;
            }
        }
        compiled.contexts = contexts;
        result
    }

    /// Destroys the objects of one node and drops its bookkeeping.
    ///
    /// Device-level nodes are left alone. Failures are logged.
    pub(crate) fn destroy_node(&mut self, compiled: &mut CompiledGraph, node_ref: NodeRef) {
        let Some(node) = compiled.graph().node(node_ref) else {
            return;
        };
        if node.kind.is_device_level() {
            return;
        }
        let id = node.id.clone();
        let Some(instance) = compiled.instances[node_ref.index()].take() else {
            return;
        };
        let label = compiled.label(node_ref);
        let device = self.device.clone();
        for &handle in instance.handles() {
            forget(compiled, handle);
            if !handle.kind().is_native() {
                continue;
            }
            if let Some(device) = &device {
                if let Err(e) = device.destroy(handle) {
                    log::warn!("Failed to destroy {handle:?} of {label}: {e}");
                }
            }
        }
        compiled.swapchains.remove(&node_ref);
        if let Some(id) = id {
            self.ids.remove(&id);
        }
        log::trace!("Destroyed {label}");
    }
}

/// The swapchain a `Frame` node follows and its frames-in-flight request.
pub(crate) fn frame_of(compiled: &CompiledGraph, frame: &Ref) -> Option<(NodeRef, Option<u32>)> {
    let node = compiled.graph().resolve(frame)?;
    match &compiled.graph().node(node)?.kind {
        NodeKind::Frame(frame) => Some((
            compiled.graph().resolve(&frame.swapchain)?,
            frame.frames_in_flight,
        )),
        _ => None,
    }
}

/// Drops the extents and descriptors recorded for a handle.
fn forget(compiled: &mut CompiledGraph, handle: NativeHandle) {
    match handle {
        NativeHandle::Image(id) => {
            compiled.image_descriptors.remove(&id);
        }
        NativeHandle::ImageView(id) => {
            compiled.view_extents.remove(&id);
        }
        NativeHandle::Framebuffer(id) => {
            compiled.framebuffer_extents.remove(&id);
        }
        _ => {}
    }
}
