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

//! The single dispatch function over [`CommandNode`].

use super::Bindings;
use strata_core::math::{Extent2D, Rect2D, Region};
use strata_core::renderer::api::*;
use strata_core::renderer::CommandRecorder;
use strata_data::graph::CommandNode;
use strata_data::Ref;

/// The state threaded through one recording.
pub(crate) struct RecordState<'a> {
    recorder: &'a mut dyn CommandRecorder,
    bindings: &'a dyn Bindings,
    index: usize,
    pass_extent: Option<Extent2D>,
    /// Leaves recorded.
    pub(crate) recorded: usize,
    /// Leaves skipped because a reference did not resolve.
    pub(crate) skipped: usize,
}

impl<'a> RecordState<'a> {
    pub(crate) fn new(
        recorder: &'a mut dyn CommandRecorder,
        bindings: &'a dyn Bindings,
        index: usize,
    ) -> Self {
        Self {
            recorder,
            bindings,
            index,
            pass_extent: None,
            recorded: 0,
            skipped: 0,
        }
    }

    fn lookup<T>(&self, reference: &Ref, pick: fn(&NativeHandle) -> Option<T>) -> Option<T> {
        self.bindings
            .resolve(reference, self.index)
            .and_then(|handle| pick(&handle))
    }

    fn lookup_all<T>(&self, references: &[&Ref], pick: fn(&NativeHandle) -> Option<T>) -> Option<Vec<T>> {
        references.iter().map(|r| self.lookup(r, pick)).collect()
    }

    fn skip(&mut self, what: &str, node: &CommandNode) {
        let mut refs = Vec::new();
        node.refs(&mut refs);
        let refs: Vec<String> = refs.iter().map(|r| r.to_string()).collect();
        log::warn!(
            "Skipping {what} in slot {}: unresolved reference among [{}]",
            self.index,
            refs.join(", ")
        );
        self.skipped += 1;
    }

    fn region(&self, region: &Region) -> Rect2D {
        region.resolve(
            self.pass_extent
                .unwrap_or_else(|| self.bindings.surface_extent()),
        )
    }

    /// Records `node` and its children.
    pub(crate) fn record(&mut self, node: &CommandNode) {
        match node {
            CommandNode::List(children) => {
                for child in children {
                    self.record(child);
                }
            }
            CommandNode::Group { label, children } => {
                self.recorder.begin_debug_group(label);
                for child in children {
                    self.record(child);
                }
                self.recorder.end_debug_group();
            }
            CommandNode::RenderPass {
                render_pass,
                framebuffer,
                area,
                clear_values,
                subpasses,
            } => {
                let (Some(render_pass), Some(framebuffer)) = (
                    self.lookup(render_pass, NativeHandle::as_render_pass),
                    self.lookup(framebuffer, NativeHandle::as_framebuffer),
                ) else {
                    return self.skip("render pass", node);
                };
                let extent = self
                    .bindings
                    .framebuffer_extent(framebuffer)
                    .unwrap_or_else(|| self.bindings.surface_extent());
                self.recorder.begin_render_pass(&RenderPassBeginInfo {
                    render_pass,
                    framebuffer,
                    area: area.resolve(extent),
                    clear_values: clear_values.clone(),
                });
                self.recorded += 1;

                let outer = self.pass_extent.replace(extent);
                for (k, subpass) in subpasses.iter().enumerate() {
                    if k > 0 {
                        self.recorder.next_subpass();
                    }
                    for child in subpass {
                        self.record(child);
                    }
                }
                self.pass_extent = outer;
                self.recorder.end_render_pass();
            }
            CommandNode::Barrier {
                src_stage,
                dst_stage,
                buffers,
                images,
            } => {
                let buffer_refs: Vec<&Ref> = buffers.iter().map(|b| &b.buffer).collect();
                let image_refs: Vec<&Ref> = images.iter().map(|i| &i.image).collect();
                let (Some(buffer_ids), Some(image_ids)) = (
                    self.lookup_all(&buffer_refs, NativeHandle::as_buffer),
                    self.lookup_all(&image_refs, NativeHandle::as_image),
                ) else {
                    return self.skip("barrier", node);
                };
                self.recorder.pipeline_barrier(&PipelineBarrier {
                    src_stage: *src_stage,
                    dst_stage: *dst_stage,
                    buffers: buffers
                        .iter()
                        .zip(buffer_ids)
                        .map(|(b, buffer)| BufferBarrier {
                            buffer,
                            src_access: b.src_access,
                            dst_access: b.dst_access,
                            src_queue_family: b.src_queue_family,
                            dst_queue_family: b.dst_queue_family,
                            offset: 0,
                            size: None,
                        })
                        .collect(),
                    images: images
                        .iter()
                        .zip(image_ids)
                        .map(|(i, image)| ImageBarrier {
                            image,
                            old_layout: i.old_layout,
                            new_layout: i.new_layout,
                            src_access: i.src_access,
                            dst_access: i.dst_access,
                            src_queue_family: None,
                            dst_queue_family: None,
                            range: i.range,
                        })
                        .collect(),
                });
                self.recorded += 1;
            }
            CommandNode::CopyBuffer { src, dst, regions } => {
                let (Some(src), Some(dst)) = (
                    self.lookup(src, NativeHandle::as_buffer),
                    self.lookup(dst, NativeHandle::as_buffer),
                ) else {
                    return self.skip("buffer copy", node);
                };
                self.recorder.copy_buffer(src, dst, regions);
                self.recorded += 1;
            }
            CommandNode::CopyBufferToImage {
                src,
                dst,
                layout,
                regions,
            } => {
                let (Some(src), Some(dst)) = (
                    self.lookup(src, NativeHandle::as_buffer),
                    self.lookup(dst, NativeHandle::as_image),
                ) else {
                    return self.skip("image copy", node);
                };
                self.recorder.copy_buffer_to_image(src, dst, *layout, regions);
                self.recorded += 1;
            }
            CommandNode::BindPipeline {
                bind_point,
                pipeline,
            } => {
                let Some(pipeline) = self.lookup(pipeline, NativeHandle::as_pipeline) else {
                    return self.skip("pipeline bind", node);
                };
                self.recorder.bind_pipeline(*bind_point, pipeline);
                self.recorded += 1;
            }
            CommandNode::BindDescriptorSets {
                bind_point,
                layout,
                first_set,
                sets,
                dynamic_offsets,
            } => {
                let set_refs: Vec<&Ref> = sets.iter().collect();
                let (Some(layout), Some(sets)) = (
                    self.lookup(layout, NativeHandle::as_pipeline_layout),
                    self.lookup_all(&set_refs, NativeHandle::as_descriptor_set),
                ) else {
                    return self.skip("descriptor set bind", node);
                };
                self.recorder
                    .bind_descriptor_sets(*bind_point, layout, *first_set, &sets, dynamic_offsets);
                self.recorded += 1;
            }
            CommandNode::BindVertexBuffers {
                first_binding,
                buffers,
            } => {
                let refs: Vec<&Ref> = buffers.iter().map(|(r, _)| r).collect();
                let Some(ids) = self.lookup_all(&refs, NativeHandle::as_buffer) else {
                    return self.skip("vertex buffer bind", node);
                };
                let bound: Vec<(BufferId, u64)> = ids
                    .into_iter()
                    .zip(buffers.iter().map(|(_, offset)| *offset))
                    .collect();
                self.recorder.bind_vertex_buffers(*first_binding, &bound);
                self.recorded += 1;
            }
            CommandNode::BindIndexBuffer {
                buffer,
                offset,
                index_type,
            } => {
                let Some(buffer) = self.lookup(buffer, NativeHandle::as_buffer) else {
                    return self.skip("index buffer bind", node);
                };
                self.recorder.bind_index_buffer(buffer, *offset, *index_type);
                self.recorded += 1;
            }
            CommandNode::PushConstants {
                layout,
                stages,
                offset,
                data,
            } => {
                let Some(layout) = self.lookup(layout, NativeHandle::as_pipeline_layout) else {
                    return self.skip("push constants", node);
                };
                self.recorder.push_constants(layout, *stages, *offset, data);
                self.recorded += 1;
            }
            CommandNode::SetViewport {
                region,
                min_depth,
                max_depth,
            } => {
                let rect = self.region(region);
                self.recorder.set_viewport(&Viewport {
                    x: rect.x as f32,
                    y: rect.y as f32,
                    width: rect.extent.width as f32,
                    height: rect.extent.height as f32,
                    min_depth: *min_depth,
                    max_depth: *max_depth,
                });
                self.recorded += 1;
            }
            CommandNode::SetScissor(region) => {
                let rect = self.region(region);
                self.recorder.set_scissor(&rect);
                self.recorded += 1;
            }
            CommandNode::Draw {
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            } => {
                self.recorder
                    .draw(*vertex_count, *instance_count, *first_vertex, *first_instance);
                self.recorded += 1;
            }
            CommandNode::DrawIndexed {
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            } => {
                self.recorder.draw_indexed(
                    *index_count,
                    *instance_count,
                    *first_index,
                    *vertex_offset,
                    *first_instance,
                );
                self.recorded += 1;
            }
            CommandNode::Dispatch { x, y, z } => {
                self.recorder.dispatch(*x, *y, *z);
                self.recorded += 1;
            }
            CommandNode::ResetQueryPool { pool, first, count } => {
                let Some(pool) = self.lookup(pool, NativeHandle::as_query_pool) else {
                    return self.skip("query reset", node);
                };
                self.recorder.reset_query_pool(pool, *first, *count);
                self.recorded += 1;
            }
            CommandNode::WriteTimestamp { stage, pool, query } => {
                let Some(pool) = self.lookup(pool, NativeHandle::as_query_pool) else {
                    return self.skip("timestamp", node);
                };
                self.recorder.write_timestamp(*stage, pool, *query);
                self.recorded += 1;
            }
            CommandNode::SetEvent { event, stage } => {
                let Some(event) = self.lookup(event, NativeHandle::as_event) else {
                    return self.skip("event set", node);
                };
                self.recorder.set_event(event, *stage);
                self.recorded += 1;
            }
            CommandNode::ResetEvent { event, stage } => {
                let Some(event) = self.lookup(event, NativeHandle::as_event) else {
                    return self.skip("event reset", node);
                };
                self.recorder.reset_event(event, *stage);
                self.recorded += 1;
            }
        }
    }
}
