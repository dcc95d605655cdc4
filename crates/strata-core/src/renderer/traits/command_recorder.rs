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

use crate::math::Rect2D;
use crate::renderer::api::*;
use crate::renderer::error::RenderError;

/// Records commands into one command buffer.
///
/// Obtained from [`GraphicsDevice::begin_command_buffer`](super::GraphicsDevice::begin_command_buffer).
/// Recording methods are infallible; invalid usage surfaces when the
/// recording is committed with [`finish`](CommandRecorder::finish) or when
/// the buffer is submitted.
pub trait CommandRecorder: Send {
    /// Inserts an execution and memory dependency.
    fn pipeline_barrier(&mut self, barrier: &PipelineBarrier);

    /// Copies regions between two buffers.
    fn copy_buffer(&mut self, src: BufferId, dst: BufferId, regions: &[BufferCopy]);

    /// Copies regions of a buffer into an image in `layout`.
    fn copy_buffer_to_image(
        &mut self,
        src: BufferId,
        dst: ImageId,
        layout: ImageLayout,
        regions: &[BufferImageCopy],
    );

    /// Begins a render pass instance.
    fn begin_render_pass(&mut self, info: &RenderPassBeginInfo);

    /// Advances to the next subpass.
    fn next_subpass(&mut self);

    /// Ends the current render pass instance.
    fn end_render_pass(&mut self);

    /// Binds a pipeline.
    fn bind_pipeline(&mut self, bind_point: PipelineBindPoint, pipeline: PipelineId);

    /// Binds descriptor sets starting at `first_set`.
    fn bind_descriptor_sets(
        &mut self,
        bind_point: PipelineBindPoint,
        layout: PipelineLayoutId,
        first_set: u32,
        sets: &[DescriptorSetId],
        dynamic_offsets: &[u32],
    );

    /// Binds vertex buffers, each with a byte offset.
    fn bind_vertex_buffers(&mut self, first_binding: u32, buffers: &[(BufferId, u64)]);

    /// Binds an index buffer.
    fn bind_index_buffer(&mut self, buffer: BufferId, offset: u64, index_type: IndexType);

    /// Updates push constants.
    fn push_constants(
        &mut self,
        layout: PipelineLayoutId,
        stages: ShaderStages,
        offset: u32,
        data: &[u8],
    );

    /// Sets the dynamic viewport.
    fn set_viewport(&mut self, viewport: &Viewport);

    /// Sets the dynamic scissor rectangle.
    fn set_scissor(&mut self, scissor: &Rect2D);

    /// Draws non-indexed primitives.
    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32);

    /// Draws indexed primitives.
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );

    /// Dispatches compute work groups.
    fn dispatch(&mut self, x: u32, y: u32, z: u32);

    /// Resets a range of queries.
    fn reset_query_pool(&mut self, pool: QueryPoolId, first_query: u32, query_count: u32);

    /// Writes a timestamp once `stage` completes.
    fn write_timestamp(&mut self, stage: PipelineStage, pool: QueryPoolId, query: u32);

    /// Signals an event once `stage` completes.
    fn set_event(&mut self, event: EventId, stage: PipelineStage);

    /// Unsignals an event once `stage` completes.
    fn reset_event(&mut self, event: EventId, stage: PipelineStage);

    /// Opens a labelled debug region.
    fn begin_debug_group(&mut self, label: &str);

    /// Closes the innermost debug region.
    fn end_debug_group(&mut self);

    /// Commits the recording.
    ///
    /// Consumes the recorder: a command buffer has exactly one recording in
    /// progress at a time.
    fn finish(self: Box<Self>) -> Result<(), RenderError>;
}
