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

use super::device::DeviceShared;
use std::sync::Arc;
use strata_core::math::Rect2D;
use strata_core::renderer::api::*;
use strata_core::renderer::{CommandRecorder, RenderError};

/// One command as it was recorded into a command buffer.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum RecordedCommand {
    PipelineBarrier(PipelineBarrier),
    CopyBuffer {
        src: BufferId,
        dst: BufferId,
        regions: Vec<BufferCopy>,
    },
    CopyBufferToImage {
        src: BufferId,
        dst: ImageId,
        layout: ImageLayout,
        regions: Vec<BufferImageCopy>,
    },
    BeginRenderPass(RenderPassBeginInfo),
    NextSubpass,
    EndRenderPass,
    BindPipeline {
        bind_point: PipelineBindPoint,
        pipeline: PipelineId,
    },
    BindDescriptorSets {
        bind_point: PipelineBindPoint,
        layout: PipelineLayoutId,
        first_set: u32,
        sets: Vec<DescriptorSetId>,
        dynamic_offsets: Vec<u32>,
    },
    BindVertexBuffers {
        first_binding: u32,
        buffers: Vec<(BufferId, u64)>,
    },
    BindIndexBuffer {
        buffer: BufferId,
        offset: u64,
        index_type: IndexType,
    },
    PushConstants {
        layout: PipelineLayoutId,
        stages: ShaderStages,
        offset: u32,
        data: Vec<u8>,
    },
    SetViewport(Viewport),
    SetScissor(Rect2D),
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
    Dispatch {
        x: u32,
        y: u32,
        z: u32,
    },
    ResetQueryPool {
        pool: QueryPoolId,
        first_query: u32,
        query_count: u32,
    },
    WriteTimestamp {
        stage: PipelineStage,
        pool: QueryPoolId,
        query: u32,
    },
    SetEvent {
        event: EventId,
        stage: PipelineStage,
    },
    ResetEvent {
        event: EventId,
        stage: PipelineStage,
    },
    BeginDebugGroup(String),
    EndDebugGroup,
}

/// Records into a host-side list, stored on the command buffer by `finish`.
pub(crate) struct HeadlessRecorder {
    pub(crate) shared: Arc<DeviceShared>,
    pub(crate) command_buffer: CommandBufferId,
    pub(crate) commands: Vec<RecordedCommand>,
    pub(crate) pass_open: bool,
    pub(crate) debug_depth: u32,
}

impl CommandRecorder for HeadlessRecorder {
    fn pipeline_barrier(&mut self, barrier: &PipelineBarrier) {
        self.commands
            .push(RecordedCommand::PipelineBarrier(barrier.clone()));
    }

    fn copy_buffer(&mut self, src: BufferId, dst: BufferId, regions: &[BufferCopy]) {
        self.commands.push(RecordedCommand::CopyBuffer {
            src,
            dst,
            regions: regions.to_vec(),
        });
    }

    fn copy_buffer_to_image(
        &mut self,
        src: BufferId,
        dst: ImageId,
        layout: ImageLayout,
        regions: &[BufferImageCopy],
    ) {
        self.commands.push(RecordedCommand::CopyBufferToImage {
            src,
            dst,
            layout,
            regions: regions.to_vec(),
        });
    }

    fn begin_render_pass(&mut self, info: &RenderPassBeginInfo) {
        if self.pass_open {
            log::warn!(
                "Command buffer {:?}: render pass begun inside another",
                self.command_buffer
            );
        }
        self.pass_open = true;
        self.commands
            .push(RecordedCommand::BeginRenderPass(info.clone()));
    }

    fn next_subpass(&mut self) {
        self.commands.push(RecordedCommand::NextSubpass);
    }

    fn end_render_pass(&mut self) {
        self.pass_open = false;
        self.commands.push(RecordedCommand::EndRenderPass);
    }

    fn bind_pipeline(&mut self, bind_point: PipelineBindPoint, pipeline: PipelineId) {
        self.commands.push(RecordedCommand::BindPipeline {
            bind_point,
            pipeline,
        });
    }

    fn bind_descriptor_sets(
        &mut self,
        bind_point: PipelineBindPoint,
        layout: PipelineLayoutId,
        first_set: u32,
        sets: &[DescriptorSetId],
        dynamic_offsets: &[u32],
    ) {
        self.commands.push(RecordedCommand::BindDescriptorSets {
            bind_point,
            layout,
            first_set,
            sets: sets.to_vec(),
            dynamic_offsets: dynamic_offsets.to_vec(),
        });
    }

    fn bind_vertex_buffers(&mut self, first_binding: u32, buffers: &[(BufferId, u64)]) {
        self.commands.push(RecordedCommand::BindVertexBuffers {
            first_binding,
            buffers: buffers.to_vec(),
        });
    }

    fn bind_index_buffer(&mut self, buffer: BufferId, offset: u64, index_type: IndexType) {
        self.commands.push(RecordedCommand::BindIndexBuffer {
            buffer,
            offset,
            index_type,
        });
    }

    fn push_constants(
        &mut self,
        layout: PipelineLayoutId,
        stages: ShaderStages,
        offset: u32,
        data: &[u8],
    ) {
        self.commands.push(RecordedCommand::PushConstants {
            layout,
            stages,
            offset,
            data: data.to_vec(),
        });
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        self.commands.push(RecordedCommand::SetViewport(*viewport));
    }

    fn set_scissor(&mut self, scissor: &Rect2D) {
        self.commands.push(RecordedCommand::SetScissor(*scissor));
    }

    fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        self.commands.push(RecordedCommand::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        });
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.commands.push(RecordedCommand::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        });
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.commands.push(RecordedCommand::Dispatch { x, y, z });
    }

    fn reset_query_pool(&mut self, pool: QueryPoolId, first_query: u32, query_count: u32) {
        self.commands.push(RecordedCommand::ResetQueryPool {
            pool,
            first_query,
            query_count,
        });
    }

    fn write_timestamp(&mut self, stage: PipelineStage, pool: QueryPoolId, query: u32) {
        self.commands
            .push(RecordedCommand::WriteTimestamp { stage, pool, query });
    }

    fn set_event(&mut self, event: EventId, stage: PipelineStage) {
        self.commands.push(RecordedCommand::SetEvent { event, stage });
    }

    fn reset_event(&mut self, event: EventId, stage: PipelineStage) {
        self.commands.push(RecordedCommand::ResetEvent { event, stage });
    }

    fn begin_debug_group(&mut self, label: &str) {
        self.debug_depth += 1;
        self.commands
            .push(RecordedCommand::BeginDebugGroup(label.to_string()));
    }

    fn end_debug_group(&mut self) {
        self.debug_depth = self.debug_depth.saturating_sub(1);
        self.commands.push(RecordedCommand::EndDebugGroup);
    }

    fn finish(self: Box<Self>) -> Result<(), RenderError> {
        if self.pass_open {
            return Err(RenderError::Internal(format!(
                "Command buffer {:?} finished inside a render pass",
                self.command_buffer
            )));
        }
        if self.debug_depth != 0 {
            return Err(RenderError::Internal(format!(
                "Command buffer {:?} finished with {} open debug groups",
                self.command_buffer, self.debug_depth
            )));
        }
        let count = self.commands.len();
        self.shared
            .store_recording(self.command_buffer, self.commands)
            .map_err(RenderError::Resource)?;
        log::trace!(
            "Command buffer {:?} recorded ({count} commands)",
            self.command_buffer
        );
        Ok(())
    }
}

