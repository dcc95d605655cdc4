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

//! Declarative command trees.
//!
//! A tree is immutable once built. Leaves reference resources through
//! [`Ref`]s; per-frame resources are resolved to "the i-th instance" only
//! when a slot is recorded, and [`Region`]s are resolved against the extent
//! current at that time.

use super::Ref;
use serde::{Deserialize, Serialize};
use strata_core::math::Region;
use strata_core::renderer::api::{
    AccessFlags, BufferCopy, BufferImageCopy, ClearValue, ImageLayout, ImageSubresourceRange,
    IndexType, PipelineBindPoint, PipelineStage, ShaderStages,
};

/// A buffer barrier whose buffer is a graph reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct BufferBarrierNode {
    pub buffer: Ref,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
    pub src_queue_family: Option<u32>,
    pub dst_queue_family: Option<u32>,
}

/// An image barrier whose image is a graph reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ImageBarrierNode {
    pub image: Ref,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
    pub range: ImageSubresourceRange,
}

/// One node of a command tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandNode {
    /// Children recorded in order.
    List(Vec<CommandNode>),
    /// Children recorded inside a labelled debug region.
    Group {
        /// Debug label.
        label: String,
        /// Children.
        children: Vec<CommandNode>,
    },
    /// A render pass instance. `subpasses[k]` is recorded in subpass `k`.
    RenderPass {
        /// The render pass node.
        render_pass: Ref,
        /// The (usually per-frame) framebuffer node.
        framebuffer: Ref,
        /// Render area, relative to the framebuffer extent.
        area: Region,
        /// Clear values.
        clear_values: Vec<ClearValue>,
        /// Commands per subpass.
        subpasses: Vec<Vec<CommandNode>>,
    },
    /// A pipeline barrier.
    Barrier {
        /// Source stages.
        src_stage: PipelineStage,
        /// Destination stages.
        dst_stage: PipelineStage,
        /// Buffer barriers.
        buffers: Vec<BufferBarrierNode>,
        /// Image barriers.
        images: Vec<ImageBarrierNode>,
    },
    /// A buffer to buffer copy.
    CopyBuffer {
        /// Source buffer node.
        src: Ref,
        /// Destination buffer node.
        dst: Ref,
        /// Regions.
        regions: Vec<BufferCopy>,
    },
    /// A buffer to image copy.
    CopyBufferToImage {
        /// Source buffer node.
        src: Ref,
        /// Destination image node.
        dst: Ref,
        /// Destination layout.
        layout: ImageLayout,
        /// Regions.
        regions: Vec<BufferImageCopy>,
    },
    /// Binds a pipeline.
    BindPipeline {
        /// Bind point.
        bind_point: PipelineBindPoint,
        /// Pipeline node.
        pipeline: Ref,
    },
    /// Binds descriptor sets.
    BindDescriptorSets {
        /// Bind point.
        bind_point: PipelineBindPoint,
        /// Pipeline layout node.
        layout: Ref,
        /// First set index.
        first_set: u32,
        /// Descriptor set nodes.
        sets: Vec<Ref>,
        /// Dynamic offsets.
        dynamic_offsets: Vec<u32>,
    },
    /// Binds vertex buffers with byte offsets.
    BindVertexBuffers {
        /// First binding.
        first_binding: u32,
        /// Buffer nodes and offsets.
        buffers: Vec<(Ref, u64)>,
    },
    /// Binds an index buffer.
    BindIndexBuffer {
        /// Buffer node.
        buffer: Ref,
        /// Byte offset.
        offset: u64,
        /// Index width.
        index_type: IndexType,
    },
    /// Updates push constants.
    PushConstants {
        /// Pipeline layout node.
        layout: Ref,
        /// Visible stages.
        stages: ShaderStages,
        /// Byte offset.
        offset: u32,
        /// Data.
        data: Vec<u8>,
    },
    /// Sets the viewport from a region of the current extent.
    SetViewport {
        /// Viewport rectangle.
        region: Region,
        /// Minimum depth.
        min_depth: f32,
        /// Maximum depth.
        max_depth: f32,
    },
    /// Sets the scissor from a region of the current extent.
    SetScissor(Region),
    /// A non-indexed draw.
    Draw {
        /// Vertices.
        vertex_count: u32,
        /// Instances.
        instance_count: u32,
        /// First vertex.
        first_vertex: u32,
        /// First instance.
        first_instance: u32,
    },
    /// An indexed draw.
    DrawIndexed {
        /// Indices.
        index_count: u32,
        /// Instances.
        instance_count: u32,
        /// First index.
        first_index: u32,
        /// Added to each index.
        vertex_offset: i32,
        /// First instance.
        first_instance: u32,
    },
    /// A compute dispatch.
    Dispatch {
        /// Work groups along x.
        x: u32,
        /// Work groups along y.
        y: u32,
        /// Work groups along z.
        z: u32,
    },
    /// Resets queries.
    ResetQueryPool {
        /// Query pool node.
        pool: Ref,
        /// First query.
        first: u32,
        /// Query count.
        count: u32,
    },
    /// Writes a timestamp.
    WriteTimestamp {
        /// Stage.
        stage: PipelineStage,
        /// Query pool node.
        pool: Ref,
        /// Query index.
        query: u32,
    },
    /// Signals an event.
    SetEvent {
        /// Event node.
        event: Ref,
        /// Stage.
        stage: PipelineStage,
    },
    /// Unsignals an event.
    ResetEvent {
        /// Event node.
        event: Ref,
        /// Stage.
        stage: PipelineStage,
    },
}

impl CommandNode {
    /// Collects every reference in the tree, depth first.
    pub fn refs<'a>(&'a self, out: &mut Vec<&'a Ref>) {
        match self {
            CommandNode::List(children) | CommandNode::Group { children, .. } => {
                for child in children {
                    child.refs(out);
                }
            }
            CommandNode::RenderPass {
                render_pass,
                framebuffer,
                subpasses,
                ..
            } => {
                out.push(render_pass);
                out.push(framebuffer);
                for child in subpasses.iter().flatten() {
                    child.refs(out);
                }
            }
            CommandNode::Barrier {
                buffers, images, ..
            } => {
                out.extend(buffers.iter().map(|b| &b.buffer));
                out.extend(images.iter().map(|i| &i.image));
            }
            CommandNode::CopyBuffer { src, dst, .. }
            | CommandNode::CopyBufferToImage { src, dst, .. } => {
                out.push(src);
                out.push(dst);
            }
            CommandNode::BindPipeline { pipeline, .. } => out.push(pipeline),
            CommandNode::BindDescriptorSets { layout, sets, .. } => {
                out.push(layout);
                out.extend(sets.iter());
            }
            CommandNode::BindVertexBuffers { buffers, .. } => {
                out.extend(buffers.iter().map(|(r, _)| r));
            }
            CommandNode::BindIndexBuffer { buffer, .. } => out.push(buffer),
            CommandNode::PushConstants { layout, .. } => out.push(layout),
            CommandNode::ResetQueryPool { pool, .. } | CommandNode::WriteTimestamp { pool, .. } => {
                out.push(pool)
            }
            CommandNode::SetEvent { event, .. } | CommandNode::ResetEvent { event, .. } => {
                out.push(event)
            }
            CommandNode::SetViewport { .. }
            | CommandNode::SetScissor(_)
            | CommandNode::Draw { .. }
            | CommandNode::DrawIndexed { .. }
            | CommandNode::Dispatch { .. } => {}
        }
    }

    /// Number of nodes in the tree, including this one.
    pub fn node_count(&self) -> usize {
        1 + match self {
            CommandNode::List(children) | CommandNode::Group { children, .. } => {
                children.iter().map(CommandNode::node_count).sum()
            }
            CommandNode::RenderPass { subpasses, .. } => {
                subpasses.iter().flatten().map(CommandNode::node_count).sum()
            }
            _ => 0,
        }
    }
}
