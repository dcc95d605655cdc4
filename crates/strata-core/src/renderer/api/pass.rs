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

//! Render passes and framebuffers.

use super::format::Format;
use super::handle::{FramebufferId, ImageViewId, RenderPassId};
use super::sync::{AccessFlags, ImageLayout, PipelineStage};
use crate::math::{Extent2D, Rect2D};
use serde::{Deserialize, Serialize};

/// What happens to an attachment at the start of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum LoadOp {
    Load,
    #[default]
    Clear,
    DontCare,
}

/// What happens to an attachment at the end of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum StoreOp {
    #[default]
    Store,
    DontCare,
}

/// One attachment of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct AttachmentDescription {
    pub format: Format,
    pub samples: u32,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub initial_layout: ImageLayout,
    pub final_layout: ImageLayout,
}

/// Attachment indices used by one subpass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubpassDescription {
    /// Color attachments.
    pub color: Vec<u32>,
    /// Depth/stencil attachment.
    pub depth_stencil: Option<u32>,
    /// Input attachments.
    pub input: Vec<u32>,
}

/// An execution and memory dependency between two subpasses.
///
/// `None` stands for work outside the render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct SubpassDependency {
    pub src_subpass: Option<u32>,
    pub dst_subpass: Option<u32>,
    pub src_stage: PipelineStage,
    pub dst_stage: PipelineStage,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
}

/// Parameters for creating a render pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderPassDescriptor {
    /// Optional debug label.
    pub label: Option<String>,
    /// Attachments.
    pub attachments: Vec<AttachmentDescription>,
    /// Subpasses, executed in order.
    pub subpasses: Vec<SubpassDescription>,
    /// Dependencies between subpasses.
    pub dependencies: Vec<SubpassDependency>,
}

/// Parameters for creating a framebuffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramebufferDescriptor {
    /// Optional debug label.
    pub label: Option<String>,
    /// A compatible render pass.
    pub render_pass: RenderPassId,
    /// One view per attachment.
    pub attachments: Vec<ImageViewId>,
    /// Size of the framebuffer.
    pub extent: Extent2D,
    /// Number of layers.
    pub layers: u32,
}

/// A clear value for one attachment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

/// Parameters for beginning a render pass instance.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassBeginInfo {
    /// The pass.
    pub render_pass: RenderPassId,
    /// The framebuffer rendered to.
    pub framebuffer: FramebufferId,
    /// The render area, in pixels.
    pub area: Rect2D,
    /// Clear values, one per attachment.
    pub clear_values: Vec<ClearValue>,
}
