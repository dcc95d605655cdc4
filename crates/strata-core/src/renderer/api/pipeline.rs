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

//! Shader modules, pipeline layouts and pipelines.

use super::descriptor::ShaderStages;
use super::handle::{DescriptorSetLayoutId, PipelineLayoutId, RenderPassId, ShaderModuleId};
use serde::{Deserialize, Serialize};

/// Parameters for creating a shader module from precompiled code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderModuleDescriptor {
    /// Optional debug label.
    pub label: Option<String>,
    /// Compiled shader code.
    pub code: Vec<u32>,
}

/// A single programmable stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

/// A shader module bound to a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderStageDescriptor {
    /// The module.
    pub module: ShaderModuleId,
    /// The stage it runs in.
    pub stage: ShaderStage,
    /// Entry point name.
    pub entry_point: String,
}

/// A push constant range of a pipeline layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct PushConstantRange {
    pub stages: ShaderStages,
    pub offset: u32,
    pub size: u32,
}

/// Parameters for creating a pipeline layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineLayoutDescriptor {
    /// Optional debug label.
    pub label: Option<String>,
    /// Set layouts, in set order.
    pub set_layouts: Vec<DescriptorSetLayoutId>,
    /// Push constant ranges.
    pub push_constants: Vec<PushConstantRange>,
}

/// Vertex attribute formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum VertexFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
    Uint32,
    Unorm8x4,
}

/// Rate at which a vertex buffer advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum VertexStepMode {
    #[default]
    Vertex,
    Instance,
}

/// The layout of one bound vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct VertexBufferLayout {
    pub binding: u32,
    pub stride: u32,
    pub step_mode: VertexStepMode,
}

/// One vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct VertexAttribute {
    pub location: u32,
    pub binding: u32,
    pub format: VertexFormat,
    pub offset: u32,
}

/// Primitive assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    #[default]
    TriangleList,
    TriangleStrip,
}

/// Face culling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum CullMode {
    #[default]
    None,
    Front,
    Back,
}

/// Fixed-function state of a graphics pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterState {
    /// Vertex buffer layouts.
    pub vertex_buffers: Vec<VertexBufferLayout>,
    /// Vertex attributes.
    pub vertex_attributes: Vec<VertexAttribute>,
    /// Primitive topology.
    pub topology: PrimitiveTopology,
    /// Culling.
    pub cull_mode: CullMode,
    /// Depth test enabled.
    pub depth_test: bool,
    /// Depth writes enabled.
    pub depth_write: bool,
    /// Alpha blending on every color attachment.
    pub blend: bool,
}

/// Parameters for creating a graphics pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicsPipelineDescriptor {
    /// Optional debug label.
    pub label: Option<String>,
    /// Layout.
    pub layout: PipelineLayoutId,
    /// A compatible render pass.
    pub render_pass: RenderPassId,
    /// Subpass index within the render pass.
    pub subpass: u32,
    /// Programmable stages.
    pub stages: Vec<ShaderStageDescriptor>,
    /// Fixed-function state.
    pub raster: RasterState,
}

/// Parameters for creating a compute pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputePipelineDescriptor {
    /// Optional debug label.
    pub label: Option<String>,
    /// Layout.
    pub layout: PipelineLayoutId,
    /// The compute stage.
    pub stage: ShaderStageDescriptor,
}
