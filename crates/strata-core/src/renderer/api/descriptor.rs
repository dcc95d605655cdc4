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

//! Descriptor set layouts, pools, sets and the writes that fill them.

use super::handle::{
    BufferId, DescriptorPoolId, DescriptorSetId, DescriptorSetLayoutId, ImageViewId, SamplerId,
};
use super::sync::ImageLayout;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Shader stages a resource or push constant range is visible to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ShaderStages: u32 {
        /// Vertex stage.
        const VERTEX = 1 << 0;
        /// Fragment stage.
        const FRAGMENT = 1 << 1;
        /// Compute stage.
        const COMPUTE = 1 << 2;
    }
}

/// The type of resource bound at a descriptor binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum DescriptorType {
    UniformBuffer,
    StorageBuffer,
    SampledImage,
    StorageImage,
    Sampler,
    CombinedImageSampler,
}

/// One binding slot of a set layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DescriptorSetLayoutBinding {
    /// Binding number.
    pub binding: u32,
    /// Resource type.
    pub ty: DescriptorType,
    /// Array size.
    pub count: u32,
    /// Visible stages.
    pub stages: ShaderStages,
}

/// Parameters for creating a descriptor set layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorSetLayoutDescriptor {
    /// Optional debug label.
    pub label: Option<String>,
    /// The bindings.
    pub bindings: Vec<DescriptorSetLayoutBinding>,
}

/// Parameters for creating a descriptor pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorPoolDescriptor {
    /// Optional debug label.
    pub label: Option<String>,
    /// Maximum number of sets.
    pub max_sets: u32,
    /// Capacity per descriptor type.
    pub sizes: Vec<(DescriptorType, u32)>,
}

/// Parameters for allocating a descriptor set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorSetDescriptor {
    /// Optional debug label.
    pub label: Option<String>,
    /// Pool to allocate from.
    pub pool: DescriptorPoolId,
    /// Layout of the set.
    pub layout: DescriptorSetLayoutId,
}

/// A resource written into a descriptor binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum DescriptorResource {
    Buffer {
        buffer: BufferId,
        offset: u64,
        range: Option<u64>,
    },
    Image {
        view: ImageViewId,
        layout: ImageLayout,
    },
    Sampler(SamplerId),
    CombinedImageSampler {
        view: ImageViewId,
        sampler: SamplerId,
        layout: ImageLayout,
    },
}

/// One update to a descriptor set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorWrite {
    /// The updated set.
    pub set: DescriptorSetId,
    /// Binding number.
    pub binding: u32,
    /// Array element within the binding.
    pub array_element: u32,
    /// The written resource.
    pub resource: DescriptorResource,
}
