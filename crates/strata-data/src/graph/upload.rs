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

//! Upload nodes: bulk data streamed into buffers and images at compile time.

use super::Ref;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strata_core::math::Extent3D;
use strata_core::renderer::api::{AccessFlags, Format, ImageLayout, PipelineStage};

/// Where upload bytes come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadSource {
    /// Bytes embedded in the graph.
    Memory(Vec<u8>),
    /// A byte range of a file, read by the upload worker.
    File {
        /// Path of the file.
        path: PathBuf,
        /// First byte to read.
        offset: u64,
        /// Number of bytes, or `None` to read to the end.
        length: Option<u64>,
    },
}

impl UploadSource {
    /// A short description for logs.
    pub fn describe(&self) -> String {
        match self {
            UploadSource::Memory(bytes) => format!("{} bytes in memory", bytes.len()),
            UploadSource::File { path, offset, .. } => {
                format!("'{}' at offset {offset}", path.display())
            }
        }
    }
}

/// How the source bytes of an image upload are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageEncoding {
    /// Tightly packed texels of one subresource.
    Raw {
        /// Texel format.
        format: Format,
        /// Size of the image.
        extent: Extent3D,
    },
    /// A KTX (version 1) container, possibly with mips, layers and faces.
    Ktx,
    /// A compressed picture (PNG, JPEG, ...) decoded to RGBA8.
    Encoded,
}

/// The access state destinations are handed over in once the copy completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTarget {
    /// Consumer access mask.
    pub access: AccessFlags,
    /// Consumer pipeline stage.
    pub stage: PipelineStage,
    /// Consumer layout, for images.
    pub layout: ImageLayout,
    /// Consumer queue node, or `None` to stay on the upload queue's family.
    pub queue: Option<Ref>,
}

impl Default for TransferTarget {
    fn default() -> Self {
        Self {
            access: AccessFlags::SHADER_READ,
            stage: PipelineStage::FRAGMENT_SHADER,
            layout: ImageLayout::ShaderReadOnly,
            queue: None,
        }
    }
}

/// One upload: a source copied into every instance of every destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadNode {
    /// The bytes.
    pub source: UploadSource,
    /// Buffer or image nodes. Per-frame destinations receive the data in
    /// every instance.
    pub destinations: Vec<Ref>,
    /// Bytes to copy into buffers, or `None` for the smallest destination capacity.
    pub size: Option<u64>,
    /// Offset of the copy inside destination buffers.
    pub dst_offset: u64,
    /// Layout of the source for image destinations.
    pub image_encoding: Option<ImageEncoding>,
    /// Hand-over state.
    pub target: TransferTarget,
}
