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

//! Upload tasks, their outcome and the handle used to wait for it.

use std::path::PathBuf;
use strata_core::renderer::api::{
    AccessFlags, BufferId, ImageDescriptor, ImageId, ImageLayout, PipelineStage,
};
use strata_core::renderer::{RenderError, ResourceError};
use strata_data::graph::{ImageEncoding, UploadSource};

/// An error that fails one upload task.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The task has nothing to copy into.
    #[error("upload '{0}' has no destination")]
    NoDestination(String),
    /// The source file could not be read.
    #[error("failed to read '{}': {source}", .path.display())]
    Source {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The source bytes could not be decoded into an image.
    #[error("failed to decode image data: {0}")]
    Decode(String),
    /// The task's declaration disagrees with its data, e.g. a pre-existing
    /// destination image whose extent differs from the source.
    #[error("upload contract violation: {0}")]
    ContractViolation(String),
    /// A device object could not be created or written.
    #[error(transparent)]
    Resource(#[from] ResourceError),
    /// Recording, submission or the completion wait failed.
    #[error(transparent)]
    Render(#[from] RenderError),
    /// The engine was shut down before the task ran.
    #[error("the upload engine has shut down")]
    Shutdown,
}

impl UploadError {
    /// Returns `true` for errors the compiler must treat as fatal regardless
    /// of its failure policy.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, UploadError::ContractViolation(_))
    }
}

/// The access state destinations are handed over in once the copy completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerState {
    /// Consumer access mask.
    pub access: AccessFlags,
    /// Consumer pipeline stage.
    pub stage: PipelineStage,
    /// Consumer layout, for images.
    pub layout: ImageLayout,
    /// Consumer queue family. Ownership is released to it when it differs
    /// from the upload queue's family.
    pub queue_family: Option<u32>,
}

impl Default for ConsumerState {
    fn default() -> Self {
        Self {
            access: AccessFlags::SHADER_READ,
            stage: PipelineStage::FRAGMENT_SHADER,
            layout: ImageLayout::ShaderReadOnly,
            queue_family: None,
        }
    }
}

/// Where the bytes of a task go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadDestination {
    /// An existing buffer of `capacity` bytes.
    Buffer {
        /// The buffer.
        buffer: BufferId,
        /// Its size in bytes.
        capacity: u64,
    },
    /// An existing image, created from `descriptor`.
    Image {
        /// The image.
        image: ImageId,
        /// What the image was created with; checked against the source.
        descriptor: ImageDescriptor,
    },
    /// An image created by the task. Format, extent, levels and layers are
    /// taken from the source; the rest of the descriptor is kept.
    NewImage(ImageDescriptor),
}

/// One unit of upload work.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTask {
    /// Name used in logs and errors.
    pub label: String,
    /// The bytes.
    pub source: UploadSource,
    /// Every destination receives the same data.
    pub destinations: Vec<UploadDestination>,
    /// Bytes copied into buffers, or `None` for the smallest buffer capacity.
    pub size: Option<u64>,
    /// Offset of the copy inside buffers.
    pub dst_offset: u64,
    /// Layout of the source for image destinations. `None` detects KTX
    /// containers and otherwise decodes the source as a picture.
    pub encoding: Option<ImageEncoding>,
    /// Hand-over state.
    pub consumer: ConsumerState,
}

impl UploadTask {
    /// A task copying `source` into `destinations` with default settings.
    pub fn new(
        label: impl Into<String>,
        source: UploadSource,
        destinations: Vec<UploadDestination>,
    ) -> Self {
        Self {
            label: label.into(),
            source,
            destinations,
            size: None,
            dst_offset: 0,
            encoding: None,
            consumer: ConsumerState::default(),
        }
    }

    /// Sets the image encoding of the source.
    pub fn with_encoding(mut self, encoding: ImageEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Sets the hand-over state.
    pub fn with_consumer(mut self, consumer: ConsumerState) -> Self {
        self.consumer = consumer;
        self
    }
}

/// What a completed task did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// The task label.
    pub label: String,
    /// Size of the staging buffer.
    pub staged_bytes: u64,
    /// Copy regions recorded, buffers and images together.
    pub regions: usize,
    /// Images created by the task, in destination order.
    pub created_images: Vec<(ImageId, ImageDescriptor)>,
}

/// The pending outcome of a submitted task.
///
/// Dropping the handle does not cancel the task.
#[derive(Debug)]
pub struct UploadHandle {
    label: String,
    receiver: flume::Receiver<Result<UploadReceipt, UploadError>>,
    outcome: Option<Result<UploadReceipt, UploadError>>,
}

impl UploadHandle {
    pub(crate) fn new(
        label: String,
        receiver: flume::Receiver<Result<UploadReceipt, UploadError>>,
    ) -> Self {
        Self {
            label,
            receiver,
            outcome: None,
        }
    }

    /// The task label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the outcome if the task has completed, without blocking.
    pub fn poll(&mut self) -> Option<&Result<UploadReceipt, UploadError>> {
        if self.outcome.is_none() {
            self.outcome = match self.receiver.try_recv() {
                Ok(outcome) => Some(outcome),
                Err(flume::TryRecvError::Empty) => None,
                Err(flume::TryRecvError::Disconnected) => Some(Err(UploadError::Shutdown)),
            };
        }
        self.outcome.as_ref()
    }

    /// Blocks until the task completes.
    pub fn finish(self) -> Result<UploadReceipt, UploadError> {
        match self.outcome {
            Some(outcome) => outcome,
            None => self.receiver.recv().unwrap_or(Err(UploadError::Shutdown)),
        }
    }
}
