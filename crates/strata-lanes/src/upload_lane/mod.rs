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

//! Upload lane - streams bulk data into device buffers and images.
//!
//! A task's bytes are read and, for images, decoded on a worker thread. The
//! worker then takes one of a fixed number of transfer contexts, copies
//! through a host-visible staging buffer and waits on the context's fence.
//! The destinations are left in the consumer's access state, with a queue
//! family release recorded when the consumer lives on another family.

mod context;
mod engine;
pub mod ktx;
mod source;
mod task;

pub use context::{ContextGuard, ContextPool, TransferContext};
pub use engine::{execute, UploadConfig, UploadEngine};
pub use source::{decode_image, read_source, ImagePayload};
pub use task::*;
