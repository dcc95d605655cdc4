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

//! Command pools and the fixed-function state recorded into command buffers.

use super::handle::QueueId;
use serde::{Deserialize, Serialize};

/// Parameters for creating a command pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandPoolDescriptor {
    /// Optional debug label.
    pub label: Option<String>,
    /// Queue whose family the pool allocates for.
    pub queue: QueueId,
    /// Buffers are short-lived.
    pub transient: bool,
    /// Buffers may be reset individually.
    pub resettable: bool,
}

/// Level of a command buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum CommandBufferLevel {
    #[default]
    Primary,
    Secondary,
}

/// Which pipeline slot a bind targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum PipelineBindPoint {
    #[default]
    Graphics,
    Compute,
}

/// Width of the indices in an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum IndexType {
    U16,
    #[default]
    U32,
}

/// An absolute viewport transform.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}
