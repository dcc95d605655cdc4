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

//! Contains the public API for the rendering boundary: handles, descriptors,
//! and synchronization types shared by the engine and every backend.

pub mod buffer;
pub mod command;
pub mod descriptor;
pub mod format;
pub mod handle;
pub mod image;
pub mod pass;
pub mod pipeline;
pub mod query;
pub mod swapchain;
pub mod sync;

pub use buffer::*;
pub use command::*;
pub use descriptor::*;
pub use format::*;
pub use handle::*;
pub use image::*;
pub use pass::*;
pub use pipeline::*;
pub use query::*;
pub use swapchain::*;
pub use sync::*;
