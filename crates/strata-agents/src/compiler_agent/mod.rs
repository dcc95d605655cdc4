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

//! Acts as the agent that turns declarative graphs into live device objects.
//!
//! Compiles run category by category in ownership order. Per-frame nodes get
//! one instance per swapchain image; uploads run on the upload engine's
//! workers while the rest of the graph is built; command contexts are
//! recorded once every object they reference exists.

mod agent;
mod build;
mod compiled;
mod error;

pub use agent::GraphCompiler;
pub use compiled::{CameraEntry, CompiledGraph, ContextEntry, CoordinatorEntry, SwapchainState};
pub use error::CompileError;
