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

//! The public-facing Software Development Kit (SDK) for the Strata engine.
//!
//! An [`Engine`] owns a graph compiler and one frame coordinator per
//! `FrameCoordinator` node of the loaded graph. Applications describe what
//! to render as a [`Graph`](strata_data::Graph), hand it to
//! [`Engine::init`], then drive frames with [`Engine::run`] or
//! [`Engine::frame`].

mod engine;

pub use engine::Engine;

/// Everything needed to declare and run a graph.
pub mod prelude {
    pub use crate::Engine;
    pub use strata_agents::{CompileError, FrameError, FrameOutcome};
    pub use strata_core::math::{Extent2D, Extent3D, Region};
    pub use strata_core::renderer::api::*;
    pub use strata_core::renderer::{RenderBackend, RenderError};
    pub use strata_core::EngineSettings;
    pub use strata_data::graph::*;
    pub use strata_data::{Graph, Instance, Node, NodeRef, Ref};
    pub use strata_infra::HeadlessBackend;
}
