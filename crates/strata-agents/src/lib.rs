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

//! # Strata Agents
//!
//! The orchestration layer: the [`GraphCompiler`] builds graphs and keeps
//! them consistent across loads and resizes, and the [`FrameCoordinator`]
//! runs the frame cycle over what it built.

#![warn(missing_docs)]

pub mod compiler_agent;
pub mod frame_agent;

pub use compiler_agent::{CompileError, CompiledGraph, GraphCompiler};
pub use frame_agent::{FrameCoordinator, FrameError, FrameOutcome, FrameState};
