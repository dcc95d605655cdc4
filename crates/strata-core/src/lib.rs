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

//! # Strata Core
//!
//! Foundational crate containing traits, core types, and interface contracts
//! that define the engine's architecture: the abstract device boundary the
//! graph compiler and frame loop are written against, the native handle
//! vocabulary, the resource descriptors, and the engine settings.

#![warn(missing_docs)]

pub mod event;
pub mod graph;
pub mod math;
pub mod persistence;
pub mod platform;
pub mod renderer;
pub mod settings;

pub use settings::EngineSettings;
