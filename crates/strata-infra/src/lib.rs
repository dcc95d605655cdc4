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

//! # Strata Infra
//!
//! Concrete implementations of the boundaries declared in `strata-core`.
//!
//! The crate ships a headless backend: windows and a device that live in host
//! memory. The device runs every queue on its own executor thread, so fences,
//! semaphores and queue ordering behave like a real device, while copies and
//! recorded command streams stay inspectable from tests.

#![warn(missing_docs)]

pub mod graphics;
pub mod platform;

pub use graphics::headless::{DeviceEvent, HeadlessBackend, HeadlessDevice, RecordedCommand};
pub use platform::window::{HeadlessWindow, HeadlessWindowBuilder};
