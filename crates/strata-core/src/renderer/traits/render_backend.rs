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

use crate::platform::{StrataWindow, WindowDescriptor};
use crate::renderer::error::RenderError;
use crate::renderer::traits::GraphicsDevice;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Parameters for creating a logical device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Optional debug label.
    pub label: Option<String>,
    /// Enables backend validation.
    pub validation: bool,
}

/// The entry point of a backend: creates windows and the device that renders to them.
///
/// Windows created by a backend must be usable by the swapchains of any
/// device the same backend creates.
pub trait RenderBackend: Send + Sync {
    /// A short human-readable name, used in logs.
    fn name(&self) -> &str;

    /// Creates a window.
    fn create_window(
        &self,
        descriptor: &WindowDescriptor,
    ) -> Result<Arc<dyn StrataWindow>, RenderError>;

    /// Creates a logical device.
    fn create_device(
        &self,
        descriptor: &DeviceDescriptor,
    ) -> Result<Arc<dyn GraphicsDevice>, RenderError>;
}
