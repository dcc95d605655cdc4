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

//! Swapchains and the outcomes of acquiring and presenting their images.

use super::format::Format;
use crate::platform::WindowId;
use serde::{Deserialize, Serialize};

/// How presented images are queued for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum PresentMode {
    Immediate,
    Mailbox,
    #[default]
    Fifo,
}

/// Parameters for creating a swapchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapchainDescriptor {
    /// Optional debug label.
    pub label: Option<String>,
    /// The window presented to. Its inner size defines the image extent.
    pub window: WindowId,
    /// Image format.
    pub format: Format,
    /// Minimum number of images. The device may create more.
    pub min_image_count: u32,
    /// Presentation mode.
    pub present_mode: PresentMode,
}

/// The outcome of a successful call to `acquire_next_image`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireResult {
    /// An image is ready to be rendered to.
    Acquired {
        /// Index into the swapchain's images.
        image_index: u32,
        /// The swapchain still works but no longer matches the surface exactly.
        suboptimal: bool,
    },
    /// The swapchain no longer matches the surface and must be recreated.
    OutOfDate,
}

/// The outcome of a successful call to `queue_present`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentResult {
    /// The image was queued for display.
    Success,
    /// The image was queued but the swapchain should be recreated.
    Suboptimal,
    /// The image was not presented; the swapchain must be recreated.
    OutOfDate,
}

impl PresentResult {
    /// Returns `true` when the swapchain should be recreated.
    pub fn needs_resize(self) -> bool {
        !matches!(self, PresentResult::Success)
    }
}
