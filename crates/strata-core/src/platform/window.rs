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

use crate::math::Extent2D;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Identifies a window created by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u64);

/// Parameters for creating a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDescriptor {
    /// The title shown by the platform.
    pub title: String,
    /// The requested inner size, in physical pixels.
    pub extent: Extent2D,
}

/// Surface state changes reported by a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// The user asked to close the window.
    CloseRequested,
    /// The window was minimized; its surface can no longer be presented to.
    Minimized,
    /// The window came back from a minimized state.
    Restored,
    /// The inner size changed.
    Resized(Extent2D),
}

/// A trait that abstracts the behavior of a window.
///
/// Any windowing backend can implement this trait to drive the Strata frame
/// loop. Implementations must be thread-safe because windows are shared
/// between the device (for swapchain creation) and the frame coordinator.
pub trait StrataWindow: Debug + Send + Sync {
    /// Returns the unique identifier for the window.
    fn id(&self) -> WindowId;

    /// Returns the physical dimensions of the window's inner area.
    fn inner_size(&self) -> Extent2D;

    /// Returns `true` while the window is minimized.
    fn is_minimized(&self) -> bool;

    /// Takes every event queued since the last call, oldest first.
    fn poll_events(&self) -> Vec<WindowEvent>;
}
