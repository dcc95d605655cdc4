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

//! A window without a platform surface, driven programmatically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use strata_core::event::EventBus;
use strata_core::math::Extent2D;
use strata_core::platform::{StrataWindow, WindowEvent, WindowId};

static NEXT_WINDOW_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy)]
struct SurfaceState {
    extent: Extent2D,
    minimized: bool,
}

/// A window whose size and visibility are changed by calling its methods.
///
/// Every change is published on the window's event bus, exactly like a
/// platform window would report it, so the frame loop cannot tell the
/// difference.
#[derive(Debug)]
pub struct HeadlessWindow {
    id: WindowId,
    title: String,
    state: Mutex<SurfaceState>,
    events: EventBus<WindowEvent>,
}

/// A builder for creating [`HeadlessWindow`] instances.
pub struct HeadlessWindowBuilder {
    title: String,
    width: u32,
    height: u32,
}

impl HeadlessWindowBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            title: "Strata".to_string(),
            width: 1024,
            height: 768,
        }
    }

    /// Sets the title of the window to be built.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the initial inner dimensions of the window to be built.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Builds the window.
    pub fn build(self) -> HeadlessWindow {
        let id = WindowId(NEXT_WINDOW_ID.fetch_add(1, Ordering::Relaxed));
        log::info!(
            "Headless window {:?} created: '{}' ({}x{})",
            id,
            self.title,
            self.width,
            self.height
        );
        HeadlessWindow {
            id,
            title: self.title,
            state: Mutex::new(SurfaceState {
                extent: Extent2D::new(self.width, self.height),
                minimized: false,
            }),
            events: EventBus::new(),
        }
    }
}

impl Default for HeadlessWindowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessWindow {
    /// The window title.
    pub fn title(&self) -> &str {
        &self.title
    }

    fn update<R>(&self, f: impl FnOnce(&mut SurfaceState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut state)
    }

    /// Changes the inner size and reports it.
    pub fn resize(&self, width: u32, height: u32) {
        let extent = Extent2D::new(width, height);
        self.update(|s| s.extent = extent);
        log::debug!("Headless window {:?} resized to {width}x{height}", self.id);
        self.events.publish(WindowEvent::Resized(extent));
    }

    /// Minimizes the window. Its swapchains go out of date until it is restored.
    pub fn minimize(&self) {
        if self.update(|s| std::mem::replace(&mut s.minimized, true)) {
            return;
        }
        self.events.publish(WindowEvent::Minimized);
    }

    /// Restores a minimized window.
    pub fn restore(&self) {
        if !self.update(|s| std::mem::replace(&mut s.minimized, false)) {
            return;
        }
        self.events.publish(WindowEvent::Restored);
    }

    /// Reports a close request, as if the user clicked the close button.
    pub fn request_close(&self) {
        self.events.publish(WindowEvent::CloseRequested);
    }
}

impl StrataWindow for HeadlessWindow {
    fn id(&self) -> WindowId {
        self.id
    }

    fn inner_size(&self) -> Extent2D {
        self.update(|s| s.extent)
    }

    fn is_minimized(&self) -> bool {
        self.update(|s| s.minimized)
    }

    fn poll_events(&self) -> Vec<WindowEvent> {
        self.events.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_title_and_size() {
        let window = HeadlessWindowBuilder::new()
            .with_title("probe")
            .with_dimensions(320, 200)
            .build();
        assert_eq!(window.title(), "probe");
        assert_eq!(window.inner_size(), Extent2D::new(320, 200));
        assert!(!window.is_minimized());
        assert!(window.poll_events().is_empty());
    }

    #[test]
    fn windows_get_distinct_ids() {
        let a = HeadlessWindowBuilder::new().build();
        let b = HeadlessWindowBuilder::new().build();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn state_changes_are_reported_once() {
        let window = HeadlessWindowBuilder::new().build();
        window.minimize();
        window.minimize();
        window.restore();
        window.restore();
        window.resize(640, 480);
        window.request_close();

        assert_eq!(
            window.poll_events(),
            vec![
                WindowEvent::Minimized,
                WindowEvent::Restored,
                WindowEvent::Resized(Extent2D::new(640, 480)),
                WindowEvent::CloseRequested,
            ]
        );
        assert!(window.poll_events().is_empty());
        assert_eq!(window.inner_size(), Extent2D::new(640, 480));
    }
}
