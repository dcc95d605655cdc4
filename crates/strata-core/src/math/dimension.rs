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

//! Provides structs for representing extents (sizes), origins (offsets) and
//! rectangles in 2D and 3D.
//!
//! Absolute types use integer (`u32`) components, making them suitable for
//! pixel-based coordinates. [`Region`] is the declarative counterpart: its
//! components may be fractions of an extent that is only known at record time.

use serde::{Deserialize, Serialize};

/// A two-dimensional extent, typically representing width and height.
///
/// This is commonly used for surface, framebuffer or image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Extent2D {
    /// The width component of the extent.
    pub width: u32,
    /// The height component of the extent.
    pub height: u32,
}

impl Extent2D {
    /// Creates a new extent.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns `true` if either component is zero (e.g. a minimized surface).
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A three-dimensional extent, representing width, height, and depth.
///
/// This is used for 3D images, image arrays, or cubemaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Extent3D {
    /// The width component of the extent.
    pub width: u32,
    /// The height component of the extent.
    pub height: u32,
    /// The depth of the extent. Array layers are tracked separately.
    pub depth: u32,
}

impl Extent3D {
    /// Creates a new extent.
    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Returns the extent of the given mip level, clamping each axis to 1.
    pub fn mip_level(&self, level: u32) -> Self {
        Self {
            width: (self.width >> level).max(1),
            height: (self.height >> level).max(1),
            depth: (self.depth >> level).max(1),
        }
    }

    /// Drops the depth component.
    pub fn to_2d(self) -> Extent2D {
        Extent2D::new(self.width, self.height)
    }
}

impl From<Extent2D> for Extent3D {
    fn from(extent: Extent2D) -> Self {
        Self::new(extent.width, extent.height, 1)
    }
}

/// A three-dimensional origin, representing an (x, y, z) offset.
///
/// This is often used to specify the corner of a copy region inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Origin3D {
    /// The x-coordinate of the origin.
    pub x: u32,
    /// The y-coordinate of the origin.
    pub y: u32,
    /// The z-coordinate of the origin.
    pub z: u32,
}

/// An absolute pixel rectangle: a signed offset and an extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect2D {
    /// The x-coordinate of the top-left corner.
    pub x: i32,
    /// The y-coordinate of the top-left corner.
    pub y: i32,
    /// The size of the rectangle.
    pub extent: Extent2D,
}

impl Rect2D {
    /// A rectangle covering the whole of `extent`.
    pub fn full(extent: Extent2D) -> Self {
        Self {
            x: 0,
            y: 0,
            extent,
        }
    }
}

/// A rectangle whose components may be relative to an extent.
///
/// Each component follows the same rule:
/// - a value `>= 1.0` is an absolute number of pixels,
/// - a value in `[0.0, 1.0)` is a fraction of the matching axis of the extent,
/// - a `width`/`height` of exactly `0.0` means the full extent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Region {
    /// Horizontal offset.
    pub x: f32,
    /// Vertical offset.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Region {
    /// A region that always covers the whole extent.
    pub const FULL: Region = Region {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    /// Creates a new region.
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Resolves this region to absolute pixels against `extent`.
    pub fn resolve(&self, extent: Extent2D) -> Rect2D {
        Rect2D {
            x: resolve_component(self.x, extent.width) as i32,
            y: resolve_component(self.y, extent.height) as i32,
            extent: Extent2D {
                width: resolve_size(self.width, extent.width),
                height: resolve_size(self.height, extent.height),
            },
        }
    }
}

/// Resolves one offset component against the matching axis length.
pub fn resolve_component(value: f32, full: u32) -> u32 {
    if value <= 0.0 {
        0
    } else if value < 1.0 {
        (value * full as f32).round() as u32
    } else {
        value as u32
    }
}

/// Resolves one size component, where `0.0` selects the whole axis.
pub fn resolve_size(value: f32, full: u32) -> u32 {
    if value == 0.0 {
        full
    } else {
        resolve_component(value, full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_region_covers_extent() {
        let rect = Region::FULL.resolve(Extent2D::new(800, 600));
        assert_eq!(rect, Rect2D::full(Extent2D::new(800, 600)));
    }

    #[test]
    fn fractions_follow_the_extent() {
        let region = Region::new(0.5, 0.25, 0.5, 0.5);
        let rect = region.resolve(Extent2D::new(800, 600));
        assert_eq!(rect.x, 400);
        assert_eq!(rect.y, 150);
        assert_eq!(rect.extent, Extent2D::new(400, 300));

        let resized = region.resolve(Extent2D::new(1024, 768));
        assert_eq!(resized.x, 512);
        assert_eq!(resized.extent, Extent2D::new(512, 384));
    }

    #[test]
    fn absolute_values_are_kept() {
        let rect = Region::new(10.0, 20.0, 64.0, 32.0).resolve(Extent2D::new(800, 600));
        assert_eq!(rect.x, 10);
        assert_eq!(rect.y, 20);
        assert_eq!(rect.extent, Extent2D::new(64, 32));
    }

    #[test]
    fn mip_extent_never_reaches_zero() {
        let extent = Extent3D::new(16, 4, 1);
        assert_eq!(extent.mip_level(2), Extent3D::new(4, 1, 1));
        assert_eq!(extent.mip_level(4), Extent3D::new(1, 1, 1));
    }

    #[test]
    fn fraction_rounds_to_nearest_pixel() {
        let pixels = resolve_component(1.0 / 3.0, 100);
        approx::assert_abs_diff_eq!(pixels as f32, 33.0);
    }
}
