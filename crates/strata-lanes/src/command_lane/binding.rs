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

use strata_core::math::Extent2D;
use strata_core::renderer::api::{FramebufferId, NativeHandle};
use strata_data::Ref;

/// What a recording needs from the outside world.
///
/// The compiler implements this over its compiled graph; tests implement it
/// over a plain map.
pub trait Bindings {
    /// Resolves `reference` for slot `index`.
    ///
    /// Per-frame objects yield their `index`-th instance, other objects their
    /// only one. Returns `None` when the reference does not resolve.
    fn resolve(&self, reference: &Ref, index: usize) -> Option<NativeHandle>;

    /// Extent fractional regions resolve against outside render passes.
    fn surface_extent(&self) -> Extent2D;

    /// Extent of a framebuffer, used for regions inside its render pass.
    fn framebuffer_extent(&self, framebuffer: FramebufferId) -> Option<Extent2D>;
}
