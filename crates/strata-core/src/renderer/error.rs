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

//! Defines the hierarchy of error types for the rendering boundary.

use super::api::{NativeHandle, ObjectKind};
use std::fmt;
use std::time::Duration;

/// An error related to the creation, update, or destruction of a native object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// The host ran out of memory.
    OutOfHostMemory,
    /// The device ran out of memory.
    OutOfDeviceMemory,
    /// The backend refused to create an object.
    CreationFailed {
        /// The kind of object requested.
        kind: ObjectKind,
        /// A description of the failure.
        reason: String,
    },
    /// A handle does not refer to a live object of the expected kind.
    InvalidHandle(NativeHandle),
    /// A write or copy fell outside the bounds of its target.
    OutOfBounds {
        /// The accessed object.
        handle: NativeHandle,
        /// First byte past the access.
        end: u64,
        /// Size of the object.
        size: u64,
    },
    /// A backend-specific error.
    BackendError(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::OutOfHostMemory => write!(f, "Out of host memory"),
            ResourceError::OutOfDeviceMemory => write!(f, "Out of device memory"),
            ResourceError::CreationFailed { kind, reason } => {
                write!(f, "Failed to create {kind}: {reason}")
            }
            ResourceError::InvalidHandle(handle) => {
                write!(f, "Invalid or destroyed handle: {handle:?}")
            }
            ResourceError::OutOfBounds { handle, end, size } => {
                write!(
                    f,
                    "Access ending at byte {end} is out of bounds for {handle:?} of size {size}"
                )
            }
            ResourceError::BackendError(msg) => write!(f, "Backend error: {msg}"),
        }
    }
}

impl std::error::Error for ResourceError {}

/// A high-level error produced while driving the device.
#[derive(Debug)]
pub enum RenderError {
    /// The device or backend has not been initialized.
    NotInitialized,
    /// The backend could not be initialized.
    InitializationFailed(String),
    /// A queue submission failed.
    SubmissionFailed(String),
    /// A present failed for a reason other than a stale or suboptimal swapchain.
    PresentationFailed(String),
    /// The device was lost.
    DeviceLost,
    /// A wait did not complete within its timeout.
    Timeout(Duration),
    /// A resource-level error.
    Resource(ResourceError),
    /// An internal invariant was broken.
    Internal(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::NotInitialized => write!(f, "Renderer is not initialized"),
            RenderError::InitializationFailed(msg) => {
                write!(f, "Renderer initialization failed: {msg}")
            }
            RenderError::SubmissionFailed(msg) => write!(f, "Queue submission failed: {msg}"),
            RenderError::PresentationFailed(msg) => write!(f, "Presentation failed: {msg}"),
            RenderError::DeviceLost => write!(f, "The graphics device was lost"),
            RenderError::Timeout(d) => write!(f, "Wait timed out after {d:?}"),
            RenderError::Resource(e) => write!(f, "Resource error: {e}"),
            RenderError::Internal(msg) => write!(f, "Internal renderer error: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Resource(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::Resource(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::BufferId;
    use std::error::Error;

    #[test]
    fn creation_failure_names_the_kind() {
        let err = ResourceError::CreationFailed {
            kind: ObjectKind::Pipeline,
            reason: "injected".into(),
        };
        assert_eq!(err.to_string(), "Failed to create Pipeline: injected");
    }

    #[test]
    fn resource_errors_chain_through_render_errors() {
        let inner = ResourceError::InvalidHandle(NativeHandle::Buffer(BufferId(3)));
        let err: RenderError = inner.clone().into();
        assert!(err.to_string().starts_with("Resource error: Invalid or destroyed handle"));
        let source = err.source().expect("resource errors carry a source");
        assert_eq!(source.to_string(), inner.to_string());
    }

    #[test]
    fn timeout_display() {
        let err = RenderError::Timeout(Duration::from_millis(5));
        assert_eq!(err.to_string(), "Wait timed out after 5ms");
    }
}
