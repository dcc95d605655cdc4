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

use strata_core::renderer::{RenderError, ResourceError};
use strata_data::GraphError;
use strata_lanes::{RecordError, UploadError};
use thiserror::Error;

/// Why a compile, load or resize was aborted.
///
/// Every variant raised while building a node carries that node's label
/// (arena index, category and id).
#[derive(Debug, Error)]
pub enum CompileError {
    /// The graph failed analysis.
    #[error("invalid graph: {0}")]
    Graph(#[from] GraphError),
    /// The device refused to create an object.
    #[error("failed to create {node}: {source}")]
    Creation {
        /// The failing node.
        node: String,
        /// The device error.
        #[source]
        source: ResourceError,
    },
    /// A creation dependency did not resolve to an object of the expected kind.
    #[error("{node}: {reference} does not resolve to a {expected}")]
    Unresolved {
        /// The failing node.
        node: String,
        /// The reference, as written in the graph.
        reference: String,
        /// The expected object kind.
        expected: &'static str,
    },
    /// An upload task failed.
    #[error("upload {node} failed: {source}")]
    Upload {
        /// The upload node.
        node: String,
        /// The upload error.
        #[source]
        source: UploadError,
    },
    /// A command context could not be recorded.
    #[error("failed to record {node}: {source}")]
    Record {
        /// The command context node.
        node: String,
        /// The recording error.
        #[source]
        source: RecordError,
    },
    /// A device operation outside object creation failed.
    #[error("{node}: {source}")]
    Render {
        /// The node being processed, or the operation.
        node: String,
        /// The device error.
        #[source]
        source: RenderError,
    },
    /// The graph is well-formed but cannot be built.
    #[error("{node}: {reason}")]
    Invalid {
        /// The offending node.
        node: String,
        /// What is wrong with it.
        reason: String,
    },
    /// `init` was called twice.
    #[error("the compiler is already initialized")]
    AlreadyInitialized,
    /// An operation needs `init` to have succeeded first.
    #[error("the compiler is not initialized")]
    NotInitialized,
}

impl CompileError {
    /// The label of the node the error was raised for, if any.
    pub fn node(&self) -> Option<&str> {
        match self {
            CompileError::Creation { node, .. }
            | CompileError::Unresolved { node, .. }
            | CompileError::Upload { node, .. }
            | CompileError::Record { node, .. }
            | CompileError::Render { node, .. }
            | CompileError::Invalid { node, .. } => Some(node),
            CompileError::Graph(_) | CompileError::AlreadyInitialized | CompileError::NotInitialized => None,
        }
    }

    /// Returns `true` if an upload broke its contract (for example an image
    /// whose declared extent differs from its source).
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, CompileError::Upload { source, .. } if source.is_contract_violation())
    }
}
