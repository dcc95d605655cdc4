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

//! What a compile leaves behind: one instance slot per node, swapchain
//! state, and the engine-side host objects.

use std::collections::HashMap;
use std::sync::Arc;
use strata_core::math::Extent2D;
use strata_core::platform::WindowId;
use strata_core::renderer::api::{
    FramebufferId, ImageDescriptor, ImageId, ImageViewId, NativeHandle, SwapchainId,
};
use strata_data::graph::{
    CameraNode, CommandNode, FrameCoordinatorNode, PresentNode, QueueSubmitNode,
};
use strata_data::{Graph, GraphLayout, IdTable, Instance, NodeRef, Ref};
use strata_lanes::{Bindings, CommandContext};

/// A swapchain as the compiler last saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapchainState {
    /// The swapchain.
    pub swapchain: SwapchainId,
    /// The window it presents to.
    pub window: WindowId,
    /// Current image extent.
    pub extent: Extent2D,
    /// Current images; their count is N for every per-frame node bound here.
    pub images: Vec<ImageId>,
}

/// A camera host object.
#[derive(Debug, Clone)]
pub struct CameraEntry {
    /// The camera node.
    pub node: NodeRef,
    /// Its parameters.
    pub camera: CameraNode,
}

/// A command context host object.
#[derive(Debug)]
pub struct ContextEntry {
    /// The command context node.
    pub node: NodeRef,
    /// The cache.
    pub context: CommandContext,
}

/// A frame coordinator host object.
#[derive(Debug, Clone)]
pub struct CoordinatorEntry {
    /// The coordinator node.
    pub node: NodeRef,
    /// The swapchain of its frame node.
    pub swapchain: NodeRef,
    /// Frame slots, clamped to the swapchain's image count.
    pub frames_in_flight: u32,
    /// The declaration.
    pub desc: FrameCoordinatorNode,
}

/// A compiled graph.
#[derive(Debug)]
pub struct CompiledGraph {
    graph: Graph,
    layout: GraphLayout,
    pub(crate) instances: Vec<Option<Instance>>,
    pub(crate) swapchains: HashMap<NodeRef, SwapchainState>,
    pub(crate) image_descriptors: HashMap<ImageId, ImageDescriptor>,
    pub(crate) view_extents: HashMap<ImageViewId, Extent2D>,
    pub(crate) framebuffer_extents: HashMap<FramebufferId, Extent2D>,
    pub(crate) trees: HashMap<NodeRef, Arc<CommandNode>>,
    pub(crate) cameras: Vec<CameraEntry>,
    pub(crate) contexts: Vec<ContextEntry>,
    pub(crate) submits: Vec<QueueSubmitNode>,
    pub(crate) presents: Vec<PresentNode>,
    pub(crate) coordinators: Vec<CoordinatorEntry>,
}

impl CompiledGraph {
    pub(crate) fn new(graph: Graph, layout: GraphLayout) -> Self {
        let instances = vec![None; graph.len()];
        Self {
            graph,
            layout,
            instances,
            swapchains: HashMap::new(),
            image_descriptors: HashMap::new(),
            view_extents: HashMap::new(),
            framebuffer_extents: HashMap::new(),
            trees: HashMap::new(),
            cameras: Vec::new(),
            contexts: Vec::new(),
            submits: Vec::new(),
            presents: Vec::new(),
            coordinators: Vec::new(),
        }
    }

    /// The graph this was compiled from.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Compile order and per-frame bindings.
    pub fn layout(&self) -> &GraphLayout {
        &self.layout
    }

    /// A label for logs and errors: arena index, category and id.
    pub fn label(&self, node: NodeRef) -> String {
        match self.graph.node(node) {
            Some(n) => format!("{node} {}", n.label()),
            None => node.to_string(),
        }
    }

    /// The instance built for a node, if any.
    pub fn instance(&self, node: NodeRef) -> Option<&Instance> {
        self.instances.get(node.index()).and_then(Option::as_ref)
    }

    /// State of a swapchain node.
    pub fn swapchain(&self, node: NodeRef) -> Option<&SwapchainState> {
        self.swapchains.get(&node)
    }

    /// Swapchain nodes, in arena order.
    pub fn swapchain_nodes(&self) -> Vec<NodeRef> {
        let mut nodes: Vec<NodeRef> = self.swapchains.keys().copied().collect();
        nodes.sort();
        nodes
    }

    /// Number of instances a node gets: the image count of its swapchain
    /// when it is per-frame, otherwise one.
    pub fn instance_count(&self, node: NodeRef) -> usize {
        match self.layout.swapchain_of(node) {
            Some(swapchain) => self
                .swapchains
                .get(&swapchain)
                .map_or(0, |state| state.images.len()),
            None => 1,
        }
    }

    /// Resolves a reference for image (or slot) `index`.
    ///
    /// Names carried by a node of this graph resolve to that node; other
    /// names are looked up in `ids`, which logs a warning when they are
    /// missing.
    pub fn resolve(&self, ids: &IdTable, reference: &Ref, index: usize) -> Option<NativeHandle> {
        match reference {
            Ref::Node(node) => self.instance(*node)?.at(index),
            Ref::Named(name) => match self.graph.find_by_id(name) {
                Some(node) => self.instance(node)?.at(index),
                None => ids.find(name)?.at(index),
            },
        }
    }

    /// The extent regions resolve against for commands recorded into
    /// `command_buffer`: its swapchain's, else the first swapchain's.
    pub fn surface_extent_for(&self, command_buffer: &Ref) -> Extent2D {
        self.graph
            .resolve(command_buffer)
            .and_then(|node| self.layout.swapchain_of(node))
            .or_else(|| self.swapchain_nodes().first().copied())
            .and_then(|swapchain| self.swapchains.get(&swapchain))
            .map_or(Extent2D::new(0, 0), |state| state.extent)
    }

    /// Camera host object `index`.
    pub fn camera(&self, index: usize) -> Option<&CameraEntry> {
        self.cameras.get(index)
    }

    /// Command context host object `index`.
    pub fn context(&self, index: usize) -> Option<&ContextEntry> {
        self.contexts.get(index)
    }

    /// Every command context.
    pub fn contexts(&self) -> &[ContextEntry] {
        &self.contexts
    }

    /// Queue submit host object `index`.
    pub fn submit(&self, index: usize) -> Option<&QueueSubmitNode> {
        self.submits.get(index)
    }

    /// Present host object `index`.
    pub fn present(&self, index: usize) -> Option<&PresentNode> {
        self.presents.get(index)
    }

    /// Every frame coordinator.
    pub fn coordinators(&self) -> &[CoordinatorEntry] {
        &self.coordinators
    }

    /// Extent of a framebuffer built by this graph.
    pub fn framebuffer_extent(&self, framebuffer: FramebufferId) -> Option<Extent2D> {
        self.framebuffer_extents.get(&framebuffer).copied()
    }
}

/// [`Bindings`] over a compiled graph and the id table.
pub(crate) struct Resolver<'a> {
    pub(crate) compiled: &'a CompiledGraph,
    pub(crate) ids: &'a IdTable,
    pub(crate) surface: Extent2D,
}

impl Bindings for Resolver<'_> {
    fn resolve(&self, reference: &Ref, index: usize) -> Option<NativeHandle> {
        self.compiled.resolve(self.ids, reference, index)
    }

    fn surface_extent(&self) -> Extent2D {
        self.surface
    }

    fn framebuffer_extent(&self, framebuffer: FramebufferId) -> Option<Extent2D> {
        self.compiled.framebuffer_extent(framebuffer)
    }
}
