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

//! The declarative graph: an arena of nodes and the analysis that orders them.

pub mod command;
pub mod node;
pub mod upload;

pub use command::{BufferBarrierNode, CommandNode, ImageBarrierNode};
pub use node::*;
pub use upload::{ImageEncoding, TransferTarget, UploadNode, UploadSource};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use strata_core::graph::topological_sort;

/// Index of a node in its [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeRef(pub u32);

impl NodeRef {
    /// The arena index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A reference from one node to another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ref {
    /// A direct arena index.
    Node(NodeRef),
    /// A name looked up in the id table. If a node of the graph carries that
    /// id it is resolved to that node, otherwise lazily at use time.
    Named(String),
}

impl Ref {
    /// Shorthand for [`Ref::Named`].
    pub fn named(id: impl Into<String>) -> Self {
        Ref::Named(id.into())
    }
}

impl From<NodeRef> for Ref {
    fn from(node: NodeRef) -> Self {
        Ref::Node(node)
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ref::Node(node) => write!(f, "{node}"),
            Ref::Named(name) => write!(f, "'{name}'"),
        }
    }
}

/// An error found while analyzing a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Ownership references form a cycle through these nodes.
    Cycle(Vec<NodeRef>),
    /// A node owns a dependency that is compiled in a later category.
    OrderViolation {
        /// The dependency.
        dependency: NodeRef,
        /// Its category.
        dependency_category: NodeCategory,
        /// The dependent node.
        dependent: NodeRef,
        /// Its category.
        dependent_category: NodeCategory,
    },
    /// A direct reference points outside the arena.
    DanglingReference {
        /// The referencing node.
        node: NodeRef,
        /// The missing target.
        target: NodeRef,
    },
    /// A node's frame binding does not point at a `Frame` node with a swapchain.
    InvalidFrameBinding {
        /// The bound node.
        node: NodeRef,
        /// The binding target.
        frame: NodeRef,
    },
    /// A per-frame node could not be bound to a swapchain.
    UnboundPerFrame(NodeRef),
    /// A node flagged per-frame is of a kind that cannot be replicated.
    NotReplicable(NodeRef),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::Cycle(nodes) => {
                write!(f, "Ownership cycle through nodes {nodes:?}")
            }
            GraphError::OrderViolation {
                dependency,
                dependency_category,
                dependent,
                dependent_category,
            } => write!(
                f,
                "{dependent_category} node {dependent} owns {dependency_category} node {dependency}, \
                 which is compiled later"
            ),
            GraphError::DanglingReference { node, target } => {
                write!(f, "Node {node} references missing node {target}")
            }
            GraphError::InvalidFrameBinding { node, frame } => {
                write!(f, "Node {node} is bound to {frame}, which is not a valid frame")
            }
            GraphError::UnboundPerFrame(node) => write!(
                f,
                "Per-frame node {node} has no frame binding and the graph has no single swapchain"
            ),
            GraphError::NotReplicable(node) => {
                write!(f, "Node {node} is flagged per-frame but its kind cannot be replicated")
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// The result of analyzing a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphLayout {
    /// Every node in compile order: by category, then by ownership order.
    pub order: Vec<NodeRef>,
    /// For each node, the swapchain node its per-frame instances follow.
    pub bindings: Vec<Option<NodeRef>>,
}

impl GraphLayout {
    /// The swapchain a node is bound to, if it is per-frame.
    pub fn swapchain_of(&self, node: NodeRef) -> Option<NodeRef> {
        self.bindings.get(node.index()).copied().flatten()
    }

    /// Returns `true` if the node is built once per swapchain image.
    pub fn is_per_frame(&self, node: NodeRef) -> bool {
        self.swapchain_of(node).is_some()
    }
}

/// A declarative render graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node and returns its reference.
    pub fn add(&mut self, node: Node) -> NodeRef {
        self.nodes.push(node);
        NodeRef(self.nodes.len() as u32 - 1)
    }

    /// Returns a node by reference.
    pub fn node(&self, node: NodeRef) -> Option<&Node> {
        self.nodes.get(node.index())
    }

    /// All nodes, in declaration order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Iterates over `(reference, node)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeRef, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeRef(i as u32), node))
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Finds the node carrying `id`. With duplicates, the last declared wins,
    /// matching the id table's last-write-wins rule.
    pub fn find_by_id(&self, id: &str) -> Option<NodeRef> {
        self.iter()
            .filter(|(_, node)| node.id.as_deref() == Some(id))
            .map(|(r, _)| r)
            .last()
    }

    /// Resolves a reference to a node of this graph, if it names one.
    pub fn resolve(&self, reference: &Ref) -> Option<NodeRef> {
        match reference {
            Ref::Node(node) => (node.index() < self.nodes.len()).then_some(*node),
            Ref::Named(name) => self.find_by_id(name),
        }
    }

    /// Ownership edges as `(dependency, dependent)` pairs, including frame bindings.
    pub fn ownership_edges(&self) -> Vec<(NodeRef, NodeRef)> {
        let mut edges = Vec::new();
        for (r, node) in self.iter() {
            for dep in node.kind.owned_refs() {
                if let Some(dep) = self.resolve(dep) {
                    edges.push((dep, r));
                }
            }
            if let Some(frame) = node.frame {
                edges.push((frame, r));
            }
        }
        edges
    }

    /// Lookup edges as `(target, referencing node)` pairs.
    pub fn lookup_edges(&self) -> Vec<(NodeRef, NodeRef)> {
        let mut edges = Vec::new();
        for (r, node) in self.iter() {
            for target in node.kind.lookup_refs() {
                if let Some(target) = self.resolve(target) {
                    edges.push((target, r));
                }
            }
        }
        edges
    }

    /// Checks direct references and frame bindings.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut seen_ids: HashMap<&str, NodeRef> = HashMap::new();
        for (r, node) in self.iter() {
            let refs = node
                .kind
                .owned_refs()
                .into_iter()
                .chain(node.kind.lookup_refs());
            for reference in refs {
                if let Ref::Node(target) = reference {
                    if target.index() >= self.nodes.len() {
                        return Err(GraphError::DanglingReference {
                            node: r,
                            target: *target,
                        });
                    }
                }
            }
            if let Some(frame) = node.frame {
                match self.node(frame).map(|n| &n.kind) {
                    Some(NodeKind::Frame(_)) => {}
                    _ => return Err(GraphError::InvalidFrameBinding { node: r, frame }),
                }
            }
            if node.per_frame && !node.kind.is_replicable() {
                return Err(GraphError::NotReplicable(r));
            }
            if let Some(id) = node.id.as_deref() {
                if let Some(previous) = seen_ids.insert(id, r) {
                    log::warn!("Id '{id}' is used by {previous} and {r}; {r} wins");
                }
            }
        }
        Ok(())
    }

    /// Validates the graph, orders it for compilation and binds per-frame nodes.
    pub fn analyze(&self) -> Result<GraphLayout, GraphError> {
        self.validate()?;

        let edges = self.ownership_edges();
        let mut order = topological_sort(
            (0..self.nodes.len() as u32).map(NodeRef),
            edges.iter().copied(),
        )
        .map_err(|e| GraphError::Cycle(e.unresolved))?;
        // Stable: within a category the ownership order is kept.
        order.sort_by_key(|r| self.nodes[r.index()].kind.category());

        for &(dependency, dependent) in &edges {
            let dependency_category = self.nodes[dependency.index()].kind.category();
            let dependent_category = self.nodes[dependent.index()].kind.category();
            if dependency_category > dependent_category {
                return Err(GraphError::OrderViolation {
                    dependency,
                    dependency_category,
                    dependent,
                    dependent_category,
                });
            }
        }

        let bindings = self.bind_per_frame(&order)?;
        Ok(GraphLayout { order, bindings })
    }

    fn bind_per_frame(&self, order: &[NodeRef]) -> Result<Vec<Option<NodeRef>>, GraphError> {
        let swapchains: Vec<NodeRef> = self
            .iter()
            .filter(|(_, n)| matches!(n.kind, NodeKind::Swapchain(_)))
            .map(|(r, _)| r)
            .collect();
        let sole_swapchain = (swapchains.len() == 1).then(|| swapchains[0]);

        let mut bindings: Vec<Option<NodeRef>> = vec![None; self.nodes.len()];
        for &r in order {
            let node = &self.nodes[r.index()];

            if let NodeKind::ImageView(ImageViewNode {
                source: ViewSource::Swapchain(swapchain),
                ..
            }) = &node.kind
            {
                bindings[r.index()] = self.resolve(swapchain);
                continue;
            }

            if let Some(frame) = node.frame {
                let swapchain = match &self.nodes[frame.index()].kind {
                    NodeKind::Frame(f) => self.resolve(&f.swapchain),
                    _ => None,
                };
                match swapchain {
                    Some(s) => bindings[r.index()] = Some(s),
                    None => return Err(GraphError::InvalidFrameBinding { node: r, frame }),
                }
                continue;
            }

            if !node.kind.is_replicable() {
                continue;
            }

            let inherited = node
                .kind
                .owned_refs()
                .into_iter()
                .chain(match node.kind {
                    NodeKind::DescriptorSet(_) => node.kind.lookup_refs(),
                    _ => Vec::new(),
                })
                .filter_map(|dep| self.resolve(dep))
                .find_map(|dep| bindings[dep.index()]);

            bindings[r.index()] = match (inherited, node.per_frame) {
                (Some(s), _) => Some(s),
                (None, true) => Some(sole_swapchain.ok_or(GraphError::UnboundPerFrame(r))?),
                (None, false) => None,
            };
        }
        Ok(bindings)
    }

    /// Every node that depends on one of `seeds`, by ownership or lookup,
    /// transitively. The seeds are included.
    pub fn dependents(&self, seeds: impl IntoIterator<Item = NodeRef>) -> BTreeSet<NodeRef> {
        let mut forward: HashMap<NodeRef, Vec<NodeRef>> = HashMap::new();
        for (dependency, dependent) in self
            .ownership_edges()
            .into_iter()
            .chain(self.lookup_edges())
        {
            forward.entry(dependency).or_default().push(dependent);
        }

        let mut closure = BTreeSet::new();
        let mut queue: VecDeque<NodeRef> = seeds.into_iter().collect();
        while let Some(r) = queue.pop_front() {
            if closure.insert(r) {
                if let Some(next) = forward.get(&r) {
                    queue.extend(next.iter().copied());
                }
            }
        }
        closure
    }
}
