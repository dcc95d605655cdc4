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

//! Defines the GraphCompiler, which turns a declarative graph into live
//! device objects and keeps them consistent across loads and resizes.

use super::build::{frame_of, Session};
use super::compiled::{CompiledGraph, Resolver, SwapchainState};
use super::error::CompileError;
use std::collections::HashSet;
use std::sync::Arc;
use strata_core::platform::{StrataWindow, WindowDescriptor, WindowId};
use strata_core::renderer::api::{NativeHandle, QueueDescriptor};
use strata_core::renderer::{DeviceDescriptor, GraphicsDevice, RenderBackend};
use strata_core::EngineSettings;
use strata_data::graph::{DeviceNode, ImageExtent, QueueNode, WindowNode};
use strata_data::{Graph, IdTable, Instance, Node, NodeKind, NodeRef, Ref};
use strata_lanes::upload_lane::UploadConfig;
use strata_lanes::UploadEngine;

/// A window kept alive across loads, with the id it was declared under.
struct KeptWindow {
    id: Option<String>,
    window: Arc<dyn StrataWindow>,
}

/// A queue kept alive across loads, with the id it was declared under.
struct KeptQueue {
    id: Option<String>,
    queue: strata_core::renderer::api::QueueId,
}

/// Builds graphs against a backend.
///
/// The compiler owns the device-level objects (windows, the device and its
/// queues) for its whole life: `load` swaps every other object of the graph
/// and rebinds the device-level nodes of the new graph to the kept objects.
/// Compiles are all-or-nothing: when a node fails, everything the compile
/// created is destroyed and the per-graph ids are unregistered.
pub struct GraphCompiler {
    // The engine-wide settings, read once at construction.
    pub(crate) settings: EngineSettings,
    // Creates windows and the device.
    backend: Arc<dyn RenderBackend>,
    // The device, once a `Device` node has been built.
    pub(crate) device: Option<Arc<dyn GraphicsDevice>>,
    // The id the device was declared under.
    device_id: Option<String>,
    // Worker pool for upload nodes, created with the device.
    pub(crate) uploads: Option<UploadEngine>,
    // Device-level objects, in creation order.
    windows: Vec<KeptWindow>,
    queues: Vec<KeptQueue>,
    // Engine-wide id table.
    pub(crate) ids: IdTable,
    // The graph currently live, if any.
    compiled: Option<CompiledGraph>,
}

impl GraphCompiler {
    /// Creates an idle compiler.
    pub fn new(backend: Arc<dyn RenderBackend>, settings: EngineSettings) -> Self {
        log::info!("Graph compiler using backend '{}'", backend.name());
        Self {
            settings,
            backend,
            device: None,
            device_id: None,
            uploads: None,
            windows: Vec::new(),
            queues: Vec::new(),
            ids: IdTable::new(),
            compiled: None,
        }
    }

    /// Compiles the first graph. It must declare the device.
    pub fn init(&mut self, graph: Graph) -> Result<(), CompileError> {
        if self.compiled.is_some() || self.device.is_some() {
            return Err(CompileError::AlreadyInitialized);
        }
        if !graph.nodes().iter().any(|node| matches!(node.kind, NodeKind::Device(_))) {
            return Err(CompileError::Invalid {
                node: "graph".to_string(),
                reason: "the first graph must declare a device".to_string(),
            });
        }
        self.compile(graph)
    }

    /// Replaces the live graph: unloads it, then compiles `graph` against
    /// the kept device-level objects.
    pub fn load(&mut self, graph: Graph) -> Result<(), CompileError> {
        if self.device.is_none() {
            return Err(CompileError::NotInitialized);
        }
        self.unload();
        self.compile(graph)
    }

    /// Destroys every per-graph object and unregisters every per-graph id.
    /// Device-level objects and their ids are kept.
    pub fn unload(&mut self) {
        if let Some(mut compiled) = self.compiled.take() {
            log::info!("Unloading graph of {} node(s)", compiled.graph().len());
            self.teardown(&mut compiled);
        }
    }

    /// Recreates a swapchain at its window's current size and rebuilds
    /// everything that depends on it.
    ///
    /// Per-frame nodes are expanded again to the new image count. A failure
    /// unloads the whole graph.
    pub fn resize(&mut self, swapchain: NodeRef) -> Result<(), CompileError> {
        let mut compiled = self.compiled.take().ok_or(CompileError::NotInitialized)?;
        let mut session = Session::default();
        match self.rebuild_for(&mut compiled, &mut session, swapchain) {
            Ok(()) => {
                self.compiled = Some(compiled);
                Ok(())
            }
            Err(err) => {
                log::error!("Resize of {} failed, unloading the graph: {err}", compiled.label(swapchain));
                self.abort(&mut compiled, &mut session);
                Err(err)
            }
        }
    }

    /// Looks up an id in the engine-wide table.
    pub fn find(&self, id: &str) -> Option<&Instance> {
        self.ids.find(id)
    }

    /// Registers (or overwrites) an id.
    pub fn set(&mut self, id: impl Into<String>, instance: Instance) {
        self.ids.set(id, instance);
    }

    /// The engine-wide id table.
    pub fn ids(&self) -> &IdTable {
        &self.ids
    }

    /// Resolves a reference of the live graph for image (or slot) `index`.
    pub fn resolve(&self, reference: &Ref, index: usize) -> Option<NativeHandle> {
        match &self.compiled {
            Some(compiled) => compiled.resolve(&self.ids, reference, index),
            None => match reference {
                Ref::Named(name) => self.ids.find(name)?.at(index),
                Ref::Node(_) => None,
            },
        }
    }

    /// The device.
    pub fn device(&self) -> Result<Arc<dyn GraphicsDevice>, CompileError> {
        self.device.clone().ok_or(CompileError::NotInitialized)
    }

    /// A window created by this compiler.
    pub fn window(&self, id: WindowId) -> Option<Arc<dyn StrataWindow>> {
        self.windows
            .iter()
            .find(|kept| kept.window.id() == id)
            .map(|kept| Arc::clone(&kept.window))
    }

    /// The live graph.
    pub fn compiled(&self) -> Option<&CompiledGraph> {
        self.compiled.as_ref()
    }

    /// The upload engine, once the device exists.
    pub fn uploads(&self) -> Option<&UploadEngine> {
        self.uploads.as_ref()
    }

    /// Engine settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Re-records slot `image` of command context `index` if it is dirty.
    ///
    /// Contexts recording into a single command buffer use slot 0 for every
    /// image. Returns whether anything was recorded.
    pub fn update_context(&mut self, index: usize, image: usize) -> Result<bool, CompileError> {
        let device = self.device()?;
        let compiled = self.compiled.as_mut().ok_or(CompileError::NotInitialized)?;
        let mut contexts = std::mem::take(&mut compiled.contexts);
        let result = match contexts.get_mut(index) {
            Some(entry) => {
                let slot = if entry.context.slot_count() == 1 { 0 } else { image };
                let resolver = Resolver {
                    compiled: &*compiled,
                    ids: &self.ids,
                    surface: compiled.surface_extent_for(entry.context.command_buffer()),
                };
                entry
                    .context
                    .update(device.as_ref(), &resolver, slot)
                    .map_err(|source| CompileError::Record {
                        node: compiled.label(entry.node),
                        source,
                    })
            }
            None => Err(CompileError::Invalid {
                node: format!("command context {index}"),
                reason: "no such command context".to_string(),
            }),
        };
        compiled.contexts = contexts;
        result
    }

    /// Marks every slot of every command context dirty.
    pub fn invalidate_contexts(&mut self) {
        if let Some(compiled) = &mut self.compiled {
            for entry in &mut compiled.contexts {
                entry.context.rebuild();
            }
        }
    }

    fn compile(&mut self, graph: Graph) -> Result<(), CompileError> {
        let layout = graph.analyze()?;
        log::info!("Compiling graph of {} node(s)", graph.len());
        let mut compiled = CompiledGraph::new(graph, layout);
        let mut session = Session::default();
        let order = compiled.layout().order.clone();

        let result = self
            .build_nodes(&mut compiled, &mut session, &order)
            .and_then(|()| self.build_contexts(&mut compiled, false));
        match result {
            Ok(()) => {
                log::info!(
                    "Graph compiled: {} object(s), {} command context(s)",
                    compiled
                        .instances
                        .iter()
                        .flatten()
                        .map(Instance::len)
                        .sum::<usize>(),
                    compiled.contexts.len()
                );
                self.compiled = Some(compiled);
                Ok(())
            }
            Err(err) => {
                log::error!("Compile failed, destroying what was built: {err}");
                self.abort(&mut compiled, &mut session);
                Err(err)
            }
        }
    }

    fn rebuild_for(
        &mut self,
        compiled: &mut CompiledGraph,
        session: &mut Session,
        swapchain: NodeRef,
    ) -> Result<(), CompileError> {
        let device = self.device()?;
        let label = compiled.label(swapchain);
        let state = compiled
            .swapchain(swapchain)
            .cloned()
            .ok_or_else(|| CompileError::Invalid {
                node: label.clone(),
                reason: "not a compiled swapchain".to_string(),
            })?;

        device.wait_idle().map_err(|source| CompileError::Render {
            node: label.clone(),
            source,
        })?;
        let rebuilt = affected_by(compiled, swapchain);
        log::debug!("Rebuilding {} node(s) for {label}", rebuilt.len());
        for &node in rebuilt.iter().rev() {
            self.destroy_node(compiled, node);
        }

        let creation = |source| CompileError::Creation {
            node: label.clone(),
            source,
        };
        device.recreate_swapchain(state.swapchain).map_err(creation)?;
        let extent = device.swapchain_extent(state.swapchain).map_err(creation)?;
        let images = device.swapchain_images(state.swapchain).map_err(creation)?;
        log::info!(
            "{label} resized to {}x{} with {} image(s)",
            extent.width,
            extent.height,
            images.len()
        );
        compiled.swapchains.insert(
            swapchain,
            SwapchainState {
                extent,
                images,
                ..state
            },
        );

        self.build_nodes(compiled, session, &rebuilt)?;

        let coordinators: Vec<(usize, Option<u32>)> = compiled
            .coordinators
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.swapchain == swapchain)
            .map(|(i, entry)| (i, frame_of(compiled, &entry.desc.frame).and_then(|(_, n)| n)))
            .collect();
        for (i, requested) in coordinators {
            let frames_in_flight = self.frames_in_flight(compiled, swapchain, requested);
            compiled.coordinators[i].frames_in_flight = frames_in_flight;
        }

        self.build_contexts(compiled, true)
    }

    /// Finishes outstanding uploads, then tears down.
    fn abort(&mut self, compiled: &mut CompiledGraph, session: &mut Session) {
        if let Err(err) = self.finish_uploads(compiled, session, false) {
            log::debug!("Ignoring upload failure during teardown: {err}");
        }
        self.teardown(compiled);
    }

    /// Destroys per-graph objects in reverse compile order and drops every
    /// id that does not name a device-level object.
    fn teardown(&mut self, compiled: &mut CompiledGraph) {
        if let Some(device) = &self.device {
            if let Err(e) = device.wait_idle() {
                log::warn!("Device did not go idle before teardown: {e}");
            }
        }
        let order = compiled.layout().order.clone();
        for &node in order.iter().rev() {
            self.destroy_node(compiled, node);
        }
        compiled.trees.clear();
        compiled.cameras.clear();
        compiled.contexts.clear();
        compiled.submits.clear();
        compiled.presents.clear();
        compiled.coordinators.clear();

        let kept: HashSet<String> = self
            .windows
            .iter()
            .map(|w| &w.id)
            .chain(self.queues.iter().map(|q| &q.id))
            .chain(std::iter::once(&self.device_id))
            .flatten()
            .cloned()
            .collect();
        let dropped: Vec<String> = self
            .ids
            .ids()
            .filter(|id| !kept.contains(*id))
            .map(str::to_string)
            .collect();
        for id in dropped {
            self.ids.remove(&id);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Device-level objects
    // ─────────────────────────────────────────────────────────────────────

    /// Binds a `Window` node to a kept window (same id first, then the next
    /// unclaimed one) or creates a new one.
    pub(crate) fn bind_window(
        &mut self,
        session: &mut Session,
        node: &Node,
        desc: &WindowNode,
        label: &str,
    ) -> Result<Instance, CompileError> {
        let claimed = &session.claimed_windows;
        let kept = node
            .id
            .as_ref()
            .and_then(|id| {
                self.windows
                    .iter()
                    .enumerate()
                    .position(|(i, w)| !claimed.contains(&i) && w.id.as_ref() == Some(id))
            })
            .or_else(|| (0..self.windows.len()).find(|i| !claimed.contains(i)));

        let index = match kept {
            Some(index) => {
                log::debug!("{label}: reusing window {:?}", self.windows[index].window.id());
                if node.id.is_some() {
                    self.windows[index].id = node.id.clone();
                }
                index
            }
            None => {
                let window = self
                    .backend
                    .create_window(&WindowDescriptor {
                        title: desc.title.clone(),
                        extent: desc.extent,
                    })
                    .map_err(|source| CompileError::Render {
                        node: label.to_string(),
                        source,
                    })?;
                log::info!("{label}: created window '{}'", desc.title);
                self.windows.push(KeptWindow {
                    id: node.id.clone(),
                    window,
                });
                self.windows.len() - 1
            }
        };
        session.claimed_windows.insert(index);
        Ok(Instance::Single(NativeHandle::Window(self.windows[index].window.id())))
    }

    /// Binds the `Device` node to the kept device or creates it, along with
    /// the upload engine.
    pub(crate) fn bind_device(
        &mut self,
        session: &mut Session,
        node: &Node,
        desc: &DeviceNode,
        label: &str,
    ) -> Result<Instance, CompileError> {
        if let Some(device) = &self.device {
            log::debug!("{label}: reusing the device");
            let handle = NativeHandle::Device(device.id());
            if node.id.is_some() {
                self.device_id = node.id.clone();
            }
            return Ok(Instance::Single(handle));
        }

        let device = self
            .backend
            .create_device(&DeviceDescriptor {
                label: node.id.clone(),
                validation: desc.validation || self.settings.validation,
            })
            .map_err(|source| CompileError::Render {
                node: label.to_string(),
                source,
            })?;
        let config = UploadConfig {
            workers: session.upload_workers.unwrap_or(self.settings.upload_workers),
            ..UploadConfig::from(&self.settings)
        };
        let uploads = UploadEngine::new(Arc::clone(&device), &config).map_err(|source| {
            CompileError::Upload {
                node: label.to_string(),
                source,
            }
        })?;
        log::info!("{label}: device created, {} upload worker(s)", uploads.worker_count());
        let handle = NativeHandle::Device(device.id());
        self.device = Some(device);
        self.device_id = node.id.clone();
        self.uploads = Some(uploads);
        Ok(Instance::Single(handle))
    }

    /// Binds a `Queue` node to a kept queue or retrieves a new one.
    pub(crate) fn bind_queue(
        &mut self,
        session: &mut Session,
        node: &Node,
        desc: &QueueNode,
        label: &str,
    ) -> Result<Instance, CompileError> {
        let claimed = &session.claimed_queues;
        let kept = node
            .id
            .as_ref()
            .and_then(|id| {
                self.queues
                    .iter()
                    .enumerate()
                    .position(|(i, q)| !claimed.contains(&i) && q.id.as_ref() == Some(id))
            })
            .or_else(|| (0..self.queues.len()).find(|i| !claimed.contains(i)));

        let index = match kept {
            Some(index) => {
                if node.id.is_some() {
                    self.queues[index].id = node.id.clone();
                }
                index
            }
            None => {
                let queue = self
                    .device()?
                    .get_queue(&QueueDescriptor {
                        label: node.id.clone(),
                        capabilities: desc.capabilities,
                        family: desc.family,
                    })
                    .map_err(|source| CompileError::Creation {
                        node: label.to_string(),
                        source,
                    })?;
                self.queues.push(KeptQueue {
                    id: node.id.clone(),
                    queue,
                });
                self.queues.len() - 1
            }
        };
        session.claimed_queues.insert(index);
        Ok(Instance::Single(NativeHandle::Queue(self.queues[index].queue)))
    }
}

impl Drop for GraphCompiler {
    fn drop(&mut self) {
        self.unload();
        if let Some(mut uploads) = self.uploads.take() {
            uploads.shutdown();
        }
    }
}

impl std::fmt::Debug for GraphCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphCompiler")
            .field("backend", &self.backend.name())
            .field("initialized", &self.device.is_some())
            .field("windows", &self.windows.len())
            .field("queues", &self.queues.len())
            .field("ids", &self.ids.len())
            .field("loaded", &self.compiled.is_some())
            .finish()
    }
}

/// Nodes rebuilt when `swapchain` changes, in compile order: every device
/// object (and upload) reachable from the nodes bound to it or sized
/// relative to it, except the swapchain itself and device-level objects.
fn affected_by(compiled: &CompiledGraph, swapchain: NodeRef) -> Vec<NodeRef> {
    let graph = compiled.graph();
    let seeds = graph.iter().filter_map(|(node, n)| {
        let relative = matches!(
            &n.kind,
            NodeKind::Image(image)
                if matches!(&image.extent, ImageExtent::Relative { swapchain: s, .. } if graph.resolve(s) == Some(swapchain))
        );
        (relative || compiled.layout().swapchain_of(node) == Some(swapchain)).then_some(node)
    });
    let affected = graph.dependents(seeds);

    compiled
        .layout()
        .order
        .iter()
        .copied()
        .filter(|node| affected.contains(node))
        .filter(|&node| {
            graph.node(node).is_some_and(|n| match &n.kind {
                NodeKind::Upload(_) => true,
                NodeKind::Swapchain(_) => false,
                kind => {
                    !kind.is_device_level()
                        && kind.object_kind().is_some_and(|object| object.is_native())
                }
            })
        })
        .collect()
}
