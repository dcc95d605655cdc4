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

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use strata_agents::{FrameCoordinator, FrameOutcome, GraphCompiler};
use strata_core::renderer::RenderBackend;
use strata_core::EngineSettings;
use strata_data::{persistence, Graph, Instance};

/// How long [`Engine::run`] sleeps when every coordinator is disabled.
const DISABLED_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// A running engine: the compiled graph and the coordinators driving it.
#[derive(Debug)]
pub struct Engine {
    compiler: GraphCompiler,
    coordinators: Vec<FrameCoordinator>,
}

impl Engine {
    /// Creates the device-level objects of `graph` and compiles the rest.
    pub fn init(backend: Arc<dyn RenderBackend>, settings: EngineSettings, graph: Graph) -> Result<Self> {
        log::info!("Initializing Strata ({} nodes)...", graph.len());
        let mut compiler = GraphCompiler::new(backend, settings);
        compiler.init(graph).context("failed to initialize the engine")?;
        let mut engine = Self {
            compiler,
            coordinators: Vec::new(),
        };
        engine.reset_coordinators();
        log::info!("Engine initialized with {} frame coordinator(s).", engine.coordinators.len());
        Ok(engine)
    }

    /// Replaces the current graph, keeping device, queues and windows.
    pub fn load(&mut self, graph: Graph) -> Result<()> {
        log::info!("Loading a graph of {} nodes...", graph.len());
        let result = self.compiler.load(graph).context("failed to load the graph");
        self.reset_coordinators();
        result
    }

    /// Loads a graph persisted with [`strata_data::persistence`].
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let graph = persistence::load_from_path(path)
            .with_context(|| format!("failed to read a graph from '{}'", path.display()))?;
        self.load(graph)
    }

    /// Destroys every per-graph object. Device, queues and windows survive.
    pub fn unload(&mut self) {
        self.compiler.unload();
        self.coordinators.clear();
    }

    /// Looks up a registered instance.
    pub fn find(&self, id: &str) -> Option<&Instance> {
        self.compiler.find(id)
    }

    /// Registers (or replaces) an instance.
    pub fn set(&mut self, id: impl Into<String>, instance: Instance) {
        self.compiler.set(id, instance);
    }

    /// The compiler, for inspection.
    pub fn compiler(&self) -> &GraphCompiler {
        &self.compiler
    }

    /// The compiler, for resizes and context invalidation.
    pub fn compiler_mut(&mut self) -> &mut GraphCompiler {
        &mut self.compiler
    }

    /// Runs one iteration of every coordinator, in declaration order.
    ///
    /// The first fatal error stops the iteration.
    pub fn frame(&mut self) -> Result<Vec<FrameOutcome>> {
        let mut outcomes = Vec::with_capacity(self.coordinators.len());
        for (i, coordinator) in self.coordinators.iter_mut().enumerate() {
            let outcome = coordinator
                .frame(&mut self.compiler)
                .with_context(|| format!("frame coordinator {i} failed"))?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Runs frames until a window asks to close, `max_frames` iterations have
    /// presented, or a coordinator fails. Returns the presented iterations.
    pub fn run(&mut self, max_frames: Option<u64>) -> Result<u64> {
        log::info!("Entering the frame loop...");
        let mut presented = 0;
        while max_frames.map_or(true, |max| presented < max) {
            let outcomes = self.frame()?;
            if outcomes.is_empty() {
                log::warn!("No frame coordinator to drive, leaving the frame loop.");
                break;
            }
            if outcomes.contains(&FrameOutcome::Exit) {
                log::info!("Shutdown requested, leaving the frame loop.");
                break;
            }
            if outcomes.iter().any(|o| matches!(o, FrameOutcome::Presented { .. })) {
                presented += 1;
            } else if outcomes.iter().all(|o| *o == FrameOutcome::Disabled) {
                std::thread::sleep(DISABLED_POLL_INTERVAL);
            }
        }
        log::info!("Frame loop finished after {presented} frame(s).");
        Ok(presented)
    }

    fn reset_coordinators(&mut self) {
        self.coordinators = self
            .compiler
            .compiled()
            .map(FrameCoordinator::for_graph)
            .unwrap_or_default();
    }
}
