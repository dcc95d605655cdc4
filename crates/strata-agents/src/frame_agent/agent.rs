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

//! Defines the FrameCoordinator, which drives one frame-coordinator node of
//! the live graph through acquire, update, submit and present.

use super::camera::CameraUniform;
use crate::compiler_agent::{CompileError, CompiledGraph, CoordinatorEntry, GraphCompiler};
use strata_core::platform::WindowEvent;
use strata_core::renderer::api::{
    AcquireResult, FenceId, NativeHandle, PresentInfo, SemaphoreId, SubmitInfo,
};
use strata_core::renderer::RenderError;
use strata_data::{NodeRef, Ref};
use thiserror::Error;

/// An error that stops the frame loop.
#[derive(Debug, Error)]
pub enum FrameError {
    /// No graph is loaded, or it has no coordinator at this index.
    #[error("frame coordinator {0} is not part of the live graph")]
    NotCompiled(usize),
    /// A resize (or another compiler operation) failed.
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// Waiting, acquiring, submitting or presenting failed.
    #[error("{coordinator}: {source}")]
    Render {
        /// The coordinator node.
        coordinator: String,
        /// The device error.
        #[source]
        source: RenderError,
    },
    /// A reference of a submit or present descriptor did not resolve.
    #[error("{coordinator}: {reference} does not resolve to a {expected} for index {index}")]
    Unresolved {
        /// The coordinator node.
        coordinator: String,
        /// The reference.
        reference: String,
        /// The expected object kind.
        expected: &'static str,
        /// Frame slot or image index used.
        index: usize,
    },
}

/// Where the coordinator is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameState {
    /// Between frames.
    #[default]
    Idle,
    /// Waiting for the slot fence and the next image.
    AcquireImage,
    /// Writing cameras and re-recording dirty command slots.
    Update,
    /// Submitting command buffers.
    Submit,
    /// Presenting the image.
    Present,
    /// The surface cannot be rendered to; frames are skipped.
    Disabled,
}

/// What one call to [`FrameCoordinator::frame`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// An image was rendered and presented (or queued for presentation).
    Presented {
        /// Acquired swapchain image.
        image_index: u32,
        /// Frame slot used.
        slot: u32,
    },
    /// The swapchain was stale; a resize was scheduled.
    Skipped,
    /// The window is minimized.
    Disabled,
    /// The window asked to close.
    Exit,
}

/// Runtime state of one frame-coordinator node.
#[derive(Debug)]
pub struct FrameCoordinator {
    index: usize,
    state: FrameState,
    // Next frame slot, in [0, frames_in_flight).
    slot: usize,
    // Slot fence last associated with each swapchain image.
    image_fences: Vec<Option<FenceId>>,
    pending_resize: bool,
    disabled: bool,
    frames: u64,
}

impl FrameCoordinator {
    /// Drives coordinator `index` of the live graph.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            state: FrameState::Idle,
            slot: 0,
            image_fences: Vec::new(),
            pending_resize: false,
            disabled: false,
            frames: 0,
        }
    }

    /// One coordinator per frame-coordinator node of the live graph.
    pub fn for_graph(compiled: &CompiledGraph) -> Vec<Self> {
        (0..compiled.coordinators().len()).map(Self::new).collect()
    }

    /// Current state.
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// The slot the next frame will use.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Frames presented so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Returns `true` if a resize is scheduled for the next frame.
    pub fn resize_pending(&self) -> bool {
        self.pending_resize
    }

    /// Runs one iteration of the frame cycle.
    ///
    /// Stale or suboptimal swapchains schedule a resize and never surface as
    /// errors; any other device failure is returned and should end the loop.
    pub fn frame(&mut self, compiler: &mut GraphCompiler) -> Result<FrameOutcome, FrameError> {
        let entry = self.entry(compiler)?;
        let label = self.label(compiler, entry.node);

        if let Some(outcome) = self.poll_window(compiler, &entry, &label) {
            return Ok(outcome);
        }
        if self.disabled {
            self.state = FrameState::Disabled;
            return Ok(FrameOutcome::Disabled);
        }

        let entry = if self.pending_resize {
            self.pending_resize = false;
            compiler.resize(entry.swapchain)?;
            self.reset_images(compiler);
            self.entry(compiler)?
        } else {
            entry
        };

        // AcquireImage
        self.state = FrameState::AcquireImage;
        let device = compiler.device()?;
        let timeout = compiler.settings().fence_timeout;
        let render = |source| FrameError::Render {
            coordinator: label.clone(),
            source,
        };
        let slot = self.slot;
        let in_flight = self.handle(compiler, &entry.desc.in_flight_fence, slot, &label, NativeHandle::as_fence, "fence")?;
        let acquire = self.handle(
            compiler,
            &entry.desc.acquire_semaphore,
            slot,
            &label,
            NativeHandle::as_semaphore,
            "semaphore",
        )?;
        let swapchain = compiler
            .compiled()
            .and_then(|compiled| compiled.swapchain(entry.swapchain))
            .map(|state| state.swapchain)
            .ok_or(FrameError::NotCompiled(self.index))?;

        device.wait_for_fences(&[in_flight], timeout).map_err(render)?;
        let image_index = match device.acquire_next_image(swapchain, Some(acquire), timeout).map_err(render)? {
            AcquireResult::Acquired {
                image_index,
                suboptimal: false,
            } => image_index,
            AcquireResult::Acquired {
                suboptimal: true, ..
            }
            | AcquireResult::OutOfDate => {
                log::warn!("{label}: swapchain is stale, resizing before the next frame");
                self.pending_resize = true;
                self.state = FrameState::Idle;
                return Ok(FrameOutcome::Skipped);
            }
        };
        let image = image_index as usize;
        if self.image_fences.len() <= image {
            self.image_fences.resize(image + 1, None);
        }
        if let Some(previous) = self.image_fences[image] {
            if previous != in_flight {
                device.wait_for_fences(&[previous], timeout).map_err(render)?;
            }
        }
        self.image_fences[image] = Some(in_flight);
        if !entry.desc.submits.is_empty() {
            device.reset_fences(&[in_flight]).map_err(render)?;
        }

        // Update
        self.state = FrameState::Update;
        self.update_cameras(compiler, &entry, image, &label)?;
        for context in &entry.desc.contexts {
            let index = self.host_index(compiler, context, &label, "command context")?;
            compiler.update_context(index, image)?;
        }

        // Submit
        self.state = FrameState::Submit;
        let submits = entry.desc.submits.len();
        let mut last_queue = None;
        let mut signaled_in_flight = false;
        for (i, submit) in entry.desc.submits.iter().enumerate() {
            let index = self.host_index(compiler, submit, &label, "queue submit")?;
            let desc = compiler
                .compiled()
                .and_then(|compiled| compiled.submit(index))
                .cloned()
                .ok_or(FrameError::NotCompiled(self.index))?;
            let queue = self.handle(compiler, &desc.queue, image, &label, NativeHandle::as_queue, "queue")?;
            let command_buffers = desc
                .command_buffers
                .iter()
                .map(|cb| self.handle(compiler, cb, image, &label, NativeHandle::as_command_buffer, "command buffer"))
                .collect::<Result<Vec<_>, _>>()?;
            let wait_semaphores = desc
                .wait_semaphores
                .iter()
                .map(|wait| {
                    self.semaphore(compiler, &wait.semaphore, slot, &label)
                        .map(|semaphore| (semaphore, wait.stage))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let signal_semaphores = desc
                .signal_semaphores
                .iter()
                .map(|s| self.semaphore(compiler, s, slot, &label))
                .collect::<Result<Vec<_>, _>>()?;
            let fence = match &desc.fence {
                Some(fence) => Some(self.handle(compiler, fence, slot, &label, NativeHandle::as_fence, "fence")?),
                None if i + 1 == submits => Some(in_flight),
                None => None,
            };
            signaled_in_flight |= fence == Some(in_flight);
            last_queue = Some(queue);
            device
                .queue_submit(
                    queue,
                    &[SubmitInfo {
                        wait_semaphores,
                        command_buffers,
                        signal_semaphores,
                    }],
                    fence,
                )
                .map_err(render)?;
        }

        if let (Some(queue), false) = (last_queue, signaled_in_flight) {
            // The slot fence must still be signaled by this frame's work.
            device.queue_submit(queue, &[], Some(in_flight)).map_err(render)?;
        }

        // Present
        self.state = FrameState::Present;
        for present in &entry.desc.presents {
            let index = self.host_index(compiler, present, &label, "present")?;
            let desc = compiler
                .compiled()
                .and_then(|compiled| compiled.present(index))
                .cloned()
                .ok_or(FrameError::NotCompiled(self.index))?;
            let queue = self.handle(compiler, &desc.queue, image, &label, NativeHandle::as_queue, "queue")?;
            let swapchain = self.handle(compiler, &desc.swapchain, image, &label, NativeHandle::as_swapchain, "swapchain")?;
            let wait_semaphores = desc
                .wait_semaphores
                .iter()
                .map(|s| self.semaphore(compiler, s, slot, &label))
                .collect::<Result<Vec<_>, _>>()?;
            let result = device
                .queue_present(
                    queue,
                    &PresentInfo {
                        swapchain,
                        image_index,
                        wait_semaphores,
                    },
                )
                .map_err(render)?;
            if result.needs_resize() {
                log::warn!("{label}: present reported {result:?}, resizing before the next frame");
                self.pending_resize = true;
            }
        }

        self.state = FrameState::Idle;
        self.frames += 1;
        self.slot = (slot + 1) % (entry.frames_in_flight.max(1) as usize);
        log::trace!("{label}: frame {} on image {image_index}, slot {slot}", self.frames);
        Ok(FrameOutcome::Presented {
            image_index,
            slot: slot as u32,
        })
    }

    fn entry(&self, compiler: &GraphCompiler) -> Result<CoordinatorEntry, FrameError> {
        compiler
            .compiled()
            .and_then(|compiled| compiled.coordinators().get(self.index))
            .cloned()
            .ok_or(FrameError::NotCompiled(self.index))
    }

    fn label(&self, compiler: &GraphCompiler, node: NodeRef) -> String {
        compiler
            .compiled()
            .map_or_else(|| format!("frame coordinator {}", self.index), |c| c.label(node))
    }

    /// Handles window events. Returns an outcome when the frame must stop here.
    fn poll_window(
        &mut self,
        compiler: &GraphCompiler,
        entry: &CoordinatorEntry,
        label: &str,
    ) -> Option<FrameOutcome> {
        let window = compiler
            .compiled()
            .and_then(|compiled| compiled.swapchain(entry.swapchain))
            .and_then(|state| compiler.window(state.window))?;
        for event in window.poll_events() {
            match event {
                WindowEvent::CloseRequested => {
                    log::info!("{label}: window closed");
                    self.state = FrameState::Idle;
                    return Some(FrameOutcome::Exit);
                }
                WindowEvent::Minimized => {
                    log::info!("{label}: window minimized, rendering disabled");
                    self.disabled = true;
                }
                WindowEvent::Restored => {
                    if self.disabled {
                        log::info!("{label}: window restored");
                        self.disabled = false;
                        self.pending_resize = true;
                    }
                }
                WindowEvent::Resized(extent) => {
                    log::debug!("{label}: window resized to {}x{}", extent.width, extent.height);
                    self.pending_resize = true;
                }
            }
        }
        None
    }

    /// Forgets image fences after the swapchain was recreated.
    fn reset_images(&mut self, compiler: &GraphCompiler) {
        let Ok(entry) = self.entry(compiler) else {
            return;
        };
        let images = compiler
            .compiled()
            .and_then(|compiled| compiled.swapchain(entry.swapchain))
            .map_or(0, |state| state.images.len());
        self.image_fences = vec![None; images];
        if self.slot >= entry.frames_in_flight as usize {
            self.slot = 0;
        }
    }

    fn update_cameras(
        &self,
        compiler: &GraphCompiler,
        entry: &CoordinatorEntry,
        image: usize,
        label: &str,
    ) -> Result<(), FrameError> {
        let device = compiler.device()?;
        let Some(compiled) = compiler.compiled() else {
            return Err(FrameError::NotCompiled(self.index));
        };
        let aspect = compiled.swapchain(entry.swapchain).map_or(1.0, |state| {
            state.extent.width as f32 / state.extent.height.max(1) as f32
        });
        for camera in &entry.desc.cameras {
            let index = self.host_index(compiler, camera, label, "camera")?;
            let Some(camera) = compiled.camera(index) else {
                continue;
            };
            let buffer = self.handle(
                compiler,
                &camera.camera.uniform_buffer,
                image,
                label,
                NativeHandle::as_buffer,
                "uniform buffer",
            )?;
            let uniform = CameraUniform::new(&camera.camera, aspect);
            device
                .write_buffer(buffer, 0, uniform.as_bytes())
                .map_err(|source| FrameError::Render {
                    coordinator: label.to_string(),
                    source: source.into(),
                })?;
        }
        Ok(())
    }

    fn handle<T>(
        &self,
        compiler: &GraphCompiler,
        reference: &Ref,
        index: usize,
        label: &str,
        pick: fn(&NativeHandle) -> Option<T>,
        expected: &'static str,
    ) -> Result<T, FrameError> {
        compiler
            .resolve(reference, index)
            .and_then(|handle| pick(&handle))
            .ok_or_else(|| FrameError::Unresolved {
                coordinator: label.to_string(),
                reference: reference.to_string(),
                expected,
                index,
            })
    }

    fn semaphore(
        &self,
        compiler: &GraphCompiler,
        reference: &Ref,
        slot: usize,
        label: &str,
    ) -> Result<SemaphoreId, FrameError> {
        self.handle(compiler, reference, slot, label, NativeHandle::as_semaphore, "semaphore")
    }

    fn host_index(
        &self,
        compiler: &GraphCompiler,
        reference: &Ref,
        label: &str,
        expected: &'static str,
    ) -> Result<usize, FrameError> {
        compiler
            .resolve(reference, 0)
            .and_then(|handle| handle.host_index())
            .ok_or_else(|| FrameError::Unresolved {
                coordinator: label.to_string(),
                reference: reference.to_string(),
                expected,
                index: 0,
            })
    }
}
