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

use super::record::RecordState;
use super::Bindings;
use std::sync::Arc;
use strata_core::renderer::{GraphicsDevice, RenderError};
use strata_data::graph::CommandNode;
use strata_data::Ref;
use thiserror::Error;

/// Errors raised while recording a command context.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The context's command buffer reference did not resolve for a slot.
    #[error("command context '{context}' has no command buffer for slot {slot}")]
    MissingCommandBuffer {
        /// Context label.
        context: String,
        /// Slot index.
        slot: usize,
    },
    /// A slot past the end of the context was requested.
    #[error("slot {slot} is out of range for '{context}' ({slots} slots)")]
    SlotOutOfRange {
        /// Context label.
        context: String,
        /// Requested slot.
        slot: usize,
        /// Slot count.
        slots: usize,
    },
    /// The device refused to reset or record the command buffer.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// A command tree bound to one command buffer per slot, with a dirty bit per
/// slot.
///
/// Freshly created and resized contexts are dirty everywhere.
#[derive(Debug, Clone)]
pub struct CommandContext {
    label: String,
    tree: Arc<CommandNode>,
    command_buffer: Ref,
    dirty: Vec<bool>,
}

impl CommandContext {
    /// Binds `tree` to the command buffer node `command_buffer` over `slots` slots.
    pub fn new(label: impl Into<String>, tree: Arc<CommandNode>, command_buffer: Ref, slots: usize) -> Self {
        Self {
            label: label.into(),
            tree,
            command_buffer,
            dirty: vec![true; slots],
        }
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The recorded tree.
    pub fn tree(&self) -> &CommandNode {
        &self.tree
    }

    /// The command buffer reference.
    pub fn command_buffer(&self) -> &Ref {
        &self.command_buffer
    }

    /// Number of slots.
    pub fn slot_count(&self) -> usize {
        self.dirty.len()
    }

    /// Returns `true` if `slot` needs re-recording. Slots past the end are clean.
    pub fn is_dirty(&self, slot: usize) -> bool {
        self.dirty.get(slot).copied().unwrap_or(false)
    }

    /// Indices of the dirty slots.
    pub fn dirty_slots(&self) -> Vec<usize> {
        self.dirty
            .iter()
            .enumerate()
            .filter_map(|(slot, dirty)| dirty.then_some(slot))
            .collect()
    }

    /// Changes the slot count. Every slot becomes dirty.
    pub fn resize(&mut self, slots: usize) {
        self.dirty = vec![true; slots];
    }

    /// Marks every slot dirty without recording anything.
    pub fn rebuild(&mut self) {
        self.dirty.fill(true);
    }

    /// Records every slot once, dirty or not.
    pub fn build(&mut self, device: &dyn GraphicsDevice, bindings: &dyn Bindings) -> Result<(), RecordError> {
        for slot in 0..self.dirty.len() {
            self.record(device, bindings, slot)?;
            self.dirty[slot] = false;
        }
        log::debug!("Built command context '{}' ({} slots)", self.label, self.dirty.len());
        Ok(())
    }

    /// Re-records `slot` if it is dirty and clears its bit.
    ///
    /// Returns whether anything was recorded. Other slots are left untouched.
    pub fn update(
        &mut self,
        device: &dyn GraphicsDevice,
        bindings: &dyn Bindings,
        slot: usize,
    ) -> Result<bool, RecordError> {
        let Some(dirty) = self.dirty.get(slot).copied() else {
            return Err(RecordError::SlotOutOfRange {
                context: self.label.clone(),
                slot,
                slots: self.dirty.len(),
            });
        };
        if !dirty {
            return Ok(false);
        }
        self.record(device, bindings, slot)?;
        self.dirty[slot] = false;
        Ok(true)
    }

    fn record(&self, device: &dyn GraphicsDevice, bindings: &dyn Bindings, slot: usize) -> Result<(), RecordError> {
        let command_buffer = bindings
            .resolve(&self.command_buffer, slot)
            .and_then(|handle| handle.as_command_buffer())
            .ok_or_else(|| RecordError::MissingCommandBuffer {
                context: self.label.clone(),
                slot,
            })?;

        device.reset_command_buffer(command_buffer)?;
        let mut recorder = device.begin_command_buffer(command_buffer)?;
        let mut state = RecordState::new(recorder.as_mut(), bindings, slot);
        state.record(&self.tree);
        let (recorded, skipped) = (state.recorded, state.skipped);
        recorder.finish()?;

        if skipped > 0 {
            log::warn!(
                "Command context '{}' slot {slot}: {skipped} commands skipped",
                self.label
            );
        }
        log::trace!(
            "Recorded command context '{}' slot {slot} ({recorded} commands)",
            self.label
        );
        Ok(())
    }
}
