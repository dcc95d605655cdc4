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

//! The per-queue executor thread.

use super::command::RecordedCommand;
use super::device::{lock, DeviceEvent, DeviceObject, DeviceShared};
use std::sync::{Arc, PoisonError};
use std::time::{Duration, Instant};
use strata_core::renderer::api::*;

const SEMAPHORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Work handed to a queue's executor.
#[derive(Debug)]
pub(crate) enum QueueJob {
    Submit {
        submits: Vec<SubmitInfo>,
        fence: Option<FenceId>,
    },
    Present {
        info: PresentInfo,
        /// `false` when the swapchain was already stale at present time.
        shown: bool,
    },
    Shutdown,
}

pub(crate) fn run(shared: Arc<DeviceShared>, queue: QueueId, jobs: flume::Receiver<QueueJob>) {
    log::debug!("Executor for queue {:?} started", queue);
    while let Ok(job) = jobs.recv() {
        match job {
            QueueJob::Shutdown => break,
            QueueJob::Submit { submits, fence } => {
                let delay = *lock(&shared.queue_delay);
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
                for submit in &submits {
                    execute_submit(&shared, queue, submit);
                }
                if let Some(fence) = fence {
                    shared.record(DeviceEvent::FenceSignaled(fence));
                }
                let mut sync = lock(&shared.sync);
                if let Some(fence) = fence {
                    if let Some(state) = sync.fences.get_mut(&fence) {
                        *state = true;
                    }
                }
                sync.in_flight -= 1;
                shared.sync_changed.notify_all();
            }
            QueueJob::Present { info, shown } => {
                wait_semaphores(&shared, info.wait_semaphores.iter().copied());
                if shown {
                    shared.record(DeviceEvent::Presented {
                        swapchain: info.swapchain,
                        image_index: info.image_index,
                    });
                }
                let mut sync = lock(&shared.sync);
                sync.in_flight -= 1;
                shared.sync_changed.notify_all();
            }
        }
    }
    log::debug!("Executor for queue {:?} stopped", queue);
}

fn execute_submit(shared: &DeviceShared, queue: QueueId, submit: &SubmitInfo) {
    wait_semaphores(shared, submit.wait_semaphores.iter().map(|(s, _)| *s));
    shared.record(DeviceEvent::ExecutionStarted {
        queue,
        command_buffers: submit.command_buffers.clone(),
    });
    for command_buffer in &submit.command_buffers {
        let commands = {
            let objects = lock(&shared.objects);
            match objects.get(&NativeHandle::CommandBuffer(*command_buffer)) {
                Some(DeviceObject::CommandBuffer(entry)) => entry.commands.clone(),
                _ => {
                    log::error!(
                        "Command buffer {:?} was destroyed before it executed",
                        command_buffer
                    );
                    continue;
                }
            }
        };
        for command in &commands {
            execute(shared, command);
        }
    }
    let mut sync = lock(&shared.sync);
    for semaphore in &submit.signal_semaphores {
        if let Some(count) = sync.semaphores.get_mut(semaphore) {
            *count += 1;
        }
    }
    shared.sync_changed.notify_all();
}

fn wait_semaphores(shared: &DeviceShared, semaphores: impl Iterator<Item = SemaphoreId>) {
    for semaphore in semaphores {
        let deadline = Instant::now() + SEMAPHORE_TIMEOUT;
        let mut sync = lock(&shared.sync);
        loop {
            match sync.semaphores.get_mut(&semaphore) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                    break;
                }
                Some(_) => {}
                None => {
                    log::error!("Waited on destroyed semaphore {:?}", semaphore);
                    break;
                }
            }
            let now = Instant::now();
            if now >= deadline {
                log::error!(
                    "Semaphore {:?} was never signaled; continuing without it",
                    semaphore
                );
                break;
            }
            sync = shared
                .sync_changed
                .wait_timeout(sync, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

fn execute(shared: &DeviceShared, command: &RecordedCommand) {
    match command {
        RecordedCommand::CopyBuffer { src, dst, regions } => {
            let mut objects = lock(&shared.objects);
            for region in regions {
                let bytes = match objects
                    .get_mut(&NativeHandle::Buffer(*src))
                    .and_then(|o| o.as_buffer_mut())
                {
                    Some(entry) => slice(&entry.data, region.src_offset, region.size),
                    None => None,
                };
                let Some(bytes) = bytes else {
                    log::error!("Copy from {:?} is out of bounds or dangling", src);
                    continue;
                };
                let Some(target) = objects
                    .get_mut(&NativeHandle::Buffer(*dst))
                    .and_then(|o| o.as_buffer_mut())
                else {
                    log::error!("Copy into destroyed buffer {:?}", dst);
                    continue;
                };
                let start = region.dst_offset as usize;
                match target.data.get_mut(start..start + bytes.len()) {
                    Some(window) => window.copy_from_slice(&bytes),
                    None => log::error!("Copy into {:?} is out of bounds", dst),
                }
            }
        }
        RecordedCommand::CopyBufferToImage {
            src, dst, regions, ..
        } => {
            let mut objects = lock(&shared.objects);
            for region in regions {
                let Some(format) = objects
                    .get_mut(&NativeHandle::Image(*dst))
                    .and_then(|o| o.as_image_mut())
                    .map(|image| image.descriptor.format)
                else {
                    log::error!("Copy into destroyed image {:?}", dst);
                    continue;
                };
                let extent = region.image_extent;
                let layer_size = format.data_size(extent.width, extent.height, extent.depth);
                let layers = region.subresource.layer_count.max(1);
                let bytes = objects
                    .get_mut(&NativeHandle::Buffer(*src))
                    .and_then(|o| o.as_buffer_mut())
                    .and_then(|entry| {
                        slice(&entry.data, region.buffer_offset, layer_size * layers as u64)
                    });
                let Some(bytes) = bytes else {
                    log::error!("Copy from {:?} is out of bounds or dangling", src);
                    continue;
                };
                if let Some(image) = objects
                    .get_mut(&NativeHandle::Image(*dst))
                    .and_then(|o| o.as_image_mut())
                {
                    for (i, chunk) in bytes.chunks(layer_size.max(1) as usize).enumerate() {
                        let layer = region.subresource.base_array_layer + i as u32;
                        image
                            .subresources
                            .insert((region.subresource.mip_level, layer), chunk.to_vec());
                    }
                }
            }
        }
        RecordedCommand::PipelineBarrier(barrier) => {
            let mut objects = lock(&shared.objects);
            for transition in &barrier.images {
                if let Some(image) = objects
                    .get_mut(&NativeHandle::Image(transition.image))
                    .and_then(|o| o.as_image_mut())
                {
                    image.layout = transition.new_layout;
                }
            }
        }
        RecordedCommand::SetEvent { event, .. } => {
            if let Some(state) = lock(&shared.sync).events.get_mut(event) {
                *state = true;
            }
        }
        RecordedCommand::ResetEvent { event, .. } => {
            if let Some(state) = lock(&shared.sync).events.get_mut(event) {
                *state = false;
            }
        }
        _ => {}
    }
}

fn slice(data: &[u8], offset: u64, size: u64) -> Option<Vec<u8>> {
    let start = usize::try_from(offset).ok()?;
    let end = start.checked_add(usize::try_from(size).ok()?)?;
    data.get(start..end).map(<[u8]>::to_vec)
}
