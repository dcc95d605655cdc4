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

//! The upload engine: a fixed pool of workers sharing a fixed pool of
//! transfer contexts.

use super::context::{ContextGuard, ContextPool};
use super::source::{decode_image, read_source, ImagePayload};
use super::task::{UploadDestination, UploadHandle, UploadReceipt, UploadTask};
use super::UploadError;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use strata_core::renderer::api::*;
use strata_core::renderer::{CommandRecorder, GraphicsDevice, RenderError};
use strata_core::EngineSettings;

// Image data starts on a boundary every texel block size divides.
const IMAGE_DATA_ALIGNMENT: u64 = 16;

/// How an [`UploadEngine`] is set up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    /// Worker threads, which is also the number of transfer contexts.
    pub workers: usize,
    /// Queue family for uploads, or `None` for any transfer-capable family.
    pub queue_family: Option<u32>,
    /// Timeout of the completion wait.
    pub fence_timeout: Option<Duration>,
}

impl From<&EngineSettings> for UploadConfig {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            workers: settings.upload_workers,
            queue_family: settings.upload_queue_family,
            fence_timeout: settings.fence_timeout,
        }
    }
}

struct Job {
    task: UploadTask,
    reply: flume::Sender<Result<UploadReceipt, UploadError>>,
}

/// Streams [`UploadTask`]s to the device.
///
/// Reading and decoding happen on the worker before a context is acquired,
/// so they overlap with the copies other workers have in flight.
pub struct UploadEngine {
    device: Arc<dyn GraphicsDevice>,
    queue: QueueId,
    contexts: Arc<ContextPool>,
    jobs: Option<flume::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl UploadEngine {
    /// Retrieves an upload queue, creates the contexts and starts the workers.
    pub fn new(device: Arc<dyn GraphicsDevice>, config: &UploadConfig) -> Result<Self, UploadError> {
        let workers = config.workers.max(1);
        let queue = device.get_queue(&QueueDescriptor {
            label: Some("upload".to_string()),
            capabilities: QueueCapabilities::TRANSFER,
            family: config.queue_family,
        })?;
        let contexts = Arc::new(ContextPool::create(device.as_ref(), queue, workers)?);

        let (sender, receiver) = flume::unbounded::<Job>();
        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let receiver = receiver.clone();
            let device = Arc::clone(&device);
            let contexts = Arc::clone(&contexts);
            let timeout = config.fence_timeout;
            let handle = std::thread::Builder::new()
                .name(format!("strata-upload-{index}"))
                .spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        let label = job.task.label.clone();
                        let outcome = execute(device.as_ref(), &contexts, &job.task, timeout);
                        match &outcome {
                            Ok(receipt) => log::debug!(
                                "Upload '{label}' completed: {} bytes, {} regions",
                                receipt.staged_bytes,
                                receipt.regions
                            ),
                            Err(e) if e.is_contract_violation() => {
                                log::error!("Upload '{label}' violates its contract: {e}")
                            }
                            Err(e) => log::error!("Upload '{label}' failed: {e}"),
                        }
                        // The handle may have been dropped; the work is done either way.
                        let _ = job.reply.send(outcome);
                    }
                })
                .map_err(|e| UploadError::Render(RenderError::Internal(e.to_string())))?;
            handles.push(handle);
        }
        log::info!("Upload engine started with {workers} workers");

        Ok(Self {
            device,
            queue,
            contexts,
            jobs: Some(sender),
            workers: handles,
        })
    }

    /// Queues a task and returns a handle to its outcome.
    pub fn submit(&self, task: UploadTask) -> UploadHandle {
        let (reply, receiver) = flume::bounded(1);
        let handle = UploadHandle::new(task.label.clone(), receiver);
        match &self.jobs {
            Some(jobs) => {
                log::trace!("Queued upload '{}'", task.label);
                if let Err(flume::SendError(job)) = jobs.send(Job { task, reply }) {
                    let _ = job.reply.send(Err(UploadError::Shutdown));
                }
            }
            None => {
                let _ = reply.send(Err(UploadError::Shutdown));
            }
        }
        handle
    }

    /// Runs a task and waits for it.
    pub fn upload(&self, task: UploadTask) -> Result<UploadReceipt, UploadError> {
        self.submit(task).finish()
    }

    /// The queue uploads are submitted to.
    pub fn queue(&self) -> QueueId {
        self.queue
    }

    /// The context pool.
    pub fn contexts(&self) -> &ContextPool {
        &self.contexts
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Lets the workers drain every queued task, joins them and destroys the contexts.
    pub fn shutdown(&mut self) {
        let Some(jobs) = self.jobs.take() else {
            return;
        };
        drop(jobs);
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("An upload worker panicked");
            }
        }
        if let Err(e) = self.device.wait_idle() {
            log::warn!("Device did not go idle before destroying upload contexts: {e}");
        }
        let held = self.contexts.destroy(self.device.as_ref());
        if held > 0 {
            log::warn!("{held} upload contexts were still held at shutdown");
        }
        log::info!("Upload engine shut down");
    }
}

impl Drop for UploadEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for UploadEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadEngine")
            .field("queue", &self.queue)
            .field("workers", &self.workers.len())
            .field("contexts", &self.contexts)
            .finish()
    }
}

/// An image destination once its handle is known.
struct ImageTarget {
    image: ImageId,
    created: Option<ImageDescriptor>,
}

/// Runs one task on the calling thread.
///
/// Blocks while no context is free. The context goes back to the pool only
/// once its fence is observed signaled; the staging buffer is destroyed with
/// it.
pub fn execute(
    device: &dyn GraphicsDevice,
    contexts: &Arc<ContextPool>,
    task: &UploadTask,
    fence_timeout: Option<Duration>,
) -> Result<UploadReceipt, UploadError> {
    if task.destinations.is_empty() {
        return Err(UploadError::NoDestination(task.label.clone()));
    }

    let buffers: Vec<(BufferId, u64)> = task
        .destinations
        .iter()
        .filter_map(|d| match d {
            UploadDestination::Buffer { buffer, capacity } => Some((*buffer, *capacity)),
            _ => None,
        })
        .collect();
    let wants_image = buffers.len() < task.destinations.len();

    let bytes = read_source(&task.source)?;

    let buffer_size = match task.size {
        Some(size) if size > bytes.len() as u64 => {
            return Err(UploadError::ContractViolation(format!(
                "'{}' requests {size} bytes but its source holds {}",
                task.label,
                bytes.len()
            )))
        }
        Some(size) => size,
        None => buffers
            .iter()
            .map(|(_, capacity)| capacity.saturating_sub(task.dst_offset))
            .min()
            .unwrap_or(0)
            .min(bytes.len() as u64),
    };
    for (buffer, capacity) in &buffers {
        if task.dst_offset + buffer_size > *capacity {
            return Err(UploadError::ContractViolation(format!(
                "'{}' writes {buffer_size} bytes at offset {} into {buffer:?} of {capacity} bytes",
                task.label, task.dst_offset
            )));
        }
    }

    let payload = if wants_image {
        Some(decode_image(&bytes, task.encoding)?)
    } else {
        None
    };

    let targets = match &payload {
        Some(payload) => prepare_images(device, task, payload)?,
        None => Vec::new(),
    };

    // Staging layout: buffer bytes, then image texels on an aligned offset.
    let image_offset = buffer_size.div_ceil(IMAGE_DATA_ALIGNMENT) * IMAGE_DATA_ALIGNMENT;
    let staged_bytes = match &payload {
        Some(payload) => image_offset + payload.data.len() as u64,
        None => buffer_size,
    };

    let outcome = stage_and_submit(
        device,
        contexts,
        task,
        &bytes[..buffer_size as usize],
        &buffers,
        payload.as_ref().map(|p| (p, image_offset)),
        &targets,
        staged_bytes.max(1),
        fence_timeout,
    );

    match outcome {
        Ok(regions) => Ok(UploadReceipt {
            label: task.label.clone(),
            staged_bytes,
            regions,
            created_images: targets
                .into_iter()
                .filter_map(|t| t.created.map(|d| (t.image, d)))
                .collect(),
        }),
        Err(e) => {
            for target in targets.iter().filter(|t| t.created.is_some()) {
                let _ = device.destroy(NativeHandle::Image(target.image));
            }
            Err(e)
        }
    }
}

fn prepare_images(
    device: &dyn GraphicsDevice,
    task: &UploadTask,
    payload: &ImagePayload,
) -> Result<Vec<ImageTarget>, UploadError> {
    let mut targets = Vec::new();
    for destination in &task.destinations {
        match destination {
            UploadDestination::Buffer { .. } => {}
            UploadDestination::Image { image, descriptor } => {
                if descriptor.extent != payload.extent {
                    return Err(UploadError::ContractViolation(format!(
                        "'{}': {image:?} was declared {:?} but the source is {:?}",
                        task.label, descriptor.extent, payload.extent
                    )));
                }
                if descriptor.mip_levels < payload.mip_levels
                    || descriptor.array_layers < payload.array_layers
                {
                    return Err(UploadError::ContractViolation(format!(
                        "'{}': {image:?} has {} levels and {} layers, the source needs {} and {}",
                        task.label,
                        descriptor.mip_levels,
                        descriptor.array_layers,
                        payload.mip_levels,
                        payload.array_layers
                    )));
                }
                targets.push(ImageTarget {
                    image: *image,
                    created: None,
                });
            }
            UploadDestination::NewImage(template) => {
                let descriptor = ImageDescriptor {
                    label: template.label.clone(),
                    dimension: payload.dimension,
                    format: payload.format,
                    extent: payload.extent,
                    mip_levels: payload.mip_levels,
                    array_layers: payload.array_layers,
                    samples: 1,
                    usage: template.usage | ImageUsage::TRANSFER_DST,
                };
                match device.create_image(&descriptor) {
                    Ok(image) => targets.push(ImageTarget {
                        image,
                        created: Some(descriptor),
                    }),
                    Err(e) => {
                        for target in targets.iter().filter(|t| t.created.is_some()) {
                            let _ = device.destroy(NativeHandle::Image(target.image));
                        }
                        return Err(e.into());
                    }
                }
            }
        }
    }
    Ok(targets)
}

#[allow(clippy::too_many_arguments)]
fn stage_and_submit(
    device: &dyn GraphicsDevice,
    contexts: &Arc<ContextPool>,
    task: &UploadTask,
    buffer_bytes: &[u8],
    buffers: &[(BufferId, u64)],
    image: Option<(&ImagePayload, u64)>,
    targets: &[ImageTarget],
    staging_size: u64,
    fence_timeout: Option<Duration>,
) -> Result<usize, UploadError> {
    let context = contexts.acquire();
    log::trace!("Upload '{}' acquired context {:?}", task.label, context.fence);

    let staging = device.create_buffer(&BufferDescriptor {
        label: Some(format!("staging:{}", task.label)),
        size: staging_size,
        usage: BufferUsage::TRANSFER_SRC,
        memory: MemoryLocation::HostVisible,
    })?;

    let mut submitted = false;
    let outcome = (|| -> Result<usize, UploadError> {
        device.write_buffer(staging, 0, buffer_bytes)?;
        if let Some((payload, offset)) = image {
            device.write_buffer(staging, offset, &payload.data)?;
        }
        let regions = record(device, &context, task, staging, buffer_bytes.len() as u64, buffers, image, targets)?;
        device.reset_fences(&[context.fence])?;
        device.queue_submit(
            context.queue,
            &[SubmitInfo {
                command_buffers: vec![context.command_buffer],
                ..Default::default()
            }],
            Some(context.fence),
        )?;
        submitted = true;
        device.wait_for_fences(&[context.fence], fence_timeout)?;
        Ok(regions)
    })();

    // A submission whose wait failed may still be executing: the context and
    // the staging buffer stay untouched until its fence signals.
    if submitted && outcome.is_err() {
        log::warn!(
            "Upload '{}' gave up waiting; holding its context until the copy completes",
            task.label
        );
        if let Err(e) = device.wait_for_fences(&[context.fence], None) {
            log::error!(
                "Upload '{}' never completed ({e}); leaking its staging buffer",
                task.label
            );
            context.retire();
            return outcome;
        }
    }

    if let Err(e) = device.destroy(NativeHandle::Buffer(staging)) {
        log::warn!("Failed to destroy staging buffer of '{}': {e}", task.label);
    }
    outcome
}

#[allow(clippy::too_many_arguments)]
fn record(
    device: &dyn GraphicsDevice,
    context: &ContextGuard,
    task: &UploadTask,
    staging: BufferId,
    buffer_size: u64,
    buffers: &[(BufferId, u64)],
    image: Option<(&ImagePayload, u64)>,
    targets: &[ImageTarget],
) -> Result<usize, UploadError> {
    let consumer = task.consumer;
    let release_to = consumer
        .queue_family
        .filter(|family| *family != context.queue_family);
    let range = image
        .map(|(p, _)| ImageSubresourceRange::color(p.mip_levels, p.array_layers))
        .unwrap_or_default();

    device.reset_command_buffer(context.command_buffer)?;
    let mut recorder: Box<dyn CommandRecorder> =
        device.begin_command_buffer(context.command_buffer)?;

    recorder.pipeline_barrier(&PipelineBarrier {
        src_stage: PipelineStage::TOP_OF_PIPE,
        dst_stage: PipelineStage::TRANSFER,
        buffers: buffers
            .iter()
            .map(|(buffer, _)| BufferBarrier {
                buffer: *buffer,
                src_access: AccessFlags::empty(),
                dst_access: AccessFlags::TRANSFER_WRITE,
                src_queue_family: None,
                dst_queue_family: None,
                offset: task.dst_offset,
                size: Some(buffer_size),
            })
            .collect(),
        images: targets
            .iter()
            .map(|t| ImageBarrier {
                image: t.image,
                old_layout: ImageLayout::Undefined,
                new_layout: ImageLayout::TransferDst,
                src_access: AccessFlags::empty(),
                dst_access: AccessFlags::TRANSFER_WRITE,
                src_queue_family: None,
                dst_queue_family: None,
                range,
            })
            .collect(),
    });

    let mut regions = 0;
    if buffer_size > 0 {
        for (buffer, _) in buffers {
            recorder.copy_buffer(
                staging,
                *buffer,
                &[BufferCopy {
                    src_offset: 0,
                    dst_offset: task.dst_offset,
                    size: buffer_size,
                }],
            );
            regions += 1;
        }
    }
    if let Some((payload, offset)) = image {
        let copies: Vec<BufferImageCopy> = payload
            .regions
            .iter()
            .map(|r| BufferImageCopy {
                buffer_offset: r.buffer_offset + offset,
                ..*r
            })
            .collect();
        for target in targets {
            recorder.copy_buffer_to_image(staging, target.image, ImageLayout::TransferDst, &copies);
            regions += copies.len();
        }
    }

    recorder.pipeline_barrier(&PipelineBarrier {
        src_stage: PipelineStage::TRANSFER,
        dst_stage: consumer.stage,
        buffers: buffers
            .iter()
            .map(|(buffer, _)| BufferBarrier {
                buffer: *buffer,
                src_access: AccessFlags::TRANSFER_WRITE,
                dst_access: consumer.access,
                src_queue_family: release_to.map(|_| context.queue_family),
                dst_queue_family: release_to,
                offset: task.dst_offset,
                size: Some(buffer_size),
            })
            .collect(),
        images: targets
            .iter()
            .map(|t| ImageBarrier {
                image: t.image,
                old_layout: ImageLayout::TransferDst,
                new_layout: consumer.layout,
                src_access: AccessFlags::TRANSFER_WRITE,
                dst_access: consumer.access,
                src_queue_family: release_to.map(|_| context.queue_family),
                dst_queue_family: release_to,
                range,
            })
            .collect(),
    });

    recorder.finish()?;
    Ok(regions)
}
