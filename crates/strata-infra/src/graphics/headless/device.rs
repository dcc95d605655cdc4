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

use super::command::{HeadlessRecorder, RecordedCommand};
use super::executor::{self, QueueJob};
use crate::platform::window::HeadlessWindow;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use strata_core::math::{Extent2D, Extent3D};
use strata_core::platform::{StrataWindow, WindowId};
use strata_core::renderer::api::*;
use strata_core::renderer::{CommandRecorder, GraphicsDevice, RenderError, ResourceError};

/// Family 0 supports every capability.
pub const UNIVERSAL_FAMILY: u32 = 0;
/// Family 1 only supports transfer and compute work.
pub const TRANSFER_FAMILY: u32 = 1;

// Larger requests fail the way a real allocator would.
const MAX_ALLOCATION: u64 = 1 << 30;

pub(crate) type WindowRegistry = Arc<Mutex<HashMap<WindowId, Arc<HeadlessWindow>>>>;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn family_capabilities(family: u32) -> Option<QueueCapabilities> {
    match family {
        UNIVERSAL_FAMILY => Some(QueueCapabilities::all()),
        TRANSFER_FAMILY => Some(QueueCapabilities::TRANSFER | QueueCapabilities::COMPUTE),
        _ => None,
    }
}

/// Something the device did, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Work was handed to a queue.
    Submitted {
        /// The queue.
        queue: QueueId,
        /// Every command buffer of the submission.
        command_buffers: Vec<CommandBufferId>,
        /// The fence signaled on completion.
        fence: Option<FenceId>,
    },
    /// A queue's executor started running a submission.
    ExecutionStarted {
        /// The queue.
        queue: QueueId,
        /// Every command buffer of the submission.
        command_buffers: Vec<CommandBufferId>,
    },
    /// A fence was signaled by a queue.
    FenceSignaled(FenceId),
    /// A swapchain image was acquired.
    Acquired {
        /// The swapchain.
        swapchain: SwapchainId,
        /// The image index.
        image_index: u32,
    },
    /// A swapchain image was presented.
    Presented {
        /// The swapchain.
        swapchain: SwapchainId,
        /// The image index.
        image_index: u32,
    },
    /// A swapchain was rebuilt for its window's current size.
    SwapchainRecreated {
        /// The swapchain.
        swapchain: SwapchainId,
        /// The new extent.
        extent: Extent2D,
        /// The new image count.
        image_count: u32,
    },
}

/// A [`DeviceEvent`] with its position in the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedEvent {
    /// Zero-based, strictly increasing.
    pub sequence: u64,
    /// What happened.
    pub event: DeviceEvent,
}

#[derive(Debug)]
pub(crate) struct BufferEntry {
    pub(crate) descriptor: BufferDescriptor,
    pub(crate) data: Vec<u8>,
}

#[derive(Debug)]
pub(crate) struct ImageEntry {
    pub(crate) descriptor: ImageDescriptor,
    pub(crate) layout: ImageLayout,
    pub(crate) subresources: HashMap<(u32, u32), Vec<u8>>,
    pub(crate) swapchain: Option<SwapchainId>,
}

#[derive(Debug)]
pub(crate) struct SwapchainEntry {
    window: Arc<HeadlessWindow>,
    descriptor: SwapchainDescriptor,
    extent: Extent2D,
    images: Vec<ImageId>,
    next_image: usize,
    recreations: u32,
}

impl SwapchainEntry {
    fn is_stale(&self) -> bool {
        self.window.is_minimized() || self.window.inner_size() != self.extent
    }
}

#[derive(Debug, Default)]
pub(crate) struct CommandBufferEntry {
    pool: Option<CommandPoolId>,
    pub(crate) commands: Vec<RecordedCommand>,
    recordings: u64,
}

#[derive(Debug)]
pub(crate) enum DeviceObject {
    Swapchain(SwapchainEntry),
    CommandBuffer(CommandBufferEntry),
    Buffer(BufferEntry),
    Image(ImageEntry),
    ImageView(ImageViewDescriptor),
    DescriptorSet(HashMap<(u32, u32), DescriptorWrite>),
    Framebuffer(FramebufferDescriptor),
    /// Objects with no host-side state beyond their existence.
    Plain,
}

#[derive(Debug, Default)]
pub(crate) struct SyncState {
    pub(crate) fences: HashMap<FenceId, bool>,
    pub(crate) semaphores: HashMap<SemaphoreId, u32>,
    pub(crate) events: HashMap<EventId, bool>,
    pub(crate) in_flight: usize,
}

#[derive(Debug, Default)]
struct Faults {
    kinds: HashMap<ObjectKind, u32>,
    buffer_labels: HashSet<String>,
    submissions: u32,
    suboptimal_presents: u32,
}

#[derive(Debug)]
struct QueueEntry {
    family: u32,
    sender: flume::Sender<QueueJob>,
    worker: Option<JoinHandle<()>>,
}

/// State shared between the device handle, its recorders and its queue executors.
#[derive(Debug)]
pub(crate) struct DeviceShared {
    label: Option<String>,
    windows: WindowRegistry,
    next_id: AtomicU64,
    pub(crate) objects: Mutex<HashMap<NativeHandle, DeviceObject>>,
    pub(crate) sync: Mutex<SyncState>,
    pub(crate) sync_changed: Condvar,
    queues: Mutex<HashMap<QueueId, QueueEntry>>,
    journal: Mutex<Vec<LoggedEvent>>,
    faults: Mutex<Faults>,
    image_count_override: Mutex<Option<u32>>,
    pub(crate) queue_delay: Mutex<Duration>,
}

impl DeviceShared {
    pub(crate) fn record(&self, event: DeviceEvent) {
        let mut journal = lock(&self.journal);
        let sequence = journal.len() as u64;
        log::trace!("Device event #{sequence}: {event:?}");
        journal.push(LoggedEvent { sequence, event });
    }

    pub(crate) fn store_recording(
        &self,
        command_buffer: CommandBufferId,
        commands: Vec<RecordedCommand>,
    ) -> Result<(), ResourceError> {
        match lock(&self.objects).get_mut(&NativeHandle::CommandBuffer(command_buffer)) {
            Some(DeviceObject::CommandBuffer(entry)) => {
                entry.commands = commands;
                entry.recordings += 1;
                Ok(())
            }
            _ => Err(ResourceError::InvalidHandle(NativeHandle::CommandBuffer(
                command_buffer,
            ))),
        }
    }

    fn allocate(&self, kind: ObjectKind, label: Option<&str>) -> Result<u64, ResourceError> {
        let mut faults = lock(&self.faults);
        if let Some(remaining) = faults.kinds.get_mut(&kind) {
            *remaining -= 1;
            if *remaining == 0 {
                faults.kinds.remove(&kind);
            }
            log::debug!("Injected creation failure for {kind}");
            return Err(ResourceError::CreationFailed {
                kind,
                reason: "injected".to_string(),
            });
        }
        if kind == ObjectKind::Buffer {
            if let Some(label) = label.filter(|l| faults.buffer_labels.contains(*l)) {
                return Err(ResourceError::CreationFailed {
                    kind,
                    reason: format!("injected for '{label}'"),
                });
            }
        }
        Ok(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn insert(&self, handle: NativeHandle, object: DeviceObject) {
        log::trace!("Created {handle:?}");
        lock(&self.objects).insert(handle, object);
    }

    fn require(&self, handles: &[NativeHandle]) -> Result<(), ResourceError> {
        let objects = lock(&self.objects);
        match handles.iter().find(|h| !objects.contains_key(h)) {
            Some(missing) => Err(ResourceError::InvalidHandle(*missing)),
            None => Ok(()),
        }
    }

    fn create_swapchain_images(
        &self,
        swapchain: SwapchainId,
        descriptor: &SwapchainDescriptor,
        extent: Extent2D,
    ) -> Vec<ImageId> {
        let count = lock(&self.image_count_override)
            .unwrap_or(descriptor.min_image_count)
            .max(1);
        let mut objects = lock(&self.objects);
        (0..count)
            .map(|_| {
                let id = ImageId(self.next_id.fetch_add(1, Ordering::Relaxed));
                objects.insert(
                    NativeHandle::Image(id),
                    DeviceObject::Image(ImageEntry {
                        descriptor: ImageDescriptor {
                            label: descriptor.label.clone(),
                            dimension: ImageDimension::D2,
                            format: descriptor.format,
                            extent: Extent3D::new(extent.width, extent.height, 1),
                            mip_levels: 1,
                            array_layers: 1,
                            samples: 1,
                            usage: ImageUsage::COLOR_ATTACHMENT | ImageUsage::TRANSFER_DST,
                        },
                        layout: ImageLayout::Undefined,
                        subresources: HashMap::new(),
                        swapchain: Some(swapchain),
                    }),
                );
                id
            })
            .collect()
    }

    fn signal_semaphores(&self, semaphores: &[SemaphoreId]) {
        let mut sync = lock(&self.sync);
        for semaphore in semaphores {
            if let Some(count) = sync.semaphores.get_mut(semaphore) {
                *count += 1;
            }
        }
        self.sync_changed.notify_all();
    }

    fn enqueue(&self, queue: QueueId, job: QueueJob) -> Result<(), RenderError> {
        let queues = lock(&self.queues);
        let entry = queues.get(&queue).ok_or(RenderError::Resource(
            ResourceError::InvalidHandle(NativeHandle::Queue(queue)),
        ))?;
        lock(&self.sync).in_flight += 1;
        entry.sender.send(job).map_err(|_| {
            lock(&self.sync).in_flight -= 1;
            RenderError::DeviceLost
        })
    }
}

/// A device whose objects live in host memory.
///
/// Obtained from [`HeadlessBackend`](super::HeadlessBackend). Besides the
/// [`GraphicsDevice`] contract it exposes inspection and fault-injection
/// methods for tests.
#[derive(Debug)]
pub struct HeadlessDevice {
    id: DeviceId,
    shared: Arc<DeviceShared>,
}

impl HeadlessDevice {
    pub(crate) fn new(id: DeviceId, label: Option<String>, windows: WindowRegistry) -> Self {
        log::info!(
            "Headless device {:?} created ({})",
            id,
            label.as_deref().unwrap_or("unlabelled")
        );
        Self {
            id,
            shared: Arc::new(DeviceShared {
                label,
                windows,
                next_id: AtomicU64::new(1),
                objects: Mutex::new(HashMap::new()),
                sync: Mutex::new(SyncState::default()),
                sync_changed: Condvar::new(),
                queues: Mutex::new(HashMap::new()),
                journal: Mutex::new(Vec::new()),
                faults: Mutex::new(Faults::default()),
                image_count_override: Mutex::new(None),
                queue_delay: Mutex::new(Duration::ZERO),
            }),
        }
    }

    /// The label the device was created with.
    pub fn label(&self) -> Option<&str> {
        self.shared.label.as_deref()
    }

    // --- Configuration & fault injection ---

    /// Forces the image count of swapchains created or recreated from now on.
    pub fn set_swapchain_image_count(&self, count: Option<u32>) {
        *lock(&self.shared.image_count_override) = count;
    }

    /// Makes every queue executor sleep this long before running a submission.
    pub fn set_queue_delay(&self, delay: Duration) {
        *lock(&self.shared.queue_delay) = delay;
    }

    /// Makes the next `count` creations of `kind` fail.
    pub fn fail_next(&self, kind: ObjectKind, count: u32) {
        if count > 0 {
            *lock(&self.shared.faults).kinds.entry(kind).or_default() += count;
        }
    }

    /// Makes every creation of a buffer carrying `label` fail.
    pub fn fail_buffers_labelled(&self, label: impl Into<String>) {
        lock(&self.shared.faults).buffer_labels.insert(label.into());
    }

    /// Makes the next `count` queue submissions fail.
    pub fn fail_next_submissions(&self, count: u32) {
        lock(&self.shared.faults).submissions += count;
    }

    /// Makes the next `count` successful presents report `Suboptimal`.
    pub fn report_suboptimal_presents(&self, count: u32) {
        lock(&self.shared.faults).suboptimal_presents += count;
    }

    // --- Inspection ---

    /// Every event so far, oldest first.
    pub fn journal(&self) -> Vec<LoggedEvent> {
        lock(&self.shared.journal).clone()
    }

    /// Returns `true` while `handle` has not been destroyed.
    pub fn is_alive(&self, handle: NativeHandle) -> bool {
        lock(&self.shared.objects).contains_key(&handle)
    }

    /// Number of live objects of `kind`.
    pub fn live_count(&self, kind: ObjectKind) -> usize {
        lock(&self.shared.objects)
            .keys()
            .filter(|h| h.kind() == kind)
            .count()
    }

    /// Number of live objects, all kinds together.
    pub fn live_objects(&self) -> usize {
        lock(&self.shared.objects).len()
    }

    /// A copy of a buffer's contents.
    pub fn buffer_contents(&self, buffer: BufferId) -> Option<Vec<u8>> {
        match lock(&self.shared.objects).get(&NativeHandle::Buffer(buffer)) {
            Some(DeviceObject::Buffer(entry)) => Some(entry.data.clone()),
            _ => None,
        }
    }

    /// The descriptor a buffer was created with.
    pub fn buffer_descriptor(&self, buffer: BufferId) -> Option<BufferDescriptor> {
        match lock(&self.shared.objects).get(&NativeHandle::Buffer(buffer)) {
            Some(DeviceObject::Buffer(entry)) => Some(entry.descriptor.clone()),
            _ => None,
        }
    }

    /// The descriptor an image was created with.
    pub fn image_descriptor(&self, image: ImageId) -> Option<ImageDescriptor> {
        match lock(&self.shared.objects).get(&NativeHandle::Image(image)) {
            Some(DeviceObject::Image(entry)) => Some(entry.descriptor.clone()),
            _ => None,
        }
    }

    /// The layout an image was last transitioned to.
    pub fn image_layout(&self, image: ImageId) -> Option<ImageLayout> {
        match lock(&self.shared.objects).get(&NativeHandle::Image(image)) {
            Some(DeviceObject::Image(entry)) => Some(entry.layout),
            _ => None,
        }
    }

    /// The texels copied into one mip level and array layer.
    pub fn image_subresource(&self, image: ImageId, mip: u32, layer: u32) -> Option<Vec<u8>> {
        match lock(&self.shared.objects).get(&NativeHandle::Image(image)) {
            Some(DeviceObject::Image(entry)) => entry.subresources.get(&(mip, layer)).cloned(),
            _ => None,
        }
    }

    /// The image an image view looks at.
    pub fn image_view_target(&self, view: ImageViewId) -> Option<ImageId> {
        match lock(&self.shared.objects).get(&NativeHandle::ImageView(view)) {
            Some(DeviceObject::ImageView(descriptor)) => Some(descriptor.image),
            _ => None,
        }
    }

    /// The descriptor a framebuffer was created with.
    pub fn framebuffer_descriptor(&self, framebuffer: FramebufferId) -> Option<FramebufferDescriptor> {
        match lock(&self.shared.objects).get(&NativeHandle::Framebuffer(framebuffer)) {
            Some(DeviceObject::Framebuffer(descriptor)) => Some(descriptor.clone()),
            _ => None,
        }
    }

    /// The writes applied to a descriptor set, ordered by binding and element.
    pub fn descriptor_writes(&self, set: DescriptorSetId) -> Vec<DescriptorWrite> {
        match lock(&self.shared.objects).get(&NativeHandle::DescriptorSet(set)) {
            Some(DeviceObject::DescriptorSet(writes)) => {
                let mut writes: Vec<_> = writes.iter().map(|(k, w)| (*k, *w)).collect();
                writes.sort_by_key(|(k, _)| *k);
                writes.into_iter().map(|(_, w)| w).collect()
            }
            _ => Vec::new(),
        }
    }

    /// The commands of a command buffer's last recording.
    pub fn recorded_commands(&self, command_buffer: CommandBufferId) -> Vec<RecordedCommand> {
        match lock(&self.shared.objects).get(&NativeHandle::CommandBuffer(command_buffer)) {
            Some(DeviceObject::CommandBuffer(entry)) => entry.commands.clone(),
            _ => Vec::new(),
        }
    }

    /// How many times a command buffer has been recorded.
    pub fn recording_count(&self, command_buffer: CommandBufferId) -> u64 {
        match lock(&self.shared.objects).get(&NativeHandle::CommandBuffer(command_buffer)) {
            Some(DeviceObject::CommandBuffer(entry)) => entry.recordings,
            _ => 0,
        }
    }

    /// How many times a swapchain has been recreated.
    pub fn swapchain_recreations(&self, swapchain: SwapchainId) -> u32 {
        match lock(&self.shared.objects).get(&NativeHandle::Swapchain(swapchain)) {
            Some(DeviceObject::Swapchain(entry)) => entry.recreations,
            _ => 0,
        }
    }

    fn create_plain(
        &self,
        kind: ObjectKind,
        label: Option<&str>,
        requires: &[NativeHandle],
    ) -> Result<u64, ResourceError> {
        self.shared.require(requires)?;
        self.shared.allocate(kind, label)
    }
}

impl Drop for HeadlessDevice {
    fn drop(&mut self) {
        let queues: Vec<QueueEntry> = lock(&self.shared.queues).drain().map(|(_, q)| q).collect();
        for queue in &queues {
            let _ = queue.sender.send(QueueJob::Shutdown);
        }
        for mut queue in queues {
            if let Some(worker) = queue.worker.take() {
                if worker.join().is_err() {
                    log::error!("A queue executor of device {:?} panicked", self.id);
                }
            }
        }
        log::info!("Headless device {:?} destroyed", self.id);
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn id(&self) -> DeviceId {
        self.id
    }

    // --- Queues & presentation ---

    fn get_queue(&self, descriptor: &QueueDescriptor) -> Result<QueueId, ResourceError> {
        let transfer_only = family_capabilities(TRANSFER_FAMILY)
            .is_some_and(|caps| caps.contains(descriptor.capabilities));
        let family = descriptor.family.unwrap_or(
            if transfer_only && !descriptor.capabilities.is_empty() {
                TRANSFER_FAMILY
            } else {
                UNIVERSAL_FAMILY
            },
        );
        let supported = family_capabilities(family).ok_or_else(|| ResourceError::CreationFailed {
            kind: ObjectKind::Queue,
            reason: format!("no queue family {family}"),
        })?;
        if !supported.contains(descriptor.capabilities) {
            return Err(ResourceError::CreationFailed {
                kind: ObjectKind::Queue,
                reason: format!(
                    "family {family} does not support {:?}",
                    descriptor.capabilities
                ),
            });
        }

        let id = QueueId(
            self.shared
                .allocate(ObjectKind::Queue, descriptor.label.as_deref())?,
        );
        let (sender, receiver) = flume::unbounded();
        let shared = Arc::clone(&self.shared);
        let worker = std::thread::Builder::new()
            .name(format!("strata-queue-{}", id.0))
            .spawn(move || executor::run(shared, id, receiver))
            .map_err(|e| ResourceError::CreationFailed {
                kind: ObjectKind::Queue,
                reason: e.to_string(),
            })?;
        lock(&self.shared.queues).insert(
            id,
            QueueEntry {
                family,
                sender,
                worker: Some(worker),
            },
        );
        log::debug!("Queue {:?} created on family {family}", id);
        Ok(id)
    }

    fn queue_family_index(&self, queue: QueueId) -> Result<u32, ResourceError> {
        lock(&self.shared.queues)
            .get(&queue)
            .map(|q| q.family)
            .ok_or(ResourceError::InvalidHandle(NativeHandle::Queue(queue)))
    }

    fn create_swapchain(
        &self,
        descriptor: &SwapchainDescriptor,
    ) -> Result<SwapchainId, ResourceError> {
        let window = lock(&self.shared.windows)
            .get(&descriptor.window)
            .cloned()
            .ok_or(ResourceError::InvalidHandle(NativeHandle::Window(
                descriptor.window,
            )))?;
        let extent = window.inner_size();
        if extent.is_empty() {
            return Err(ResourceError::CreationFailed {
                kind: ObjectKind::Swapchain,
                reason: "the surface has a zero extent".to_string(),
            });
        }
        let id = SwapchainId(
            self.shared
                .allocate(ObjectKind::Swapchain, descriptor.label.as_deref())?,
        );
        let images = self.shared.create_swapchain_images(id, descriptor, extent);
        log::debug!(
            "Swapchain {:?} created: {}x{}, {} images",
            id,
            extent.width,
            extent.height,
            images.len()
        );
        self.shared.insert(
            NativeHandle::Swapchain(id),
            DeviceObject::Swapchain(SwapchainEntry {
                window,
                descriptor: descriptor.clone(),
                extent,
                images,
                next_image: 0,
                recreations: 0,
            }),
        );
        Ok(id)
    }

    fn recreate_swapchain(&self, swapchain: SwapchainId) -> Result<(), ResourceError> {
        let handle = NativeHandle::Swapchain(swapchain);
        let (descriptor, extent, old_images) = {
            let objects = lock(&self.shared.objects);
            match objects.get(&handle) {
                Some(DeviceObject::Swapchain(entry)) => (
                    entry.descriptor.clone(),
                    entry.window.inner_size(),
                    entry.images.clone(),
                ),
                _ => return Err(ResourceError::InvalidHandle(handle)),
            }
        };
        if extent.is_empty() {
            return Err(ResourceError::CreationFailed {
                kind: ObjectKind::Swapchain,
                reason: "the surface has a zero extent".to_string(),
            });
        }
        let images = self
            .shared
            .create_swapchain_images(swapchain, &descriptor, extent);
        let image_count = images.len() as u32;
        {
            let mut objects = lock(&self.shared.objects);
            for image in old_images {
                objects.remove(&NativeHandle::Image(image));
            }
            if let Some(DeviceObject::Swapchain(entry)) = objects.get_mut(&handle) {
                entry.extent = extent;
                entry.images = images;
                entry.next_image = 0;
                entry.recreations += 1;
            }
        }
        self.shared.record(DeviceEvent::SwapchainRecreated {
            swapchain,
            extent,
            image_count,
        });
        log::debug!(
            "Swapchain {:?} recreated: {}x{}, {image_count} images",
            swapchain,
            extent.width,
            extent.height
        );
        Ok(())
    }

    fn swapchain_images(&self, swapchain: SwapchainId) -> Result<Vec<ImageId>, ResourceError> {
        match lock(&self.shared.objects).get(&NativeHandle::Swapchain(swapchain)) {
            Some(DeviceObject::Swapchain(entry)) => Ok(entry.images.clone()),
            _ => Err(ResourceError::InvalidHandle(NativeHandle::Swapchain(
                swapchain,
            ))),
        }
    }

    fn swapchain_extent(&self, swapchain: SwapchainId) -> Result<Extent2D, ResourceError> {
        match lock(&self.shared.objects).get(&NativeHandle::Swapchain(swapchain)) {
            Some(DeviceObject::Swapchain(entry)) => Ok(entry.extent),
            _ => Err(ResourceError::InvalidHandle(NativeHandle::Swapchain(
                swapchain,
            ))),
        }
    }

    fn acquire_next_image(
        &self,
        swapchain: SwapchainId,
        signal: Option<SemaphoreId>,
        _timeout: Option<Duration>,
    ) -> Result<AcquireResult, RenderError> {
        let image_index = {
            let mut objects = lock(&self.shared.objects);
            let entry = match objects.get_mut(&NativeHandle::Swapchain(swapchain)) {
                Some(DeviceObject::Swapchain(entry)) => entry,
                _ => {
                    return Err(RenderError::Resource(ResourceError::InvalidHandle(
                        NativeHandle::Swapchain(swapchain),
                    )))
                }
            };
            if entry.is_stale() {
                return Ok(AcquireResult::OutOfDate);
            }
            let index = entry.next_image;
            entry.next_image = (index + 1) % entry.images.len().max(1);
            index as u32
        };
        if let Some(semaphore) = signal {
            self.shared.signal_semaphores(&[semaphore]);
        }
        self.shared.record(DeviceEvent::Acquired {
            swapchain,
            image_index,
        });
        Ok(AcquireResult::Acquired {
            image_index,
            suboptimal: false,
        })
    }

    fn queue_submit(
        &self,
        queue: QueueId,
        submits: &[SubmitInfo],
        fence: Option<FenceId>,
    ) -> Result<(), RenderError> {
        {
            let mut faults = lock(&self.shared.faults);
            if faults.submissions > 0 {
                faults.submissions -= 1;
                return Err(RenderError::SubmissionFailed("injected".to_string()));
            }
        }
        let mut handles: Vec<NativeHandle> = Vec::new();
        for submit in submits {
            handles.extend(submit.command_buffers.iter().map(|c| NativeHandle::CommandBuffer(*c)));
            handles.extend(submit.wait_semaphores.iter().map(|(s, _)| NativeHandle::Semaphore(*s)));
            handles.extend(submit.signal_semaphores.iter().map(|s| NativeHandle::Semaphore(*s)));
        }
        handles.extend(fence.map(NativeHandle::Fence));
        if !lock(&self.shared.queues).contains_key(&queue) {
            return Err(ResourceError::InvalidHandle(NativeHandle::Queue(queue)).into());
        }
        self.shared.require(&handles)?;
        if let Some(fence) = fence {
            if lock(&self.shared.sync).fences.get(&fence).copied() == Some(true) {
                log::warn!("Fence {:?} submitted while still signaled", fence);
            }
        }

        let command_buffers: Vec<CommandBufferId> = submits
            .iter()
            .flat_map(|s| s.command_buffers.iter().copied())
            .collect();
        self.shared.record(DeviceEvent::Submitted {
            queue,
            command_buffers,
            fence,
        });
        self.shared.enqueue(
            queue,
            QueueJob::Submit {
                submits: submits.to_vec(),
                fence,
            },
        )
    }

    fn queue_present(
        &self,
        queue: QueueId,
        info: &PresentInfo,
    ) -> Result<PresentResult, RenderError> {
        let handle = NativeHandle::Swapchain(info.swapchain);
        let stale = match lock(&self.shared.objects).get(&handle) {
            Some(DeviceObject::Swapchain(entry)) => entry.is_stale(),
            _ => return Err(RenderError::Resource(ResourceError::InvalidHandle(handle))),
        };
        // The wait semaphores are consumed even when the image is not shown.
        self.shared.enqueue(
            queue,
            QueueJob::Present {
                info: info.clone(),
                shown: !stale,
            },
        )?;
        if stale {
            return Ok(PresentResult::OutOfDate);
        }
        let mut faults = lock(&self.shared.faults);
        if faults.suboptimal_presents > 0 {
            faults.suboptimal_presents -= 1;
            return Ok(PresentResult::Suboptimal);
        }
        Ok(PresentResult::Success)
    }

    fn wait_idle(&self) -> Result<(), RenderError> {
        let mut sync = lock(&self.shared.sync);
        while sync.in_flight > 0 {
            sync = self
                .shared
                .sync_changed
                .wait(sync)
                .unwrap_or_else(PoisonError::into_inner);
        }
        Ok(())
    }

    // --- Synchronization ---

    fn create_fence(&self, signaled: bool) -> Result<FenceId, ResourceError> {
        let id = FenceId(self.create_plain(ObjectKind::Fence, None, &[])?);
        lock(&self.shared.sync).fences.insert(id, signaled);
        self.shared.insert(NativeHandle::Fence(id), DeviceObject::Plain);
        Ok(id)
    }

    fn wait_for_fences(
        &self,
        fences: &[FenceId],
        timeout: Option<Duration>,
    ) -> Result<(), RenderError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut sync = lock(&self.shared.sync);
        loop {
            let mut all_signaled = true;
            for fence in fences {
                match sync.fences.get(fence) {
                    Some(true) => {}
                    Some(false) => all_signaled = false,
                    None => {
                        return Err(RenderError::Resource(ResourceError::InvalidHandle(
                            NativeHandle::Fence(*fence),
                        )))
                    }
                }
            }
            if all_signaled {
                return Ok(());
            }
            sync = match deadline {
                None => self
                    .shared
                    .sync_changed
                    .wait(sync)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(RenderError::Timeout(timeout.unwrap_or_default()));
                    }
                    self.shared
                        .sync_changed
                        .wait_timeout(sync, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    fn reset_fences(&self, fences: &[FenceId]) -> Result<(), RenderError> {
        let mut sync = lock(&self.shared.sync);
        for fence in fences {
            match sync.fences.get_mut(fence) {
                Some(state) => *state = false,
                None => {
                    return Err(RenderError::Resource(ResourceError::InvalidHandle(
                        NativeHandle::Fence(*fence),
                    )))
                }
            }
        }
        Ok(())
    }

    fn fence_status(&self, fence: FenceId) -> Result<bool, RenderError> {
        lock(&self.shared.sync)
            .fences
            .get(&fence)
            .copied()
            .ok_or(RenderError::Resource(ResourceError::InvalidHandle(
                NativeHandle::Fence(fence),
            )))
    }

    fn create_semaphore(&self) -> Result<SemaphoreId, ResourceError> {
        let id = SemaphoreId(self.create_plain(ObjectKind::Semaphore, None, &[])?);
        lock(&self.shared.sync).semaphores.insert(id, 0);
        self.shared.insert(NativeHandle::Semaphore(id), DeviceObject::Plain);
        Ok(id)
    }

    fn create_event(&self) -> Result<EventId, ResourceError> {
        let id = EventId(self.create_plain(ObjectKind::Event, None, &[])?);
        lock(&self.shared.sync).events.insert(id, false);
        self.shared.insert(NativeHandle::Event(id), DeviceObject::Plain);
        Ok(id)
    }

    // --- Commands ---

    fn create_command_pool(
        &self,
        descriptor: &CommandPoolDescriptor,
    ) -> Result<CommandPoolId, ResourceError> {
        if !lock(&self.shared.queues).contains_key(&descriptor.queue) {
            return Err(ResourceError::InvalidHandle(NativeHandle::Queue(
                descriptor.queue,
            )));
        }
        let id = CommandPoolId(self.create_plain(
            ObjectKind::CommandPool,
            descriptor.label.as_deref(),
            &[],
        )?);
        self.shared
            .insert(NativeHandle::CommandPool(id), DeviceObject::Plain);
        Ok(id)
    }

    fn allocate_command_buffer(
        &self,
        pool: CommandPoolId,
        _level: CommandBufferLevel,
    ) -> Result<CommandBufferId, ResourceError> {
        let id = CommandBufferId(self.create_plain(
            ObjectKind::CommandBuffer,
            None,
            &[NativeHandle::CommandPool(pool)],
        )?);
        self.shared.insert(
            NativeHandle::CommandBuffer(id),
            DeviceObject::CommandBuffer(CommandBufferEntry {
                pool: Some(pool),
                ..Default::default()
            }),
        );
        Ok(id)
    }

    fn reset_command_buffer(&self, command_buffer: CommandBufferId) -> Result<(), RenderError> {
        let handle = NativeHandle::CommandBuffer(command_buffer);
        match lock(&self.shared.objects).get_mut(&handle) {
            Some(DeviceObject::CommandBuffer(entry)) => {
                entry.commands.clear();
                Ok(())
            }
            _ => Err(RenderError::Resource(ResourceError::InvalidHandle(handle))),
        }
    }

    fn begin_command_buffer(
        &self,
        command_buffer: CommandBufferId,
    ) -> Result<Box<dyn CommandRecorder>, RenderError> {
        self.shared
            .require(&[NativeHandle::CommandBuffer(command_buffer)])?;
        Ok(Box::new(HeadlessRecorder {
            shared: Arc::clone(&self.shared),
            command_buffer,
            commands: Vec::new(),
            pass_open: false,
            debug_depth: 0,
        }))
    }

    // --- Resources ---

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        if descriptor.size > MAX_ALLOCATION {
            return Err(ResourceError::OutOfDeviceMemory);
        }
        let id = BufferId(
            self.shared
                .allocate(ObjectKind::Buffer, descriptor.label.as_deref())?,
        );
        self.shared.insert(
            NativeHandle::Buffer(id),
            DeviceObject::Buffer(BufferEntry {
                descriptor: descriptor.clone(),
                data: vec![0; descriptor.size as usize],
            }),
        );
        Ok(id)
    }

    fn write_buffer(&self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let handle = NativeHandle::Buffer(buffer);
        let mut objects = lock(&self.shared.objects);
        let entry = match objects.get_mut(&handle) {
            Some(DeviceObject::Buffer(entry)) => entry,
            _ => return Err(ResourceError::InvalidHandle(handle)),
        };
        if entry.descriptor.memory != MemoryLocation::HostVisible {
            return Err(ResourceError::BackendError(format!(
                "{handle:?} is not host visible"
            )));
        }
        let end = offset + data.len() as u64;
        if end > entry.data.len() as u64 {
            return Err(ResourceError::OutOfBounds {
                handle,
                end,
                size: entry.data.len() as u64,
            });
        }
        entry.data[offset as usize..end as usize].copy_from_slice(data);
        Ok(())
    }

    fn create_image(&self, descriptor: &ImageDescriptor) -> Result<ImageId, ResourceError> {
        let extent = descriptor.extent;
        if extent.width == 0 || extent.height == 0 || extent.depth == 0 {
            return Err(ResourceError::CreationFailed {
                kind: ObjectKind::Image,
                reason: format!("zero extent {extent:?}"),
            });
        }
        if descriptor.data_size() > MAX_ALLOCATION {
            return Err(ResourceError::OutOfDeviceMemory);
        }
        let id = ImageId(
            self.shared
                .allocate(ObjectKind::Image, descriptor.label.as_deref())?,
        );
        self.shared.insert(
            NativeHandle::Image(id),
            DeviceObject::Image(ImageEntry {
                descriptor: descriptor.clone(),
                layout: ImageLayout::Undefined,
                subresources: HashMap::new(),
                swapchain: None,
            }),
        );
        Ok(id)
    }

    fn create_image_view(
        &self,
        descriptor: &ImageViewDescriptor,
    ) -> Result<ImageViewId, ResourceError> {
        let id = ImageViewId(self.create_plain(
            ObjectKind::ImageView,
            descriptor.label.as_deref(),
            &[NativeHandle::Image(descriptor.image)],
        )?);
        self.shared.insert(
            NativeHandle::ImageView(id),
            DeviceObject::ImageView(descriptor.clone()),
        );
        Ok(id)
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError> {
        let id = SamplerId(self.create_plain(
            ObjectKind::Sampler,
            descriptor.label.as_deref(),
            &[],
        )?);
        self.shared.insert(NativeHandle::Sampler(id), DeviceObject::Plain);
        Ok(id)
    }

    fn create_descriptor_set_layout(
        &self,
        descriptor: &DescriptorSetLayoutDescriptor,
    ) -> Result<DescriptorSetLayoutId, ResourceError> {
        let id = DescriptorSetLayoutId(self.create_plain(
            ObjectKind::DescriptorSetLayout,
            descriptor.label.as_deref(),
            &[],
        )?);
        self.shared
            .insert(NativeHandle::DescriptorSetLayout(id), DeviceObject::Plain);
        Ok(id)
    }

    fn create_descriptor_pool(
        &self,
        descriptor: &DescriptorPoolDescriptor,
    ) -> Result<DescriptorPoolId, ResourceError> {
        let id = DescriptorPoolId(self.create_plain(
            ObjectKind::DescriptorPool,
            descriptor.label.as_deref(),
            &[],
        )?);
        self.shared
            .insert(NativeHandle::DescriptorPool(id), DeviceObject::Plain);
        Ok(id)
    }

    fn allocate_descriptor_set(
        &self,
        descriptor: &DescriptorSetDescriptor,
    ) -> Result<DescriptorSetId, ResourceError> {
        let id = DescriptorSetId(self.create_plain(
            ObjectKind::DescriptorSet,
            descriptor.label.as_deref(),
            &[
                NativeHandle::DescriptorPool(descriptor.pool),
                NativeHandle::DescriptorSetLayout(descriptor.layout),
            ],
        )?);
        self.shared.insert(
            NativeHandle::DescriptorSet(id),
            DeviceObject::DescriptorSet(HashMap::new()),
        );
        Ok(id)
    }

    fn update_descriptor_sets(&self, writes: &[DescriptorWrite]) -> Result<(), ResourceError> {
        let mut objects = lock(&self.shared.objects);
        for write in writes {
            let referenced: Vec<NativeHandle> = match write.resource {
                DescriptorResource::Buffer { buffer, .. } => vec![NativeHandle::Buffer(buffer)],
                DescriptorResource::Image { view, .. } => vec![NativeHandle::ImageView(view)],
                DescriptorResource::Sampler(sampler) => vec![NativeHandle::Sampler(sampler)],
                DescriptorResource::CombinedImageSampler { view, sampler, .. } => vec![
                    NativeHandle::ImageView(view),
                    NativeHandle::Sampler(sampler),
                ],
            };
            if let Some(missing) = referenced.iter().find(|h| !objects.contains_key(h)) {
                return Err(ResourceError::InvalidHandle(*missing));
            }
            let handle = NativeHandle::DescriptorSet(write.set);
            match objects.get_mut(&handle) {
                Some(DeviceObject::DescriptorSet(bindings)) => {
                    bindings.insert((write.binding, write.array_element), *write);
                }
                _ => return Err(ResourceError::InvalidHandle(handle)),
            }
        }
        Ok(())
    }

    fn create_render_pass(
        &self,
        descriptor: &RenderPassDescriptor,
    ) -> Result<RenderPassId, ResourceError> {
        let id = RenderPassId(self.create_plain(
            ObjectKind::RenderPass,
            descriptor.label.as_deref(),
            &[],
        )?);
        self.shared
            .insert(NativeHandle::RenderPass(id), DeviceObject::Plain);
        Ok(id)
    }

    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let id = ShaderModuleId(self.create_plain(
            ObjectKind::ShaderModule,
            descriptor.label.as_deref(),
            &[],
        )?);
        self.shared
            .insert(NativeHandle::ShaderModule(id), DeviceObject::Plain);
        Ok(id)
    }

    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError> {
        let requires: Vec<NativeHandle> = descriptor
            .set_layouts
            .iter()
            .map(|l| NativeHandle::DescriptorSetLayout(*l))
            .collect();
        let id = PipelineLayoutId(self.create_plain(
            ObjectKind::PipelineLayout,
            descriptor.label.as_deref(),
            &requires,
        )?);
        self.shared
            .insert(NativeHandle::PipelineLayout(id), DeviceObject::Plain);
        Ok(id)
    }

    fn create_graphics_pipeline(
        &self,
        descriptor: &GraphicsPipelineDescriptor,
    ) -> Result<PipelineId, ResourceError> {
        let mut requires = vec![
            NativeHandle::PipelineLayout(descriptor.layout),
            NativeHandle::RenderPass(descriptor.render_pass),
        ];
        requires.extend(
            descriptor
                .stages
                .iter()
                .map(|s| NativeHandle::ShaderModule(s.module)),
        );
        let id = PipelineId(self.create_plain(
            ObjectKind::Pipeline,
            descriptor.label.as_deref(),
            &requires,
        )?);
        self.shared
            .insert(NativeHandle::Pipeline(id), DeviceObject::Plain);
        Ok(id)
    }

    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<PipelineId, ResourceError> {
        let id = PipelineId(self.create_plain(
            ObjectKind::Pipeline,
            descriptor.label.as_deref(),
            &[
                NativeHandle::PipelineLayout(descriptor.layout),
                NativeHandle::ShaderModule(descriptor.stage.module),
            ],
        )?);
        self.shared
            .insert(NativeHandle::Pipeline(id), DeviceObject::Plain);
        Ok(id)
    }

    fn create_framebuffer(
        &self,
        descriptor: &FramebufferDescriptor,
    ) -> Result<FramebufferId, ResourceError> {
        let mut requires = vec![NativeHandle::RenderPass(descriptor.render_pass)];
        requires.extend(
            descriptor
                .attachments
                .iter()
                .map(|v| NativeHandle::ImageView(*v)),
        );
        if descriptor.extent.is_empty() {
            return Err(ResourceError::CreationFailed {
                kind: ObjectKind::Framebuffer,
                reason: "zero extent".to_string(),
            });
        }
        let id = FramebufferId(self.create_plain(
            ObjectKind::Framebuffer,
            descriptor.label.as_deref(),
            &requires,
        )?);
        self.shared.insert(
            NativeHandle::Framebuffer(id),
            DeviceObject::Framebuffer(descriptor.clone()),
        );
        Ok(id)
    }

    fn create_query_pool(
        &self,
        descriptor: &QueryPoolDescriptor,
    ) -> Result<QueryPoolId, ResourceError> {
        let id = QueryPoolId(self.create_plain(
            ObjectKind::QueryPool,
            descriptor.label.as_deref(),
            &[],
        )?);
        self.shared
            .insert(NativeHandle::QueryPool(id), DeviceObject::Plain);
        Ok(id)
    }

    fn destroy(&self, handle: NativeHandle) -> Result<(), ResourceError> {
        if !handle.kind().is_native()
            || matches!(
                handle,
                NativeHandle::Window(_) | NativeHandle::Device(_) | NativeHandle::Queue(_)
            )
        {
            return Err(ResourceError::InvalidHandle(handle));
        }
        let mut objects = lock(&self.shared.objects);
        match objects.get(&handle) {
            None => return Err(ResourceError::InvalidHandle(handle)),
            Some(DeviceObject::Image(entry)) if entry.swapchain.is_some() => {
                return Err(ResourceError::BackendError(format!(
                    "{handle:?} is owned by its swapchain"
                )));
            }
            _ => {}
        }
        match objects.remove(&handle) {
            Some(DeviceObject::Swapchain(entry)) => {
                for image in entry.images {
                    objects.remove(&NativeHandle::Image(image));
                }
            }
            Some(_) => {
                if let NativeHandle::CommandPool(pool) = handle {
                    objects.retain(|_, object| {
                        !matches!(object, DeviceObject::CommandBuffer(cb) if cb.pool == Some(pool))
                    });
                }
            }
            None => {}
        }
        drop(objects);

        let mut sync = lock(&self.shared.sync);
        match handle {
            NativeHandle::Fence(fence) => {
                sync.fences.remove(&fence);
            }
            NativeHandle::Semaphore(semaphore) => {
                sync.semaphores.remove(&semaphore);
            }
            NativeHandle::Event(event) => {
                sync.events.remove(&event);
            }
            _ => {}
        }
        log::trace!("Destroyed {handle:?}");
        Ok(())
    }
}

impl DeviceObject {
    pub(crate) fn as_buffer_mut(&mut self) -> Option<&mut BufferEntry> {
        match self {
            DeviceObject::Buffer(entry) => Some(entry),
            _ => None,
        }
    }

    pub(crate) fn as_image_mut(&mut self) -> Option<&mut ImageEntry> {
        match self {
            DeviceObject::Image(entry) => Some(entry),
            _ => None,
        }
    }
}
