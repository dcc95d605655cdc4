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

use super::device::{lock, HeadlessDevice, WindowRegistry};
use crate::platform::window::{HeadlessWindow, HeadlessWindowBuilder};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use strata_core::platform::{StrataWindow, WindowDescriptor, WindowId};
use strata_core::renderer::api::DeviceId;
use strata_core::renderer::{DeviceDescriptor, GraphicsDevice, RenderBackend, RenderError};

/// A [`RenderBackend`] whose windows and devices need no GPU or display.
///
/// The backend keeps the concrete types of what it creates so tests can
/// resize windows and inspect devices after handing the trait objects to the
/// engine.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    windows: WindowRegistry,
    devices: Mutex<Vec<Arc<HeadlessDevice>>>,
    next_device: AtomicU64,
}

impl HeadlessBackend {
    /// Creates a backend with no windows and no devices.
    pub fn new() -> Self {
        Self::default()
    }

    /// The concrete window behind an id returned by `create_window`.
    pub fn window(&self, id: WindowId) -> Option<Arc<HeadlessWindow>> {
        lock(&self.windows).get(&id).cloned()
    }

    /// The most recently created device.
    pub fn device(&self) -> Option<Arc<HeadlessDevice>> {
        lock(&self.devices).last().cloned()
    }

    /// Every device created so far, oldest first.
    pub fn devices(&self) -> Vec<Arc<HeadlessDevice>> {
        lock(&self.devices).clone()
    }
}

impl RenderBackend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn create_window(
        &self,
        descriptor: &WindowDescriptor,
    ) -> Result<Arc<dyn StrataWindow>, RenderError> {
        let window = Arc::new(
            HeadlessWindowBuilder::new()
                .with_title(descriptor.title.clone())
                .with_dimensions(descriptor.extent.width, descriptor.extent.height)
                .build(),
        );
        lock(&self.windows).insert(window.id(), Arc::clone(&window));
        Ok(window)
    }

    fn create_device(
        &self,
        descriptor: &DeviceDescriptor,
    ) -> Result<Arc<dyn GraphicsDevice>, RenderError> {
        let id = DeviceId(self.next_device.fetch_add(1, Ordering::Relaxed) + 1);
        if descriptor.validation {
            log::debug!("Validation requested; the headless device always validates handles");
        }
        let device = Arc::new(HeadlessDevice::new(
            id,
            descriptor.label.clone(),
            Arc::clone(&self.windows),
        ));
        lock(&self.devices).push(Arc::clone(&device));
        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::headless::{DeviceEvent, RecordedCommand, TRANSFER_FAMILY};
    use std::time::Duration;
    use strata_core::math::{Extent2D, Extent3D, Origin3D};
    use strata_core::renderer::api::*;
    use strata_core::renderer::ResourceError;

    fn setup() -> (HeadlessBackend, Arc<HeadlessDevice>) {
        let backend = HeadlessBackend::new();
        backend
            .create_device(&DeviceDescriptor::default())
            .expect("device");
        let device = backend.device().expect("device is retained");
        (backend, device)
    }

    fn host_buffer(device: &HeadlessDevice, size: u64) -> BufferId {
        device
            .create_buffer(&BufferDescriptor {
                label: None,
                size,
                usage: BufferUsage::TRANSFER_SRC | BufferUsage::TRANSFER_DST,
                memory: MemoryLocation::HostVisible,
            })
            .expect("buffer")
    }

    fn graphics_queue(device: &HeadlessDevice) -> QueueId {
        device
            .get_queue(&QueueDescriptor {
                label: None,
                capabilities: QueueCapabilities::GRAPHICS,
                family: None,
            })
            .expect("queue")
    }

    fn record(
        device: &HeadlessDevice,
        queue: QueueId,
        f: impl FnOnce(&mut dyn strata_core::renderer::CommandRecorder),
    ) -> CommandBufferId {
        let pool = device
            .create_command_pool(&CommandPoolDescriptor {
                label: None,
                queue,
                transient: false,
                resettable: true,
            })
            .expect("pool");
        let cb = device
            .allocate_command_buffer(pool, CommandBufferLevel::Primary)
            .expect("command buffer");
        let mut recorder = device.begin_command_buffer(cb).expect("begin");
        f(recorder.as_mut());
        recorder.finish().expect("finish");
        cb
    }

    #[test]
    fn queues_are_placed_by_capability() {
        let (_backend, device) = setup();
        let transfer = device
            .get_queue(&QueueDescriptor {
                label: None,
                capabilities: QueueCapabilities::TRANSFER,
                family: None,
            })
            .expect("transfer queue");
        let graphics = graphics_queue(&device);
        assert_eq!(device.queue_family_index(transfer), Ok(TRANSFER_FAMILY));
        assert_eq!(device.queue_family_index(graphics), Ok(0));

        let refused = device.get_queue(&QueueDescriptor {
            label: None,
            capabilities: QueueCapabilities::GRAPHICS,
            family: Some(TRANSFER_FAMILY),
        });
        assert!(matches!(refused, Err(ResourceError::CreationFailed { .. })));
    }

    #[test]
    fn copies_execute_and_signal_the_fence() {
        let (_backend, device) = setup();
        let queue = graphics_queue(&device);
        let src = host_buffer(&device, 8);
        let dst = host_buffer(&device, 8);
        device.write_buffer(src, 0, &[1, 2, 3, 4]).expect("write");
        let cb = record(&device, queue, |r| {
            r.copy_buffer(
                src,
                dst,
                &[BufferCopy {
                    src_offset: 0,
                    dst_offset: 4,
                    size: 4,
                }],
            )
        });
        let fence = device.create_fence(false).expect("fence");

        device
            .queue_submit(
                queue,
                &[SubmitInfo {
                    command_buffers: vec![cb],
                    ..Default::default()
                }],
                Some(fence),
            )
            .expect("submit");
        device
            .wait_for_fences(&[fence], Some(Duration::from_secs(5)))
            .expect("fence signals");

        assert_eq!(device.buffer_contents(dst), Some(vec![0, 0, 0, 0, 1, 2, 3, 4]));
        let events: Vec<_> = device.journal().into_iter().map(|e| e.event).collect();
        assert_eq!(events.last(), Some(&DeviceEvent::FenceSignaled(fence)));
        assert_eq!(
            device.recorded_commands(cb),
            vec![RecordedCommand::CopyBuffer {
                src,
                dst,
                regions: vec![BufferCopy {
                    src_offset: 0,
                    dst_offset: 4,
                    size: 4
                }],
            }]
        );
    }

    #[test]
    fn unsignaled_fences_time_out() {
        let (_backend, device) = setup();
        let fence = device.create_fence(false).expect("fence");
        let result = device.wait_for_fences(&[fence], Some(Duration::from_millis(10)));
        assert!(matches!(result, Err(RenderError::Timeout(_))));
        assert_eq!(device.fence_status(fence).ok(), Some(false));
    }

    #[test]
    fn writes_are_bounds_checked() {
        let (_backend, device) = setup();
        let buffer = host_buffer(&device, 4);
        let err = device.write_buffer(buffer, 2, &[0; 4]).unwrap_err();
        assert_eq!(
            err,
            ResourceError::OutOfBounds {
                handle: NativeHandle::Buffer(buffer),
                end: 6,
                size: 4
            }
        );
    }

    #[test]
    fn swapchains_go_out_of_date_when_the_window_changes() {
        let (backend, device) = setup();
        let window = backend
            .create_window(&WindowDescriptor {
                title: "probe".into(),
                extent: Extent2D::new(64, 32),
            })
            .expect("window");
        let swapchain = device
            .create_swapchain(&SwapchainDescriptor {
                label: None,
                window: window.id(),
                format: Format::Bgra8Srgb,
                min_image_count: 2,
                present_mode: PresentMode::Fifo,
            })
            .expect("swapchain");
        assert_eq!(device.swapchain_images(swapchain).map(|i| i.len()), Ok(2));

        let acquired = device.acquire_next_image(swapchain, None, None).expect("acquire");
        assert_eq!(
            acquired,
            AcquireResult::Acquired {
                image_index: 0,
                suboptimal: false
            }
        );

        backend.window(window.id()).expect("window").resize(128, 64);
        let stale = device.acquire_next_image(swapchain, None, None).expect("acquire");
        assert_eq!(stale, AcquireResult::OutOfDate);

        let old_images = device.swapchain_images(swapchain).expect("images");
        device.recreate_swapchain(swapchain).expect("recreate");
        assert_eq!(device.swapchain_extent(swapchain), Ok(Extent2D::new(128, 64)));
        assert_eq!(device.swapchain_recreations(swapchain), 1);
        assert!(old_images
            .iter()
            .all(|i| !device.is_alive(NativeHandle::Image(*i))));
    }

    #[test]
    fn injected_faults_fail_once() {
        let (_backend, device) = setup();
        device.fail_next(ObjectKind::Sampler, 1);
        assert!(matches!(
            device.create_sampler(&SamplerDescriptor::default()),
            Err(ResourceError::CreationFailed {
                kind: ObjectKind::Sampler,
                ..
            })
        ));
        assert!(device.create_sampler(&SamplerDescriptor::default()).is_ok());

        device.fail_buffers_labelled("doomed");
        let err = device.create_buffer(&BufferDescriptor {
            label: Some("doomed".into()),
            size: 4,
            usage: BufferUsage::UNIFORM,
            memory: MemoryLocation::HostVisible,
        });
        assert!(err.is_err());
    }

    #[test]
    fn destroying_a_pool_frees_its_command_buffers() {
        let (_backend, device) = setup();
        let queue = graphics_queue(&device);
        let pool = device
            .create_command_pool(&CommandPoolDescriptor {
                label: None,
                queue,
                transient: false,
                resettable: true,
            })
            .expect("pool");
        let cb = device
            .allocate_command_buffer(pool, CommandBufferLevel::Primary)
            .expect("command buffer");

        device.destroy(NativeHandle::CommandPool(pool)).expect("destroy");
        assert!(!device.is_alive(NativeHandle::CommandBuffer(cb)));
        assert_eq!(device.live_objects(), 0);
        assert!(device.destroy(NativeHandle::CommandPool(pool)).is_err());
    }

    #[test]
    fn image_copies_land_per_layer() {
        let (_backend, device) = setup();
        let queue = graphics_queue(&device);
        let staging = host_buffer(&device, 32);
        device.write_buffer(staging, 0, &[7; 32]).expect("write");
        let image = device
            .create_image(&ImageDescriptor {
                label: None,
                dimension: ImageDimension::D2,
                format: Format::Rgba8Unorm,
                extent: Extent3D::new(2, 2, 1),
                mip_levels: 1,
                array_layers: 2,
                samples: 1,
                usage: ImageUsage::TRANSFER_DST | ImageUsage::SAMPLED,
            })
            .expect("image");
        let cb = record(&device, queue, |r| {
            r.copy_buffer_to_image(
                staging,
                image,
                ImageLayout::TransferDst,
                &[BufferImageCopy {
                    buffer_offset: 0,
                    subresource: ImageSubresourceLayers {
                        aspect: ImageAspect::Color,
                        mip_level: 0,
                        base_array_layer: 0,
                        layer_count: 2,
                    },
                    image_offset: Origin3D::default(),
                    image_extent: Extent3D::new(2, 2, 1),
                }],
            )
        });
        let fence = device.create_fence(false).expect("fence");
        device
            .queue_submit(
                queue,
                &[SubmitInfo {
                    command_buffers: vec![cb],
                    ..Default::default()
                }],
                Some(fence),
            )
            .expect("submit");
        device.wait_idle().expect("idle");

        assert_eq!(device.image_subresource(image, 0, 1), Some(vec![7; 16]));
        assert_eq!(device.image_subresource(image, 1, 0), None);
    }
}
