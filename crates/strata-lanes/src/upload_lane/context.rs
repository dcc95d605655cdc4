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

//! Transfer contexts and the bounded pool that hands them out.

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use strata_core::renderer::api::{
    CommandBufferId, CommandBufferLevel, CommandPoolDescriptor, CommandPoolId, FenceId,
    NativeHandle, QueueId,
};
use strata_core::renderer::{GraphicsDevice, ResourceError};

/// Everything one upload needs to record and submit its copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferContext {
    /// The queue uploads are submitted to.
    pub queue: QueueId,
    /// The family of `queue`.
    pub queue_family: u32,
    /// The pool `command_buffer` was allocated from.
    pub pool: CommandPoolId,
    /// Re-recorded by every upload using this context.
    pub command_buffer: CommandBufferId,
    /// Signaled when the last submission of this context completes.
    pub fence: FenceId,
}

impl TransferContext {
    fn create(
        device: &dyn GraphicsDevice,
        queue: QueueId,
        queue_family: u32,
        index: usize,
    ) -> Result<Self, ResourceError> {
        let pool = device.create_command_pool(&CommandPoolDescriptor {
            label: Some(format!("upload-context-{index}")),
            queue,
            transient: true,
            resettable: true,
        })?;
        let command_buffer = match device.allocate_command_buffer(pool, CommandBufferLevel::Primary)
        {
            Ok(cb) => cb,
            Err(e) => {
                let _ = device.destroy(NativeHandle::CommandPool(pool));
                return Err(e);
            }
        };
        let fence = match device.create_fence(true) {
            Ok(fence) => fence,
            Err(e) => {
                let _ = device.destroy(NativeHandle::CommandPool(pool));
                return Err(e);
            }
        };
        Ok(Self {
            queue,
            queue_family,
            pool,
            command_buffer,
            fence,
        })
    }

    fn destroy(self, device: &dyn GraphicsDevice) {
        for handle in [
            NativeHandle::Fence(self.fence),
            NativeHandle::CommandPool(self.pool),
        ] {
            if let Err(e) = device.destroy(handle) {
                log::warn!("Failed to destroy upload context object {handle:?}: {e}");
            }
        }
    }
}

/// A fixed set of [`TransferContext`]s guarded by a mutex and a condition variable.
///
/// The pool is the only structure of the upload lane mutated from several
/// threads. Its capacity never changes after creation, which caps how many
/// uploads can be recording or executing at once.
#[derive(Debug)]
pub struct ContextPool {
    free: Mutex<Vec<TransferContext>>,
    available: Condvar,
    capacity: usize,
    in_use: AtomicUsize,
    peak_in_use: AtomicUsize,
    retired: AtomicUsize,
}

impl ContextPool {
    /// Creates `count` contexts on `queue`.
    ///
    /// On failure every context created so far is destroyed again.
    pub fn create(
        device: &dyn GraphicsDevice,
        queue: QueueId,
        count: usize,
    ) -> Result<Self, ResourceError> {
        let queue_family = device.queue_family_index(queue)?;
        let mut contexts = Vec::with_capacity(count);
        for index in 0..count {
            match TransferContext::create(device, queue, queue_family, index) {
                Ok(context) => contexts.push(context),
                Err(e) => {
                    for context in contexts {
                        context.destroy(device);
                    }
                    return Err(e);
                }
            }
        }
        log::debug!("Created {count} upload contexts on queue family {queue_family}");
        Ok(Self {
            free: Mutex::new(contexts),
            available: Condvar::new(),
            capacity: count,
            in_use: AtomicUsize::new(0),
            peak_in_use: AtomicUsize::new(0),
            retired: AtomicUsize::new(0),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TransferContext>> {
        self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes a context, blocking until one is free.
    pub fn acquire(self: &Arc<Self>) -> ContextGuard {
        let mut free = self.lock();
        loop {
            if let Some(context) = free.pop() {
                drop(free);
                return self.hand_out(context);
            }
            free = self
                .available
                .wait(free)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Takes a context if one is free right now.
    pub fn try_acquire(self: &Arc<Self>) -> Option<ContextGuard> {
        let context = self.lock().pop()?;
        Some(self.hand_out(context))
    }

    fn hand_out(self: &Arc<Self>, context: TransferContext) -> ContextGuard {
        let in_use = self.in_use.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_use.fetch_max(in_use, Ordering::SeqCst);
        ContextGuard {
            pool: Arc::clone(self),
            context: Some(context),
        }
    }

    fn release(&self, context: TransferContext) {
        self.in_use.fetch_sub(1, Ordering::SeqCst);
        self.lock().push(context);
        self.available.notify_one();
    }

    fn retire(&self, context: &TransferContext) {
        self.in_use.fetch_sub(1, Ordering::SeqCst);
        self.retired.fetch_add(1, Ordering::SeqCst);
        log::error!(
            "Upload context {:?} retired: its fence was never observed signaled",
            context.fence
        );
    }

    /// Number of contexts, free or not.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of contexts free right now.
    pub fn available(&self) -> usize {
        self.lock().len()
    }

    /// The largest number of contexts that were ever held at the same time.
    pub fn peak_in_use(&self) -> usize {
        self.peak_in_use.load(Ordering::SeqCst)
    }

    /// Contexts taken out of service because their last submission never
    /// completed. They are neither reused nor destroyed.
    pub fn retired(&self) -> usize {
        self.retired.load(Ordering::SeqCst)
    }

    /// Destroys every free context. Returns how many were still held.
    pub fn destroy(&self, device: &dyn GraphicsDevice) -> usize {
        let contexts: Vec<TransferContext> = self.lock().drain(..).collect();
        for context in contexts {
            context.destroy(device);
        }
        self.in_use.load(Ordering::SeqCst)
    }
}

/// Exclusive use of one [`TransferContext`], returned to its pool on drop.
#[derive(Debug)]
pub struct ContextGuard {
    pool: Arc<ContextPool>,
    context: Option<TransferContext>,
}

impl Deref for ContextGuard {
    type Target = TransferContext;

    fn deref(&self) -> &TransferContext {
        // Only `drop` takes the context out.
        match &self.context {
            Some(context) => context,
            None => unreachable!("context guard used after release"),
        }
    }
}

impl ContextGuard {
    /// Keeps the context out of the pool for good.
    ///
    /// Only for a context whose submission may still be executing: handing
    /// it out again would reset a command buffer and a fence the device
    /// still uses.
    pub fn retire(mut self) {
        if let Some(context) = self.context.take() {
            self.pool.retire(&context);
        }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            self.pool.release(context);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use strata_core::renderer::api::{QueueCapabilities, QueueDescriptor};
    use strata_core::renderer::{DeviceDescriptor, RenderBackend};
    use strata_infra::HeadlessBackend;

    fn pool(count: usize) -> (Arc<dyn GraphicsDevice>, Arc<ContextPool>) {
        let backend = HeadlessBackend::new();
        let device = backend
            .create_device(&DeviceDescriptor::default())
            .expect("device");
        let queue = device
            .get_queue(&QueueDescriptor {
                label: None,
                capabilities: QueueCapabilities::TRANSFER,
                family: None,
            })
            .expect("queue");
        let pool = ContextPool::create(device.as_ref(), queue, count).expect("pool");
        (device, Arc::new(pool))
    }

    #[test]
    fn guards_return_their_context() {
        let (_device, pool) = pool(2);
        let a = pool.acquire();
        let b = pool.try_acquire().expect("second context");
        assert_ne!(a.fence, b.fence);
        assert!(pool.try_acquire().is_none());
        drop(a);
        assert_eq!(pool.available(), 1);
        drop(b);
        assert_eq!(pool.available(), 2);
        assert_eq!(pool.peak_in_use(), 2);
    }

    #[test]
    fn acquire_blocks_until_a_release() {
        let (_device, pool) = pool(1);
        let held = pool.acquire();
        let waiter = {
            let pool = Arc::clone(&pool);
            std::thread::spawn(move || pool.acquire().fence)
        };
        std::thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());
        let fence = held.fence;
        drop(held);
        assert_eq!(waiter.join().expect("waiter"), fence);
        assert_eq!(pool.peak_in_use(), 1);
    }

    #[test]
    fn retired_contexts_never_come_back() {
        let (_device, pool) = pool(2);
        let held = pool.acquire();
        let fence = held.fence;
        held.retire();
        assert_eq!(pool.retired(), 1);
        let other = pool.acquire();
        assert_ne!(other.fence, fence);
        assert!(pool.try_acquire().is_none());
    }

    #[test]
    fn destroy_reports_held_contexts() {
        let (device, pool) = pool(2);
        let held = pool.acquire();
        assert_eq!(pool.destroy(device.as_ref()), 1);
        drop(held);
    }
}
