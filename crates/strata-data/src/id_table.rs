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

//! The engine-wide id table and the instances it publishes.

use std::collections::HashMap;
use strata_core::renderer::api::NativeHandle;

/// The object(s) built for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instance {
    /// One object.
    Single(NativeHandle),
    /// One object per swapchain image, in image order.
    PerFrame(Vec<NativeHandle>),
}

impl Instance {
    /// The object to use for image `index`.
    ///
    /// A single instance serves every index; a per-frame instance returns
    /// `None` past its end.
    pub fn at(&self, index: usize) -> Option<NativeHandle> {
        match self {
            Instance::Single(handle) => Some(*handle),
            Instance::PerFrame(handles) => handles.get(index).copied(),
        }
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        match self {
            Instance::Single(_) => 1,
            Instance::PerFrame(handles) => handles.len(),
        }
    }

    /// Returns `true` for a per-frame instance with no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` for per-frame instances.
    pub fn is_per_frame(&self) -> bool {
        matches!(self, Instance::PerFrame(_))
    }

    /// Every object, in order.
    pub fn handles(&self) -> &[NativeHandle] {
        match self {
            Instance::Single(handle) => std::slice::from_ref(handle),
            Instance::PerFrame(handles) => handles,
        }
    }
}

/// Maps ids to instances. Setting an existing id overwrites it.
#[derive(Debug, Default)]
pub struct IdTable {
    entries: HashMap<String, Instance>,
}

impl IdTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an id.
    ///
    /// A missing id is logged as a warning and yields `None`; the caller
    /// decides whether that is fatal.
    pub fn find(&self, id: &str) -> Option<&Instance> {
        let found = self.entries.get(id);
        if found.is_none() {
            log::warn!("Id '{id}' is not registered");
        }
        found
    }

    /// Returns `true` if `id` is registered, without logging.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Registers `instance` under `id`, returning the instance it replaced.
    pub fn set(&mut self, id: impl Into<String>, instance: Instance) -> Option<Instance> {
        let id = id.into();
        log::trace!("Registering id '{id}'");
        self.entries.insert(id, instance)
    }

    /// Unregisters an id.
    pub fn remove(&mut self, id: &str) -> Option<Instance> {
        self.entries.remove(id)
    }

    /// Registered ids, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of registered ids.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::renderer::api::{BufferId, FenceId};

    use std::sync::Mutex;

    /// Keeps every warning logged by this test binary.
    struct WarningLog(Mutex<Vec<String>>);

    impl log::Log for WarningLog {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() <= log::Level::Warn
        }

        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.0
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    static WARNINGS: WarningLog = WarningLog(Mutex::new(Vec::new()));

    fn warnings() -> Vec<String> {
        // Only the first test to get here installs the logger.
        if log::set_logger(&WARNINGS).is_ok() {
            log::set_max_level(log::LevelFilter::Warn);
        }
        WARNINGS.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    #[test]
    fn missing_ids_yield_none_and_a_warning() {
        warnings();
        let table = IdTable::new();
        assert!(table.find("never-registered").is_none());
        assert!(warnings().iter().any(|w| w.contains("'never-registered'")));

        // `contains` is the silent check.
        assert!(!table.contains("never-checked-loudly"));
        assert!(!warnings().iter().any(|w| w.contains("never-checked-loudly")));
    }

    #[test]
    fn set_is_an_upsert() {
        let mut table = IdTable::new();
        let first = Instance::Single(NativeHandle::Fence(FenceId(1)));
        let second = Instance::Single(NativeHandle::Fence(FenceId(2)));

        assert_eq!(table.set("fence", first.clone()), None);
        assert_eq!(table.set("fence", second.clone()), Some(first));
        assert_eq!(table.find("fence"), Some(&second));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn single_instances_serve_every_index() {
        let single = Instance::Single(NativeHandle::Buffer(BufferId(4)));
        assert_eq!(single.at(0), single.at(7));

        let per_frame = Instance::PerFrame(
            (0..3).map(|i| NativeHandle::Buffer(BufferId(i))).collect(),
        );
        assert_eq!(per_frame.len(), 3);
        assert_eq!(per_frame.at(2), Some(NativeHandle::Buffer(BufferId(2))));
        assert_eq!(per_frame.at(3), None);
    }
}
