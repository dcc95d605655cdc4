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

//! The headless backend.
//!
//! Objects live in host memory. Each queue owns an executor thread that waits
//! on semaphores, performs the copies and layout transitions recorded into the
//! submitted command buffers, then signals semaphores and the fence, in
//! submission order. Presentation is simulated against the window size: a
//! swapchain goes out of date as soon as its window is resized or minimized.
//!
//! Everything the device does is observable: buffer and image contents,
//! recorded command streams, descriptor writes, and a sequenced journal of
//! submissions, fence signals, acquisitions and presents. Fault injection
//! makes creation of a chosen kind, a labelled buffer, or a submission fail.

mod backend;
mod command;
mod device;
mod executor;

pub use backend::HeadlessBackend;
pub use command::RecordedCommand;
pub use device::{DeviceEvent, HeadlessDevice, LoggedEvent, TRANSFER_FAMILY, UNIVERSAL_FAMILY};
