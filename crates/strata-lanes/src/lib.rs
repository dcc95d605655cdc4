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

//! # Strata Lanes
//!
//! The hot paths of the engine, written against the abstract device
//! boundary only:
//!
//! - [`upload_lane`] streams bulk data into buffers and images through a
//!   bounded pool of transfer contexts driven by worker threads.
//! - [`command_lane`] records declarative command trees into command buffers
//!   and re-records only the slots that were invalidated.

#![warn(missing_docs)]

pub mod command_lane;
pub mod upload_lane;

pub use command_lane::{Bindings, CommandContext, RecordError};
pub use upload_lane::{UploadEngine, UploadError, UploadHandle, UploadReceipt, UploadTask};
