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

//! # Strata Data
//!
//! The declarative side of the engine. A [`Graph`] is an arena of typed
//! [`Node`]s that reference each other either by ownership (an arena index,
//! which orders creation) or by name (resolved through the engine-wide
//! [`IdTable`], which may close cycles). Nothing in this crate talks to a
//! device: it describes what the compiler should build and how to persist it.

#![warn(missing_docs)]

pub mod graph;
pub mod id_table;
pub mod persistence;

pub use graph::{Graph, GraphError, GraphLayout, Node, NodeCategory, NodeKind, NodeRef, Ref};
pub use id_table::{IdTable, Instance};
