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

//! Query pools.

use serde::{Deserialize, Serialize};

/// The kind of query a pool holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum QueryType {
    #[default]
    Timestamp,
    Occlusion,
}

/// Parameters for creating a query pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPoolDescriptor {
    /// Optional debug label.
    pub label: Option<String>,
    /// Query kind.
    pub ty: QueryType,
    /// Number of queries.
    pub count: u32,
}
