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

use super::{DeserializationError, GraphCodec, SerializationError};
use crate::graph::Graph;

/// Human-readable encoding built on RON.
#[derive(Debug, Default, Clone, Copy)]
pub struct RonCodec;

impl GraphCodec for RonCodec {
    fn strategy_id(&self) -> &'static str {
        "STRATA_RON_V1"
    }

    fn encode(&self, graph: &Graph) -> Result<Vec<u8>, SerializationError> {
        let pretty_config = ron::ser::PrettyConfig::default().indentor("  ".to_string());
        ron::ser::to_string_pretty(graph, pretty_config)
            .map(String::into_bytes)
            .map_err(|e| SerializationError::ProcessingFailed(e.to_string()))
    }

    fn decode(&self, payload: &[u8]) -> Result<Graph, DeserializationError> {
        ron::de::from_bytes(payload).map_err(|e| DeserializationError::InvalidFormat(e.to_string()))
    }
}
