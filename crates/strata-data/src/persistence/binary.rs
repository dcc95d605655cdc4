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

/// Compact binary encoding built on `bincode`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinaryCodec;

impl GraphCodec for BinaryCodec {
    fn strategy_id(&self) -> &'static str {
        "STRATA_BIN_V1"
    }

    fn encode(&self, graph: &Graph) -> Result<Vec<u8>, SerializationError> {
        bincode::serde::encode_to_vec(graph, bincode::config::standard())
            .map_err(|e| SerializationError::ProcessingFailed(e.to_string()))
    }

    fn decode(&self, payload: &[u8]) -> Result<Graph, DeserializationError> {
        let (graph, read) =
            bincode::serde::decode_from_slice::<Graph, _>(payload, bincode::config::standard())
                .map_err(|e| DeserializationError::InvalidFormat(e.to_string()))?;
        if read != payload.len() {
            return Err(DeserializationError::InvalidFormat(format!(
                "{} trailing bytes after the graph",
                payload.len() - read
            )));
        }
        Ok(graph)
    }
}
