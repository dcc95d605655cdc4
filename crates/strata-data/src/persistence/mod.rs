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

//! Graph persistence.
//!
//! A persisted graph is a [`GraphFile`]: the fixed header names the codec
//! that produced the payload, and [`load`] dispatches on it. Two codecs ship
//! with the engine: [`BinaryCodec`] for fast loading and [`RonCodec`] for
//! files meant to be read and edited by hand.

mod binary;
mod text;

pub use binary::BinaryCodec;
pub use text::RonCodec;

use crate::graph::Graph;
use std::fmt;
use std::path::Path;
use strata_core::persistence::GraphFile;

/// An error that can occur while encoding a graph.
#[derive(Debug)]
pub enum SerializationError {
    /// The codec failed to encode the graph.
    ProcessingFailed(String),
    /// Writing the file failed.
    Io(std::io::Error),
}

/// An error that can occur while decoding a graph.
#[derive(Debug)]
pub enum DeserializationError {
    /// The header is missing or malformed.
    InvalidHeader(&'static str),
    /// No codec is registered for the strategy named by the header.
    UnknownStrategy(String),
    /// The payload does not match the codec's format.
    InvalidFormat(String),
    /// Reading the file failed.
    Io(std::io::Error),
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationError::ProcessingFailed(msg) => write!(f, "Serialization failed: {msg}"),
            SerializationError::Io(e) => write!(f, "Serialization failed: {e}"),
        }
    }
}

impl fmt::Display for DeserializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeserializationError::InvalidHeader(msg) => {
                write!(f, "Deserialization failed: invalid header - {msg}")
            }
            DeserializationError::UnknownStrategy(id) => {
                write!(f, "Deserialization failed: unknown strategy '{id}'")
            }
            DeserializationError::InvalidFormat(msg) => {
                write!(f, "Deserialization failed: invalid format - {msg}")
            }
            DeserializationError::Io(e) => write!(f, "Deserialization failed: {e}"),
        }
    }
}

impl std::error::Error for SerializationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SerializationError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for DeserializationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeserializationError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Converts a graph to and from a payload.
pub trait GraphCodec: Send + Sync {
    /// The versioned identifier written to the file header, e.g. `"STRATA_BIN_V1"`.
    fn strategy_id(&self) -> &'static str;

    /// Encodes a graph into a payload.
    fn encode(&self, graph: &Graph) -> Result<Vec<u8>, SerializationError>;

    /// Decodes a payload produced by [`encode`](GraphCodec::encode).
    fn decode(&self, payload: &[u8]) -> Result<Graph, DeserializationError>;
}

/// Encodes `graph` with `codec` and wraps it in a file header.
pub fn save(graph: &Graph, codec: &dyn GraphCodec) -> Result<Vec<u8>, SerializationError> {
    let payload = codec.encode(graph)?;
    log::debug!(
        "Encoded graph of {} nodes with {} ({} bytes)",
        graph.len(),
        codec.strategy_id(),
        payload.len()
    );
    Ok(GraphFile::new(codec.strategy_id(), payload).to_bytes())
}

/// Decodes a graph file, choosing the codec named by its header.
pub fn load(bytes: &[u8]) -> Result<Graph, DeserializationError> {
    let file = GraphFile::from_bytes(bytes).map_err(DeserializationError::InvalidHeader)?;
    let codecs: [&dyn GraphCodec; 2] = [&BinaryCodec, &RonCodec];
    let strategy = file.header.strategy();
    let codec = codecs
        .into_iter()
        .find(|c| c.strategy_id() == strategy)
        .ok_or_else(|| DeserializationError::UnknownStrategy(strategy.to_string()))?;
    codec.decode(&file.payload)
}

/// [`save`]s a graph to a file.
pub fn save_to_path(
    graph: &Graph,
    codec: &dyn GraphCodec,
    path: impl AsRef<Path>,
) -> Result<(), SerializationError> {
    let bytes = save(graph, codec)?;
    std::fs::write(path, bytes).map_err(SerializationError::Io)
}

/// [`load`]s a graph from a file.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Graph, DeserializationError> {
    let bytes = std::fs::read(path).map_err(DeserializationError::Io)?;
    load(&bytes)
}
