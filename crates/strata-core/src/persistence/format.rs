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

//! Defines the container format for persisted render graphs.
//!
//! Every graph file is a fixed-size [`GraphHeader`] followed by a
//! variable-length payload. The header names the strategy used to encode the
//! payload, so a loader can dispatch to the matching decoder without guessing.

/// A unique byte sequence to identify Strata graph files. ("STRATAGR").
pub const HEADER_MAGIC_BYTES: [u8; 8] = *b"STRATAGR";
/// The current version of the header layout.
pub const FORMAT_VERSION: u8 = 1;
const STRATEGY_ID_LEN: usize = 32;

/// The fixed-size header at the beginning of every graph file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphHeader {
    /// Magic bytes to identify the file type, must be `HEADER_MAGIC_BYTES`.
    pub magic_bytes: [u8; 8],
    /// The version of the header format itself.
    pub format_version: u8,
    /// A null-padded UTF-8 string identifying the encoding strategy,
    /// e.g. "STRATA_BIN_V1" or "STRATA_RON_V1".
    pub strategy_id: [u8; STRATEGY_ID_LEN],
    /// The length of the payload that follows this header, in bytes.
    pub payload_length: u64,
}

/// A full graph file in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphFile {
    /// The parsed header.
    pub header: GraphHeader,
    /// The raw payload.
    pub payload: Vec<u8>,
}

// The header is a fixed byte layout, so it is written by hand rather than
// through serde.
impl GraphHeader {
    /// The total size of the header in bytes.
    pub const SIZE: usize = 8 + 1 + STRATEGY_ID_LEN + 8;

    /// Builds a header for a payload of `payload_length` bytes.
    ///
    /// Strategy ids longer than 32 bytes are truncated.
    pub fn new(strategy: &str, payload_length: u64) -> Self {
        let mut strategy_id = [0u8; STRATEGY_ID_LEN];
        let bytes = strategy.as_bytes();
        let len = bytes.len().min(STRATEGY_ID_LEN);
        strategy_id[..len].copy_from_slice(&bytes[..len]);
        Self {
            magic_bytes: HEADER_MAGIC_BYTES,
            format_version: FORMAT_VERSION,
            strategy_id,
            payload_length,
        }
    }

    /// The strategy id with its null padding stripped.
    pub fn strategy(&self) -> &str {
        let end = self
            .strategy_id
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(STRATEGY_ID_LEN);
        std::str::from_utf8(&self.strategy_id[..end]).unwrap_or("")
    }

    /// Serializes the header to its fixed layout.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..8].copy_from_slice(&self.magic_bytes);
        out[8] = self.format_version;
        out[9..9 + STRATEGY_ID_LEN].copy_from_slice(&self.strategy_id);
        out[9 + STRATEGY_ID_LEN..].copy_from_slice(&self.payload_length.to_le_bytes());
        out
    }

    /// Attempts to parse a `GraphHeader` from the beginning of a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, &'static str> {
        if bytes.len() < Self::SIZE {
            return Err("Not enough bytes to form a valid header");
        }

        let mut magic_bytes = [0u8; 8];
        magic_bytes.copy_from_slice(&bytes[0..8]);
        if magic_bytes != HEADER_MAGIC_BYTES {
            return Err("Invalid magic bytes; not a Strata graph file");
        }

        let format_version = bytes[8];
        if format_version > FORMAT_VERSION {
            return Err("Unsupported graph file version");
        }

        let mut strategy_id = [0u8; STRATEGY_ID_LEN];
        strategy_id.copy_from_slice(&bytes[9..9 + STRATEGY_ID_LEN]);

        let mut length = [0u8; 8];
        length.copy_from_slice(&bytes[9 + STRATEGY_ID_LEN..Self::SIZE]);

        Ok(Self {
            magic_bytes,
            format_version,
            strategy_id,
            payload_length: u64::from_le_bytes(length),
        })
    }
}

impl GraphFile {
    /// Wraps a payload with a header for `strategy`.
    pub fn new(strategy: &str, payload: Vec<u8>) -> Self {
        Self {
            header: GraphHeader::new(strategy, payload.len() as u64),
            payload,
        }
    }

    /// Serializes the header followed by the payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(GraphHeader::SIZE + self.payload.len());
        out.extend_from_slice(&self.header.to_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Parses a whole file, checking the payload length against the header.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, &'static str> {
        let header = GraphHeader::from_bytes(bytes)?;
        let payload = &bytes[GraphHeader::SIZE..];
        if payload.len() as u64 != header.payload_length {
            return Err("Payload length does not match the header");
        }
        Ok(Self {
            header,
            payload: payload.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_survives_its_byte_layout() {
        let header = GraphHeader::new("STRATA_BIN_V1", 1234);
        let parsed = GraphHeader::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.strategy(), "STRATA_BIN_V1");
        assert_eq!(parsed.payload_length, 1234);
    }

    #[test]
    fn rejects_foreign_magic() {
        let mut bytes = GraphHeader::new("STRATA_BIN_V1", 0).to_bytes();
        bytes[0] = b'X';
        assert!(GraphHeader::from_bytes(&bytes).is_err());
    }

    #[test]
    fn rejects_short_input() {
        assert!(GraphHeader::from_bytes(&HEADER_MAGIC_BYTES).is_err());
    }

    #[test]
    fn file_checks_payload_length() {
        let file = GraphFile::new("STRATA_RON_V1", b"()".to_vec());
        let mut bytes = file.to_bytes();
        assert_eq!(GraphFile::from_bytes(&bytes).unwrap(), file);
        bytes.push(0);
        assert!(GraphFile::from_bytes(&bytes).is_err());
    }

    #[test]
    fn long_strategy_ids_are_truncated() {
        let long = "S".repeat(40);
        let header = GraphHeader::new(&long, 0);
        assert_eq!(header.strategy().len(), 32);
    }
}
