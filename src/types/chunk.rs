// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Chunk data structures.
//!
//! A [`CompressedChunk`] is produced by the chunk writer and consumed by the
//! container assembler, which turns it into a Chunk record plus one
//! MessageIndex record per channel.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::ConvertError;

/// Chunk compression codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Store records uncompressed
    None,
    /// LZ4 frame format (fast)
    Lz4,
    /// Zstandard (high ratio)
    #[default]
    Zstd,
}

impl Compression {
    /// Name written into Chunk and ChunkIndex records.
    ///
    /// Uncompressed chunks use the empty string.
    pub const fn mcap_name(self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Lz4 => "lz4",
            Compression::Zstd => "zstd",
        }
    }

    /// Parse the name found in a Chunk record.
    pub fn from_mcap_name(name: &str) -> Option<Self> {
        match name {
            "" => Some(Compression::None),
            "lz4" => Some(Compression::Lz4),
            "zstd" => Some(Compression::Zstd),
            _ => None,
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => f.write_str("none"),
            other => f.write_str(other.mcap_name()),
        }
    }
}

impl FromStr for Compression {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Compression::None),
            "lz4" | "fast" => Ok(Compression::Lz4),
            "zstd" | "high-ratio" => Ok(Compression::Zstd),
            other => Err(ConvertError::parse(
                "Compression",
                format!("unknown codec '{other}', expected none, lz4 (fast) or zstd (high-ratio)"),
            )),
        }
    }
}

/// Index entry for a single message in an MCAP chunk.
///
/// Used to build MessageIndex records that enable efficient random access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageIndexEntry {
    /// Message log time (nanoseconds)
    pub log_time: u64,
    /// Offset within the uncompressed chunk data
    pub offset: u64,
}

/// A compressed chunk ready for writing.
#[derive(Debug, Clone)]
pub struct CompressedChunk {
    /// Chunk sequence number within the run
    pub sequence: u64,
    /// Codec used for `compressed_data`
    pub compression: Compression,
    /// Compressed Message records
    pub compressed_data: Vec<u8>,
    /// Size of the Message records before compression
    pub uncompressed_size: u64,
    /// CRC32 of the uncompressed records
    pub uncompressed_crc: u32,
    /// Earliest log time in the chunk
    pub message_start_time: u64,
    /// Latest log time in the chunk
    pub message_end_time: u64,
    /// Number of messages in the chunk
    pub message_count: usize,
    /// Per-channel index entries, sorted by channel id
    pub message_indexes: BTreeMap<u16, Vec<MessageIndexEntry>>,
}

impl CompressedChunk {
    /// Calculate the compression ratio (compressed / uncompressed).
    pub fn compression_ratio(&self) -> f64 {
        if self.uncompressed_size > 0 {
            self.compressed_data.len() as f64 / self.uncompressed_size as f64
        } else {
            1.0
        }
    }

    /// Get the compressed size in bytes.
    pub fn compressed_size(&self) -> usize {
        self.compressed_data.len()
    }
}

/// Bounds for chunk building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    /// Maximum uncompressed size of a chunk in bytes
    pub max_uncompressed_bytes: usize,
    /// Maximum messages per chunk
    pub max_messages: usize,
    /// Codec applied to each chunk
    pub compression: Compression,
    /// Zstandard compression level
    pub zstd_level: i32,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_uncompressed_bytes: 4 * 1024 * 1024,
            max_messages: 100_000,
            compression: Compression::Zstd,
            zstd_level: 3,
        }
    }
}

impl ChunkConfig {
    /// Config favoring small chunks for fine-grained seeking.
    pub fn low_latency() -> Self {
        Self {
            max_uncompressed_bytes: 1024 * 1024,
            max_messages: 10_000,
            compression: Compression::Lz4,
            ..Self::default()
        }
    }
}
