// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Size- and count-bounded chunk building.
//!
//! The [`ChunkWriter`] buffers encoded messages as framed Message records and
//! emits a [`CompressedChunk`] whenever a bound is reached. Compression and
//! the CRC happen fully in memory, so a codec failure never reaches the
//! output file.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use super::compression::compress;
use super::constants::MESSAGE_RECORD_OVERHEAD;
use super::records::put_message;
use crate::core::{ConvertError, Result};
use crate::types::{ChunkConfig, CompressedChunk, Compression, MessageIndexEntry};

/// Compresses the uncompressed records of one chunk.
///
/// Arguments are the codec, the zstd level and the records. An `Err` message
/// becomes an [`ConvertError::EncodingFailure`] for the chunk.
pub type ChunkCodec = fn(Compression, i32, &[u8]) -> std::result::Result<Vec<u8>, String>;

/// Buffers messages and cuts them into compressed chunks.
#[derive(Debug)]
pub struct ChunkWriter {
    config: ChunkConfig,
    buffer: Vec<u8>,
    message_count: usize,
    start_time: u64,
    end_time: u64,
    indexes: BTreeMap<u16, Vec<MessageIndexEntry>>,
    /// Next Message record sequence number per channel
    sequences: HashMap<u16, u32>,
    next_chunk_sequence: u64,
    codec: ChunkCodec,
}

impl ChunkWriter {
    /// Create a chunk writer with the given bounds.
    pub fn new(config: ChunkConfig) -> Self {
        Self {
            config,
            buffer: Vec::new(),
            message_count: 0,
            start_time: u64::MAX,
            end_time: 0,
            indexes: BTreeMap::new(),
            sequences: HashMap::new(),
            next_chunk_sequence: 0,
            codec: compress,
        }
    }

    /// Use `codec` instead of the built-in compression.
    pub fn with_codec(mut self, codec: ChunkCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Chunk bounds in use.
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Messages currently buffered.
    pub fn buffered_messages(&self) -> usize {
        self.message_count
    }

    /// Uncompressed bytes currently buffered.
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Chunks emitted so far.
    pub fn chunks_emitted(&self) -> u64 {
        self.next_chunk_sequence
    }

    /// Append one encoded message.
    ///
    /// Returns the chunks completed by this call, in order: at most one
    /// flushed before the message because it would not fit, and one cut
    /// after it because a bound was reached. A message larger than
    /// `max_uncompressed_bytes` always ends up alone in its own chunk.
    pub fn append(
        &mut self,
        channel_id: u16,
        log_time: u64,
        data: &[u8],
    ) -> Result<Vec<CompressedChunk>> {
        let mut emitted = Vec::new();
        let message_size = MESSAGE_RECORD_OVERHEAD + data.len();

        if self.message_count > 0
            && self.buffer.len() + message_size > self.config.max_uncompressed_bytes
        {
            emitted.extend(self.flush()?);
        }

        let sequence = self.sequences.entry(channel_id).or_insert(0);
        let offset = self.buffer.len() as u64;
        put_message(&mut self.buffer, channel_id, *sequence, log_time, log_time, data);
        *sequence = sequence.wrapping_add(1);

        self.indexes
            .entry(channel_id)
            .or_default()
            .push(MessageIndexEntry { log_time, offset });
        self.message_count += 1;
        self.start_time = self.start_time.min(log_time);
        self.end_time = self.end_time.max(log_time);

        if self.message_count >= self.config.max_messages
            || self.buffer.len() >= self.config.max_uncompressed_bytes
        {
            emitted.extend(self.flush()?);
        }

        Ok(emitted)
    }

    /// Emit the buffered messages as a chunk, if there are any.
    ///
    /// The buffer is cleared before compressing: when the codec fails the
    /// buffered messages are dropped and the chunk sequence is not consumed.
    pub fn flush(&mut self) -> Result<Option<CompressedChunk>> {
        if self.message_count == 0 {
            return Ok(None);
        }

        let records = std::mem::take(&mut self.buffer);
        let indexes = std::mem::take(&mut self.indexes);
        let message_count = std::mem::replace(&mut self.message_count, 0);
        let start_time = std::mem::replace(&mut self.start_time, u64::MAX);
        let end_time = std::mem::replace(&mut self.end_time, 0);
        let sequence = self.next_chunk_sequence;

        let codec = self.config.compression;
        let compressed_data = (self.codec)(codec, self.config.zstd_level, &records)
            .map_err(|e| ConvertError::encoding_failure(sequence, codec.to_string(), e))?;
        let uncompressed_crc = crc32fast::hash(&records);
        self.next_chunk_sequence += 1;

        debug!(
            sequence,
            messages = message_count,
            uncompressed = records.len(),
            compressed = compressed_data.len(),
            codec = %codec,
            "Chunk emitted"
        );

        Ok(Some(CompressedChunk {
            sequence,
            compression: codec,
            compressed_data,
            uncompressed_size: records.len() as u64,
            uncompressed_crc,
            message_start_time: start_time,
            message_end_time: end_time,
            message_count,
            message_indexes: indexes,
        }))
    }
}
