// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! MCAP container assembler.
//!
//! The assembler owns the output stream and the file-level structure. It
//! accepts schema, channel, chunk and metadata records in one streaming pass
//! and writes the summary section, summary offsets and footer on
//! [`ContainerAssembler::finish`].
//!
//! # State machine
//!
//! ```text
//! Opened --(first write)--> Writing --finish()--> Finalizing --> Closed
//! ```
//!
//! Magic and Header are written on the first transition. Any write after
//! `Closed` fails with [`ConvertError::InvalidState`].
//!
//! # Checksums
//!
//! The DataEnd record carries a CRC32 of every byte from the start of the
//! file up to the DataEnd record. The Footer carries a CRC32 of every byte
//! from the start of the summary section through the footer's
//! `summary_offset_start` field.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{debug, info};

use super::constants::{
    MCAP_MAGIC, OP_CHANNEL, OP_CHUNK_INDEX, OP_METADATA_INDEX, OP_SCHEMA, OP_STATISTICS, PROFILE,
};
use super::index::ContainerIndex;
use super::records::{
    data_end, ChannelRecord, ChunkHeader, ChunkIndexRecord, Footer, HeaderRecord,
    MessageIndexRecord, MetadataIndexRecord, MetadataRecord, SchemaRecord, SummaryOffsetRecord,
};
use crate::core::{ChannelEntry, ConvertError, Result, SchemaEntry};
use crate::types::CompressedChunk;

/// Default output buffer capacity.
const DEFAULT_BUFFER_CAPACITY: usize = 1024 * 1024;

/// Library string written into the Header record.
pub fn library_name() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Lifecycle of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    /// Stream acquired, nothing written yet
    Opened,
    /// Header written, data records accepted
    Writing,
    /// Summary and footer being written
    Finalizing,
    /// Stream flushed and released
    Closed,
}

impl fmt::Display for AssemblerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AssemblerState::Opened => "opened",
            AssemblerState::Writing => "writing",
            AssemblerState::Finalizing => "finalizing",
            AssemblerState::Closed => "closed",
        })
    }
}

/// Streaming MCAP writer driven by the conversion engine.
pub struct ContainerAssembler<W: Write> {
    writer: Option<W>,
    state: AssemblerState,
    /// Current write position (tracked manually since BufWriter doesn't expose stream_position)
    position: u64,
    /// Running CRC of the section currently being written
    crc: crc32fast::Hasher,
    header: HeaderRecord,
    index: ContainerIndex,
}

impl ContainerAssembler<BufWriter<File>> {
    /// Create the output file and an assembler writing to it.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| ConvertError::Io {
            message: format!("failed to create {}: {e}", path.display()),
        })?;
        Ok(Self::new(BufWriter::with_capacity(
            DEFAULT_BUFFER_CAPACITY,
            file,
        )))
    }
}

impl<W: Write> ContainerAssembler<W> {
    /// Create an assembler with the default header.
    pub fn new(writer: W) -> Self {
        Self::with_header(writer, PROFILE, &library_name())
    }

    /// Create an assembler with a custom header profile and library.
    pub fn with_header(writer: W, profile: &str, library: &str) -> Self {
        Self {
            writer: Some(writer),
            state: AssemblerState::Opened,
            position: 0,
            crc: crc32fast::Hasher::new(),
            header: HeaderRecord {
                profile: profile.to_string(),
                library: library.to_string(),
            },
            index: ContainerIndex::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AssemblerState {
        self.state
    }

    /// Bytes written so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Summary data accumulated so far.
    pub fn index(&self) -> &ContainerIndex {
        &self.index
    }

    /// Write bytes and update position tracking and the running CRC.
    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| ConvertError::invalid_state("closed", "write"))?;
        writer.write_all(data)?;
        self.crc.update(data);
        self.position += data.len() as u64;
        Ok(())
    }

    /// Move to `Writing`, emitting magic and Header on the first call.
    fn ensure_writing(&mut self, operation: &str) -> Result<()> {
        match self.state {
            AssemblerState::Writing => Ok(()),
            AssemblerState::Opened => {
                self.write_bytes(&MCAP_MAGIC)?;
                let header = self.header.encode();
                self.write_bytes(&header)?;
                self.state = AssemblerState::Writing;
                Ok(())
            }
            state => Err(ConvertError::invalid_state(state.to_string(), operation)),
        }
    }

    /// Write magic and Header without any data records.
    pub fn start(&mut self) -> Result<()> {
        self.ensure_writing("start")
    }

    /// Write a Schema record. A schema id already written is skipped.
    pub fn write_schema(&mut self, schema: &SchemaEntry) -> Result<()> {
        self.ensure_writing("write schema")?;
        if self.index.has_schema(schema.id) {
            return Ok(());
        }
        let record = SchemaRecord {
            id: schema.id,
            name: schema.name.clone(),
            encoding: schema.encoding.clone(),
            data: schema.data.clone(),
        };
        self.write_bytes(&record.encode())?;
        self.index.add_schema(record);
        Ok(())
    }

    /// Write a Channel record. A channel id already written is skipped.
    pub fn write_channel(&mut self, channel: &ChannelEntry) -> Result<()> {
        self.ensure_writing("write channel")?;
        if self.index.has_channel(channel.id) {
            return Ok(());
        }
        let record = ChannelRecord {
            id: channel.id,
            schema_id: channel.schema_id,
            topic: channel.topic.clone(),
            message_encoding: channel.message_encoding.clone(),
            metadata: channel.metadata.clone(),
        };
        self.write_bytes(&record.encode())?;
        self.index.add_channel(record);
        Ok(())
    }

    /// Write a chunk followed by one MessageIndex record per channel.
    ///
    /// Every channel in the chunk must have been written before.
    pub fn write_chunk(&mut self, chunk: &CompressedChunk) -> Result<()> {
        self.ensure_writing("write chunk")?;
        if let Some(unknown) = chunk
            .message_indexes
            .keys()
            .find(|&&id| !self.index.has_channel(id))
        {
            return Err(ConvertError::invalid_state(
                self.state.to_string(),
                format!("write chunk {} for unregistered channel {unknown}", chunk.sequence),
            ));
        }

        let chunk_start_offset = self.position;
        let header = ChunkHeader {
            message_start_time: chunk.message_start_time,
            message_end_time: chunk.message_end_time,
            uncompressed_size: chunk.uncompressed_size,
            uncompressed_crc: chunk.uncompressed_crc,
            compression: chunk.compression.mcap_name().to_string(),
            records_size: chunk.compressed_data.len() as u64,
        };
        self.write_bytes(&header.encode_prefix())?;
        self.write_bytes(&chunk.compressed_data)?;
        let chunk_length = self.position - chunk_start_offset;

        let message_index_start = self.position;
        let mut message_index_offsets = BTreeMap::new();
        let mut counts = BTreeMap::new();
        for (&channel_id, entries) in &chunk.message_indexes {
            message_index_offsets.insert(channel_id, self.position);
            counts.insert(channel_id, entries.len() as u64);
            self.write_bytes(&MessageIndexRecord::encode_entries(channel_id, entries))?;
        }
        let message_index_length = self.position - message_index_start;

        self.index.add_chunk(
            ChunkIndexRecord {
                message_start_time: chunk.message_start_time,
                message_end_time: chunk.message_end_time,
                chunk_start_offset,
                chunk_length,
                message_index_offsets,
                message_index_length,
                compression: header.compression,
                compressed_size: chunk.compressed_data.len() as u64,
                uncompressed_size: chunk.uncompressed_size,
            },
            &counts,
        );

        debug!(
            sequence = chunk.sequence,
            offset = chunk_start_offset,
            length = chunk_length,
            messages = chunk.message_count,
            "Chunk written"
        );
        Ok(())
    }

    /// Write a Metadata record and remember it for the summary.
    pub fn write_metadata(&mut self, name: &str, metadata: &BTreeMap<String, String>) -> Result<()> {
        self.ensure_writing("write metadata")?;
        let offset = self.position;
        let record = MetadataRecord {
            name: name.to_string(),
            metadata: metadata.clone(),
        }
        .encode();
        self.write_bytes(&record)?;
        self.index.add_metadata(MetadataIndexRecord {
            offset,
            length: record.len() as u64,
            name: name.to_string(),
        });
        Ok(())
    }

    /// Write one summary group and return its SummaryOffset record.
    fn write_group(&mut self, opcode: u8, records: Vec<Vec<u8>>) -> Result<Option<SummaryOffsetRecord>> {
        if records.is_empty() {
            return Ok(None);
        }
        let group_start = self.position;
        for record in &records {
            self.write_bytes(record)?;
        }
        Ok(Some(SummaryOffsetRecord {
            group_opcode: opcode,
            group_start,
            group_length: self.position - group_start,
        }))
    }

    /// Finalize the container and release the stream.
    ///
    /// Writes DataEnd, the summary section (schemas, channels, statistics,
    /// chunk indexes, metadata indexes), the summary offsets, the footer and
    /// the closing magic. Returns the total file size.
    pub fn finish(&mut self) -> Result<u64> {
        self.ensure_writing("finish")?;
        self.state = AssemblerState::Finalizing;

        let data_section_crc = self.crc.clone().finalize();
        self.write_bytes(&data_end(data_section_crc))?;

        self.crc = crc32fast::Hasher::new();
        let summary_start = self.position;

        let schemas = self.index.schemas().iter().map(SchemaRecord::encode).collect();
        let channels = self.index.channels().iter().map(ChannelRecord::encode).collect();
        let statistics = vec![self.index.statistics().encode()];
        let chunk_indexes = self
            .index
            .chunk_indexes()
            .iter()
            .map(ChunkIndexRecord::encode)
            .collect();
        let metadata_indexes = self
            .index
            .metadata_indexes()
            .iter()
            .map(MetadataIndexRecord::encode)
            .collect();

        let mut offsets = Vec::new();
        for (opcode, records) in [
            (OP_SCHEMA, schemas),
            (OP_CHANNEL, channels),
            (OP_STATISTICS, statistics),
            (OP_CHUNK_INDEX, chunk_indexes),
            (OP_METADATA_INDEX, metadata_indexes),
        ] {
            offsets.extend(self.write_group(opcode, records)?);
        }

        let summary_offset_start = self.position;
        for offset in &offsets {
            self.write_bytes(&offset.encode())?;
        }

        self.write_bytes(&Footer::encode_without_crc(summary_start, summary_offset_start))?;
        let summary_crc = self.crc.clone().finalize();
        self.write_bytes(&summary_crc.to_le_bytes())?;
        self.write_bytes(&MCAP_MAGIC)?;

        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        self.state = AssemblerState::Closed;

        let stats = self.index.statistics();
        info!(
            bytes = self.position,
            messages = stats.message_count,
            chunks = stats.chunk_count,
            channels = stats.channel_count,
            "Container finalized"
        );
        Ok(self.position)
    }

    /// Release the underlying writer once the container is closed.
    pub fn into_inner(mut self) -> Option<W> {
        if self.state == AssemblerState::Closed {
            self.writer.take()
        } else {
            None
        }
    }
}
