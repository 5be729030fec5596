// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Summary-driven MCAP reader.
//!
//! Opens a finished container, validates magic and both checksums, parses
//! the summary section, and gives access to chunks, messages and metadata
//! through the indexes. Used by the `inspect` command and by tests that
//! check a written container end to end.

use std::collections::{BTreeMap, VecDeque};
use std::fs::File;
use std::ops::Deref;
use std::path::Path;

use super::compression::decompress;
use super::constants::{
    DATA_END_RECORD_SIZE, FOOTER_RECORD_SIZE, MCAP_MAGIC, OP_CHANNEL, OP_CHUNK, OP_CHUNK_INDEX,
    OP_DATA_END, OP_HEADER, OP_MESSAGE, OP_MESSAGE_INDEX, OP_METADATA, OP_METADATA_INDEX,
    OP_SCHEMA, OP_STATISTICS, OP_SUMMARY_OFFSET,
};
use super::records::{
    parse_data_end, read_record, ChannelRecord, ChunkHeader, ChunkIndexRecord, Footer,
    HeaderRecord, MessageIndexRecord, MessageRecord, MetadataIndexRecord, MetadataRecord,
    SchemaRecord, Statistics, SummaryOffsetRecord,
};
use crate::core::{ConvertError, Result};
use crate::types::Compression;

/// Bytes backing a reader.
enum Backing {
    Mapped(memmap2::Mmap),
    Owned(Vec<u8>),
}

impl Deref for Backing {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Backing::Mapped(mmap) => &mmap[..],
            Backing::Owned(bytes) => &bytes[..],
        }
    }
}

/// Parsed summary section.
#[derive(Debug, Clone, Default)]
pub struct ContainerSummary {
    /// Schemas by id
    pub schemas: BTreeMap<u16, SchemaRecord>,
    /// Channels by id
    pub channels: BTreeMap<u16, ChannelRecord>,
    /// Statistics record
    pub statistics: Option<Statistics>,
    /// Chunk indexes in file order
    pub chunk_indexes: Vec<ChunkIndexRecord>,
    /// Metadata indexes in file order
    pub metadata_indexes: Vec<MetadataIndexRecord>,
    /// Summary offset records
    pub summary_offsets: Vec<SummaryOffsetRecord>,
}

/// Reader over a finished MCAP container.
pub struct ContainerReader {
    data: Backing,
    header: HeaderRecord,
    summary: ContainerSummary,
}

fn parse_err(context: &str, message: impl Into<String>) -> ConvertError {
    ConvertError::parse(context, message)
}

impl ContainerReader {
    /// Memory-map and validate a container file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ConvertError::Io {
            message: format!("failed to open {}: {e}", path.display()),
        })?;
        // SAFETY: the mapping is owned by the reader and only borrowed through it.
        let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(|e| ConvertError::Io {
            message: format!("failed to mmap {}: {e}", path.display()),
        })?;
        Self::from_backing(Backing::Mapped(mmap))
    }

    /// Validate a container held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_backing(Backing::Owned(bytes))
    }

    fn from_backing(data: Backing) -> Result<Self> {
        let min_len = MCAP_MAGIC.len() * 2 + DATA_END_RECORD_SIZE + FOOTER_RECORD_SIZE;
        if data.len() < min_len {
            return Err(parse_err(
                "MCAP",
                format!("file of {} bytes is too short", data.len()),
            ));
        }
        for magic in [&data[..8], &data[data.len() - 8..]] {
            if magic != MCAP_MAGIC {
                return Err(parse_err(
                    "MCAP",
                    format!("invalid magic: {}", hex::encode(magic)),
                ));
            }
        }

        let footer_start = data.len() - 8 - FOOTER_RECORD_SIZE;
        let footer = Footer::parse_record(&data[footer_start..data.len() - 8])?;
        let summary_start = footer.summary_start as usize;
        if summary_start == 0 || summary_start > footer_start {
            return Err(parse_err(
                "Footer",
                format!("invalid summary start {}", footer.summary_start),
            ));
        }

        if footer.summary_crc != 0 {
            let computed = crc32fast::hash(&data[summary_start..data.len() - 8 - 4]);
            if computed != footer.summary_crc {
                return Err(parse_err(
                    "Footer",
                    format!(
                        "summary CRC mismatch: stored {:08x}, computed {computed:08x}",
                        footer.summary_crc
                    ),
                ));
            }
        }

        let data_end_start = summary_start
            .checked_sub(DATA_END_RECORD_SIZE)
            .ok_or_else(|| parse_err("DataEnd", "summary starts before DataEnd"))?;
        let (opcode, body, _) = read_record(&data, data_end_start)?;
        if opcode != OP_DATA_END {
            return Err(parse_err(
                "DataEnd",
                format!("expected DataEnd before summary, found opcode 0x{opcode:02x}"),
            ));
        }
        let stored = parse_data_end(body)?;
        if stored != 0 {
            let computed = crc32fast::hash(&data[..data_end_start]);
            if computed != stored {
                return Err(parse_err(
                    "DataEnd",
                    format!("data section CRC mismatch: stored {stored:08x}, computed {computed:08x}"),
                ));
            }
        }

        let (opcode, body, _) = read_record(&data, MCAP_MAGIC.len())?;
        if opcode != OP_HEADER {
            return Err(parse_err(
                "MCAP",
                format!("expected Header record, found opcode 0x{opcode:02x}"),
            ));
        }
        let header = HeaderRecord::parse(body)?;

        let summary_end = if footer.summary_offset_start != 0 {
            footer.summary_offset_start as usize
        } else {
            footer_start
        };
        let mut summary = ContainerSummary::default();
        let mut offset = summary_start;
        while offset < footer_start {
            let (opcode, body, next) = read_record(&data, offset)?;
            match opcode {
                OP_SCHEMA => {
                    let schema = SchemaRecord::parse(body)?;
                    summary.schemas.insert(schema.id, schema);
                }
                OP_CHANNEL => {
                    let channel = ChannelRecord::parse(body)?;
                    summary.channels.insert(channel.id, channel);
                }
                OP_STATISTICS => summary.statistics = Some(Statistics::parse(body)?),
                OP_CHUNK_INDEX => summary.chunk_indexes.push(ChunkIndexRecord::parse(body)?),
                OP_METADATA_INDEX => summary
                    .metadata_indexes
                    .push(MetadataIndexRecord::parse(body)?),
                OP_SUMMARY_OFFSET if offset >= summary_end => {
                    summary.summary_offsets.push(SummaryOffsetRecord::parse(body)?)
                }
                // Unknown and unsupported summary records are skipped.
                _ => {}
            }
            offset = next;
        }

        Ok(Self {
            data,
            header,
            summary,
        })
    }

    /// Raw container bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Header record.
    pub fn header(&self) -> &HeaderRecord {
        &self.header
    }

    /// Parsed summary section.
    pub fn summary(&self) -> &ContainerSummary {
        &self.summary
    }

    /// Statistics, or defaults when the file has none.
    pub fn statistics(&self) -> Statistics {
        self.summary.statistics.clone().unwrap_or_default()
    }

    /// Message counts per channel for one chunk, read from its MessageIndex
    /// records.
    pub fn chunk_message_counts(&self, chunk: &ChunkIndexRecord) -> Result<BTreeMap<u16, usize>> {
        let mut counts = BTreeMap::new();
        for (&channel_id, &offset) in &chunk.message_index_offsets {
            let (opcode, body, _) = read_record(&self.data, offset as usize)?;
            if opcode != OP_MESSAGE_INDEX {
                return Err(parse_err(
                    "MessageIndex",
                    format!("expected MessageIndex at {offset}, found opcode 0x{opcode:02x}"),
                ));
            }
            let index = MessageIndexRecord::parse(body)?;
            counts.insert(channel_id, index.entries.len());
        }
        Ok(counts)
    }

    /// Decompress a chunk's records and verify their CRC.
    pub fn chunk_records(&self, chunk: &ChunkIndexRecord) -> Result<Vec<u8>> {
        let (opcode, body, _) = read_record(&self.data, chunk.chunk_start_offset as usize)?;
        if opcode != OP_CHUNK {
            return Err(parse_err(
                "Chunk",
                format!(
                    "expected Chunk at {}, found opcode 0x{opcode:02x}",
                    chunk.chunk_start_offset
                ),
            ));
        }
        let (header, compressed) = ChunkHeader::parse(body)?;
        let codec = Compression::from_mcap_name(&header.compression).ok_or_else(|| {
            parse_err(
                "Chunk",
                format!("unsupported compression '{}'", header.compression),
            )
        })?;
        let records = decompress(codec, compressed, header.uncompressed_size as usize)
            .map_err(|e| parse_err("Chunk", e))?;

        if records.len() as u64 != header.uncompressed_size {
            return Err(parse_err(
                "Chunk",
                format!(
                    "decompressed {} bytes, header says {}",
                    records.len(),
                    header.uncompressed_size
                ),
            ));
        }
        if header.uncompressed_crc != 0 {
            let computed = crc32fast::hash(&records);
            if computed != header.uncompressed_crc {
                return Err(parse_err(
                    "Chunk",
                    format!(
                        "chunk CRC mismatch: stored {:08x}, computed {computed:08x}",
                        header.uncompressed_crc
                    ),
                ));
            }
        }
        Ok(records)
    }

    /// Messages of one chunk in record order.
    pub fn chunk_messages(&self, chunk: &ChunkIndexRecord) -> Result<Vec<MessageRecord>> {
        let records = self.chunk_records(chunk)?;
        let mut messages = Vec::new();
        let mut offset = 0;
        while offset < records.len() {
            let (opcode, body, next) = read_record(&records, offset)?;
            if opcode == OP_MESSAGE {
                messages.push(MessageRecord::parse(body)?);
            }
            offset = next;
        }
        Ok(messages)
    }

    /// Iterate all messages in file order.
    pub fn messages(&self) -> MessageIter<'_> {
        MessageIter {
            reader: self,
            next_chunk: 0,
            pending: VecDeque::new(),
        }
    }

    /// Read every Metadata record listed in the summary.
    pub fn metadata(&self) -> Result<Vec<MetadataRecord>> {
        self.summary
            .metadata_indexes
            .iter()
            .map(|index| {
                let (opcode, body, _) = read_record(&self.data, index.offset as usize)?;
                if opcode != OP_METADATA {
                    return Err(parse_err(
                        "Metadata",
                        format!(
                            "expected Metadata at {}, found opcode 0x{opcode:02x}",
                            index.offset
                        ),
                    ));
                }
                MetadataRecord::parse(body)
            })
            .collect()
    }
}

/// Iterator over all messages of a container, chunk by chunk.
pub struct MessageIter<'a> {
    reader: &'a ContainerReader,
    next_chunk: usize,
    pending: VecDeque<MessageRecord>,
}

impl Iterator for MessageIter<'_> {
    type Item = Result<MessageRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(message) = self.pending.pop_front() {
                return Some(Ok(message));
            }
            let chunk = self.reader.summary.chunk_indexes.get(self.next_chunk)?;
            self.next_chunk += 1;
            match self.reader.chunk_messages(chunk) {
                Ok(messages) => self.pending.extend(messages),
                Err(e) => {
                    self.next_chunk = self.reader.summary.chunk_indexes.len();
                    return Some(Err(e));
                }
            }
        }
    }
}
