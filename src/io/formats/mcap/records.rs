// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! MCAP record serialization and parsing.
//!
//! Every record is framed as `opcode (u8) | length (u64) | body`. Inside a
//! body, integers are little endian, strings and byte arrays carry a `u32`
//! length prefix and maps carry a `u32` byte-length prefix. Maps are always
//! written in sorted key order so output is reproducible.

use std::collections::BTreeMap;
use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use super::constants::{
    OP_CHANNEL, OP_CHUNK, OP_CHUNK_INDEX, OP_DATA_END, OP_FOOTER, OP_HEADER, OP_MESSAGE,
    OP_MESSAGE_INDEX, OP_METADATA, OP_METADATA_INDEX, OP_SCHEMA, OP_STATISTICS,
    OP_SUMMARY_OFFSET, RECORD_PREFIX_SIZE,
};
use crate::core::{ConvertError, Result};
use crate::types::MessageIndexEntry;

/// Little-endian append helpers for record bodies.
pub trait PutLe {
    /// Append a `u8`.
    fn put_u8(&mut self, v: u8);
    /// Append a `u16`.
    fn put_u16(&mut self, v: u16);
    /// Append a `u32`.
    fn put_u32(&mut self, v: u32);
    /// Append a `u64`.
    fn put_u64(&mut self, v: u64);
    /// Append a `u32`-prefixed string.
    fn put_str(&mut self, s: &str);
    /// Append `u32`-prefixed bytes.
    fn put_bytes32(&mut self, b: &[u8]);
    /// Append a `u32` byte-length-prefixed string map.
    fn put_string_map(&mut self, map: &BTreeMap<String, String>);
    /// Append a `u32` byte-length-prefixed `u16 -> u64` map.
    fn put_u16_u64_map(&mut self, map: &BTreeMap<u16, u64>);
}

impl PutLe for Vec<u8> {
    fn put_u8(&mut self, v: u8) {
        self.push(v);
    }

    fn put_u16(&mut self, v: u16) {
        self.extend_from_slice(&v.to_le_bytes());
    }

    fn put_u32(&mut self, v: u32) {
        self.extend_from_slice(&v.to_le_bytes());
    }

    fn put_u64(&mut self, v: u64) {
        self.extend_from_slice(&v.to_le_bytes());
    }

    fn put_str(&mut self, s: &str) {
        self.put_bytes32(s.as_bytes());
    }

    fn put_bytes32(&mut self, b: &[u8]) {
        self.put_u32(b.len() as u32);
        self.extend_from_slice(b);
    }

    fn put_string_map(&mut self, map: &BTreeMap<String, String>) {
        let byte_len: usize = map.iter().map(|(k, v)| 8 + k.len() + v.len()).sum();
        self.put_u32(byte_len as u32);
        for (k, v) in map {
            self.put_str(k);
            self.put_str(v);
        }
    }

    fn put_u16_u64_map(&mut self, map: &BTreeMap<u16, u64>) {
        self.put_u32((map.len() * 10) as u32);
        for (&k, &v) in map {
            self.put_u16(k);
            self.put_u64(v);
        }
    }
}

/// Frame a record body with its opcode and length.
pub fn frame(opcode: u8, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(RECORD_PREFIX_SIZE + body.len());
    out.put_u8(opcode);
    out.put_u64(body.len() as u64);
    out.extend_from_slice(body);
    out
}

/// Split one framed record at `offset` into `(opcode, body, next_offset)`.
pub fn read_record(data: &[u8], offset: usize) -> Result<(u8, &[u8], usize)> {
    let prefix_end = offset
        .checked_add(RECORD_PREFIX_SIZE)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| {
            ConvertError::parse("record", format!("truncated record prefix at {offset}"))
        })?;
    let opcode = data[offset];
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&data[offset + 1..prefix_end]);
    let len = u64::from_le_bytes(len_bytes);

    let end = usize::try_from(len)
        .ok()
        .and_then(|len| prefix_end.checked_add(len))
        .filter(|&end| end <= data.len())
        .ok_or_else(|| {
            ConvertError::parse(
                "record",
                format!("record 0x{opcode:02x} at {offset} claims {len} bytes past end of data"),
            )
        })?;

    Ok((opcode, &data[prefix_end..end], end))
}

/// Reader over one record body.
struct Body<'a> {
    cur: Cursor<&'a [u8]>,
    record: &'static str,
}

impl<'a> Body<'a> {
    fn new(record: &'static str, data: &'a [u8]) -> Self {
        Self {
            cur: Cursor::new(data),
            record,
        }
    }

    fn truncated(&self) -> ConvertError {
        ConvertError::parse(
            self.record,
            format!("truncated at byte {}", self.cur.position()),
        )
    }

    fn u8(&mut self) -> Result<u8> {
        self.cur.read_u8().map_err(|_| self.truncated())
    }

    fn u16(&mut self) -> Result<u16> {
        self.cur
            .read_u16::<LittleEndian>()
            .map_err(|_| self.truncated())
    }

    fn u32(&mut self) -> Result<u32> {
        self.cur
            .read_u32::<LittleEndian>()
            .map_err(|_| self.truncated())
    }

    fn u64(&mut self) -> Result<u64> {
        self.cur
            .read_u64::<LittleEndian>()
            .map_err(|_| self.truncated())
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let data: &'a [u8] = *self.cur.get_ref();
        let start = self.cur.position() as usize;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| self.truncated())?;
        self.cur.set_position(end as u64);
        Ok(&data[start..end])
    }

    fn bytes32(&mut self) -> Result<Vec<u8>> {
        let len = self.u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ConvertError::parse(self.record, format!("invalid UTF-8: {e}")))
    }

    fn string_map(&mut self) -> Result<BTreeMap<String, String>> {
        let byte_len = self.u32()? as usize;
        let mut inner = Body::new(self.record, self.take(byte_len)?);
        let mut map = BTreeMap::new();
        while !inner.is_empty() {
            let k = inner.string()?;
            let v = inner.string()?;
            map.insert(k, v);
        }
        Ok(map)
    }

    fn u16_u64_map(&mut self) -> Result<BTreeMap<u16, u64>> {
        let byte_len = self.u32()? as usize;
        let mut inner = Body::new(self.record, self.take(byte_len)?);
        let mut map = BTreeMap::new();
        while !inner.is_empty() {
            let k = inner.u16()?;
            let v = inner.u64()?;
            map.insert(k, v);
        }
        Ok(map)
    }

    fn rest(&mut self) -> &'a [u8] {
        let data: &'a [u8] = *self.cur.get_ref();
        let start = (self.cur.position() as usize).min(data.len());
        self.cur.set_position(data.len() as u64);
        &data[start..]
    }

    fn is_empty(&self) -> bool {
        self.cur.position() as usize >= self.cur.get_ref().len()
    }
}

fn expect_opcode(record: &'static str, expected: u8, actual: u8) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(ConvertError::parse(
            record,
            format!("expected opcode 0x{expected:02x}, found 0x{actual:02x}"),
        ))
    }
}

/// Header record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRecord {
    /// Profile, e.g. `ros2`
    pub profile: String,
    /// Writing library
    pub library: String,
}

impl HeaderRecord {
    /// Serialize to a framed record.
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.put_str(&self.profile);
        body.put_str(&self.library);
        frame(OP_HEADER, &body)
    }

    /// Parse a record body.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let mut b = Body::new("Header", body);
        Ok(Self {
            profile: b.string()?,
            library: b.string()?,
        })
    }
}

/// Schema record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRecord {
    /// Schema id
    pub id: u16,
    /// Schema name
    pub name: String,
    /// Schema encoding
    pub encoding: String,
    /// Schema text
    pub data: Vec<u8>,
}

impl SchemaRecord {
    /// Serialize to a framed record.
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(14 + self.name.len() + self.data.len());
        body.put_u16(self.id);
        body.put_str(&self.name);
        body.put_str(&self.encoding);
        body.put_bytes32(&self.data);
        frame(OP_SCHEMA, &body)
    }

    /// Parse a record body.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let mut b = Body::new("Schema", body);
        Ok(Self {
            id: b.u16()?,
            name: b.string()?,
            encoding: b.string()?,
            data: b.bytes32()?,
        })
    }
}

/// Channel record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    /// Channel id
    pub id: u16,
    /// Schema id
    pub schema_id: u16,
    /// Topic
    pub topic: String,
    /// Message encoding
    pub message_encoding: String,
    /// User metadata
    pub metadata: BTreeMap<String, String>,
}

impl ChannelRecord {
    /// Serialize to a framed record.
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.put_u16(self.id);
        body.put_u16(self.schema_id);
        body.put_str(&self.topic);
        body.put_str(&self.message_encoding);
        body.put_string_map(&self.metadata);
        frame(OP_CHANNEL, &body)
    }

    /// Parse a record body.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let mut b = Body::new("Channel", body);
        Ok(Self {
            id: b.u16()?,
            schema_id: b.u16()?,
            topic: b.string()?,
            message_encoding: b.string()?,
            metadata: b.string_map()?,
        })
    }
}

/// Message record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    /// Channel id
    pub channel_id: u16,
    /// Per-channel sequence number
    pub sequence: u32,
    /// Log time (ns)
    pub log_time: u64,
    /// Publish time (ns)
    pub publish_time: u64,
    /// Encoded payload
    pub data: Vec<u8>,
}

impl MessageRecord {
    /// Parse a record body.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let mut b = Body::new("Message", body);
        Ok(Self {
            channel_id: b.u16()?,
            sequence: b.u32()?,
            log_time: b.u64()?,
            publish_time: b.u64()?,
            data: b.rest().to_vec(),
        })
    }
}

/// Append a framed Message record to `out` without an intermediate copy.
pub fn put_message(
    out: &mut Vec<u8>,
    channel_id: u16,
    sequence: u32,
    log_time: u64,
    publish_time: u64,
    data: &[u8],
) {
    out.put_u8(OP_MESSAGE);
    out.put_u64((2 + 4 + 8 + 8 + data.len()) as u64);
    out.put_u16(channel_id);
    out.put_u32(sequence);
    out.put_u64(log_time);
    out.put_u64(publish_time);
    out.extend_from_slice(data);
}

/// Fixed fields of a Chunk record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Earliest message log time
    pub message_start_time: u64,
    /// Latest message log time
    pub message_end_time: u64,
    /// Size of the records after decompression
    pub uncompressed_size: u64,
    /// CRC32 of the decompressed records, 0 when absent
    pub uncompressed_crc: u32,
    /// Compression name
    pub compression: String,
    /// Size of the compressed records
    pub records_size: u64,
}

impl ChunkHeader {
    /// Serialize the record prefix and fixed fields. The `records_size`
    /// compressed bytes must follow.
    pub fn encode_prefix(&self) -> Vec<u8> {
        let body_len = 8 + 8 + 8 + 4 + 4 + self.compression.len() as u64 + 8 + self.records_size;
        let mut out = Vec::with_capacity(RECORD_PREFIX_SIZE + 44 + self.compression.len());
        out.put_u8(OP_CHUNK);
        out.put_u64(body_len);
        out.put_u64(self.message_start_time);
        out.put_u64(self.message_end_time);
        out.put_u64(self.uncompressed_size);
        out.put_u32(self.uncompressed_crc);
        out.put_str(&self.compression);
        out.put_u64(self.records_size);
        out
    }

    /// Parse a record body into the header and the compressed records.
    pub fn parse(body: &[u8]) -> Result<(Self, &[u8])> {
        let mut b = Body::new("Chunk", body);
        let header = Self {
            message_start_time: b.u64()?,
            message_end_time: b.u64()?,
            uncompressed_size: b.u64()?,
            uncompressed_crc: b.u32()?,
            compression: b.string()?,
            records_size: b.u64()?,
        };
        let records = b.take(header.records_size as usize)?;
        Ok((header, records))
    }
}

/// MessageIndex record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageIndexRecord {
    /// Channel id
    pub channel_id: u16,
    /// `(log_time, offset)` entries
    pub entries: Vec<MessageIndexEntry>,
}

impl MessageIndexRecord {
    /// Serialize a framed record straight from index entries.
    pub fn encode_entries(channel_id: u16, entries: &[MessageIndexEntry]) -> Vec<u8> {
        let mut body = Vec::with_capacity(6 + entries.len() * 16);
        body.put_u16(channel_id);
        body.put_u32((entries.len() * 16) as u32);
        for entry in entries {
            body.put_u64(entry.log_time);
            body.put_u64(entry.offset);
        }
        frame(OP_MESSAGE_INDEX, &body)
    }

    /// Parse a record body.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let mut b = Body::new("MessageIndex", body);
        let channel_id = b.u16()?;
        let byte_len = b.u32()? as usize;
        let mut inner = Body::new("MessageIndex", b.take(byte_len)?);
        let mut entries = Vec::with_capacity(byte_len / 16);
        while !inner.is_empty() {
            entries.push(MessageIndexEntry {
                log_time: inner.u64()?,
                offset: inner.u64()?,
            });
        }
        Ok(Self {
            channel_id,
            entries,
        })
    }
}

/// ChunkIndex record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkIndexRecord {
    /// Earliest message log time in the chunk
    pub message_start_time: u64,
    /// Latest message log time in the chunk
    pub message_end_time: u64,
    /// Absolute offset of the Chunk record
    pub chunk_start_offset: u64,
    /// Length of the Chunk record, prefix included
    pub chunk_length: u64,
    /// Absolute offset of each channel's MessageIndex record
    pub message_index_offsets: BTreeMap<u16, u64>,
    /// Total length of the MessageIndex records after the chunk
    pub message_index_length: u64,
    /// Compression name
    pub compression: String,
    /// Compressed records size
    pub compressed_size: u64,
    /// Uncompressed records size
    pub uncompressed_size: u64,
}

impl ChunkIndexRecord {
    /// Serialize to a framed record.
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.put_u64(self.message_start_time);
        body.put_u64(self.message_end_time);
        body.put_u64(self.chunk_start_offset);
        body.put_u64(self.chunk_length);
        body.put_u16_u64_map(&self.message_index_offsets);
        body.put_u64(self.message_index_length);
        body.put_str(&self.compression);
        body.put_u64(self.compressed_size);
        body.put_u64(self.uncompressed_size);
        frame(OP_CHUNK_INDEX, &body)
    }

    /// Parse a record body.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let mut b = Body::new("ChunkIndex", body);
        Ok(Self {
            message_start_time: b.u64()?,
            message_end_time: b.u64()?,
            chunk_start_offset: b.u64()?,
            chunk_length: b.u64()?,
            message_index_offsets: b.u16_u64_map()?,
            message_index_length: b.u64()?,
            compression: b.string()?,
            compressed_size: b.u64()?,
            uncompressed_size: b.u64()?,
        })
    }
}

/// Statistics record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Total messages
    pub message_count: u64,
    /// Schemas in the file
    pub schema_count: u16,
    /// Channels in the file
    pub channel_count: u32,
    /// Attachments in the file
    pub attachment_count: u32,
    /// Metadata records in the file
    pub metadata_count: u32,
    /// Chunks in the file
    pub chunk_count: u32,
    /// Earliest log time, 0 when empty
    pub message_start_time: u64,
    /// Latest log time, 0 when empty
    pub message_end_time: u64,
    /// Messages per channel
    pub channel_message_counts: BTreeMap<u16, u64>,
}

impl Statistics {
    /// Serialize to a framed record.
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.put_u64(self.message_count);
        body.put_u16(self.schema_count);
        body.put_u32(self.channel_count);
        body.put_u32(self.attachment_count);
        body.put_u32(self.metadata_count);
        body.put_u32(self.chunk_count);
        body.put_u64(self.message_start_time);
        body.put_u64(self.message_end_time);
        body.put_u16_u64_map(&self.channel_message_counts);
        frame(OP_STATISTICS, &body)
    }

    /// Parse a record body.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let mut b = Body::new("Statistics", body);
        Ok(Self {
            message_count: b.u64()?,
            schema_count: b.u16()?,
            channel_count: b.u32()?,
            attachment_count: b.u32()?,
            metadata_count: b.u32()?,
            chunk_count: b.u32()?,
            message_start_time: b.u64()?,
            message_end_time: b.u64()?,
            channel_message_counts: b.u16_u64_map()?,
        })
    }
}

/// Metadata record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    /// Record name
    pub name: String,
    /// Key/value pairs
    pub metadata: BTreeMap<String, String>,
}

impl MetadataRecord {
    /// Serialize to a framed record.
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.put_str(&self.name);
        body.put_string_map(&self.metadata);
        frame(OP_METADATA, &body)
    }

    /// Parse a record body.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let mut b = Body::new("Metadata", body);
        Ok(Self {
            name: b.string()?,
            metadata: b.string_map()?,
        })
    }
}

/// MetadataIndex record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataIndexRecord {
    /// Absolute offset of the Metadata record
    pub offset: u64,
    /// Length of the Metadata record, prefix included
    pub length: u64,
    /// Metadata record name
    pub name: String,
}

impl MetadataIndexRecord {
    /// Serialize to a framed record.
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.put_u64(self.offset);
        body.put_u64(self.length);
        body.put_str(&self.name);
        frame(OP_METADATA_INDEX, &body)
    }

    /// Parse a record body.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let mut b = Body::new("MetadataIndex", body);
        Ok(Self {
            offset: b.u64()?,
            length: b.u64()?,
            name: b.string()?,
        })
    }
}

/// SummaryOffset record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryOffsetRecord {
    /// Opcode of the records in the group
    pub group_opcode: u8,
    /// Absolute offset of the first record in the group
    pub group_start: u64,
    /// Byte length of the group
    pub group_length: u64,
}

impl SummaryOffsetRecord {
    /// Serialize to a framed record.
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(17);
        body.put_u8(self.group_opcode);
        body.put_u64(self.group_start);
        body.put_u64(self.group_length);
        frame(OP_SUMMARY_OFFSET, &body)
    }

    /// Parse a record body.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let mut b = Body::new("SummaryOffset", body);
        Ok(Self {
            group_opcode: b.u8()?,
            group_start: b.u64()?,
            group_length: b.u64()?,
        })
    }
}

/// Serialize a DataEnd record.
pub fn data_end(data_section_crc: u32) -> Vec<u8> {
    frame(OP_DATA_END, &data_section_crc.to_le_bytes())
}

/// Parse a DataEnd record body.
pub fn parse_data_end(body: &[u8]) -> Result<u32> {
    Body::new("DataEnd", body).u32()
}

/// Footer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    /// Absolute offset of the summary section, 0 when absent
    pub summary_start: u64,
    /// Absolute offset of the summary offset section, 0 when absent
    pub summary_offset_start: u64,
    /// CRC32 from summary start through `summary_offset_start`
    pub summary_crc: u32,
}

impl Footer {
    /// Serialize everything up to and excluding `summary_crc`.
    ///
    /// The summary CRC covers these bytes, so the caller hashes them before
    /// appending the CRC.
    pub fn encode_without_crc(summary_start: u64, summary_offset_start: u64) -> Vec<u8> {
        let mut out = Vec::with_capacity(RECORD_PREFIX_SIZE + 20);
        out.put_u8(OP_FOOTER);
        out.put_u64(20);
        out.put_u64(summary_start);
        out.put_u64(summary_offset_start);
        out
    }

    /// Parse a full framed Footer record.
    pub fn parse_record(record: &[u8]) -> Result<Self> {
        let (opcode, body, _) = read_record(record, 0)?;
        expect_opcode("Footer", OP_FOOTER, opcode)?;
        let mut b = Body::new("Footer", body);
        Ok(Self {
            summary_start: b.u64()?,
            summary_offset_start: b.u64()?,
            summary_crc: b.u32()?,
        })
    }
}
