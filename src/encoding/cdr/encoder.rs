// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Little-endian CDR encoder.
//!
//! Writes the 4-byte encapsulation header followed by naturally aligned
//! primitives. Alignment is measured from the end of the header.

use super::CDR_HEADER_SIZE;

/// Default initial capacity for the encoder buffer.
const DEFAULT_CAPACITY: usize = 64;

/// Encapsulation kind byte for plain little-endian CDR.
pub const CDR_LE: u8 = 0x01;

/// CDR encoder for writing little-endian CDR data.
///
/// # Example
///
/// ```
/// use lerobot2mcap::encoding::cdr::CdrEncoder;
///
/// let mut encoder = CdrEncoder::new();
/// encoder.uint8(1).uint32(42);
/// let data = encoder.finish();
/// assert_eq!(data, vec![0, 1, 0, 0, 1, 0, 0, 0, 42, 0, 0, 0]);
/// ```
#[derive(Debug)]
pub struct CdrEncoder {
    /// Output buffer, header included
    buffer: Vec<u8>,
    /// Origin offset for alignment calculation
    origin: usize,
}

impl Default for CdrEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl CdrEncoder {
    /// Create an encoder with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an encoder sized for `capacity` payload bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut buffer = Vec::with_capacity(CDR_HEADER_SIZE + capacity);
        buffer.extend_from_slice(&[0x00, CDR_LE, 0x00, 0x00]);
        Self {
            buffer,
            origin: CDR_HEADER_SIZE,
        }
    }

    /// Bytes written so far, header included.
    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    /// Current size in bytes, header included.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing beyond the header was written.
    pub fn is_empty(&self) -> bool {
        self.buffer.len() == CDR_HEADER_SIZE
    }

    /// Consume the encoder and return the encoded bytes.
    pub fn finish(self) -> Vec<u8> {
        self.buffer
    }

    /// Pad with zeros until the write position is a multiple of `size`
    /// relative to the origin.
    fn align(&mut self, size: usize) {
        let rel = self.buffer.len() - self.origin;
        let padding = (size - (rel % size)) % size;
        self.buffer.resize(self.buffer.len() + padding, 0);
    }

    /// Write a boolean as one byte.
    pub fn boolean(&mut self, value: bool) -> &mut Self {
        self.uint8(u8::from(value))
    }

    /// Write an `int8`.
    pub fn int8(&mut self, value: i8) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write a `uint8`.
    pub fn uint8(&mut self, value: u8) -> &mut Self {
        self.buffer.push(value);
        self
    }

    /// Write an `int16`.
    pub fn int16(&mut self, value: i16) -> &mut Self {
        self.align(2);
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write a `uint16`.
    pub fn uint16(&mut self, value: u16) -> &mut Self {
        self.align(2);
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write an `int32`.
    pub fn int32(&mut self, value: i32) -> &mut Self {
        self.align(4);
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write a `uint32`.
    pub fn uint32(&mut self, value: u32) -> &mut Self {
        self.align(4);
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write an `int64`.
    pub fn int64(&mut self, value: i64) -> &mut Self {
        self.align(8);
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write a `uint64`.
    pub fn uint64(&mut self, value: u64) -> &mut Self {
        self.align(8);
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write a `float32`.
    pub fn float32(&mut self, value: f32) -> &mut Self {
        self.align(4);
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write a `float64`.
    pub fn float64(&mut self, value: f64) -> &mut Self {
        self.align(8);
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write a sequence length prefix.
    pub fn sequence_length(&mut self, len: usize) -> &mut Self {
        // Lengths beyond u32 are rejected by callers before encoding.
        self.uint32(len as u32)
    }

    /// Write a `uint8[]` sequence: length prefix then raw bytes.
    pub fn uint8_sequence(&mut self, data: &[u8]) -> &mut Self {
        self.sequence_length(data.len());
        self.buffer.extend_from_slice(data);
        self
    }
}
