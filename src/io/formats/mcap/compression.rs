// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Chunk compression codecs.
//!
//! LZ4 uses the frame format and Zstandard the standard frame, which are the
//! encodings MCAP readers expect for `lz4` and `zstd` chunks.

use std::io::{Read, Write};

use crate::types::Compression;

/// Compress a chunk's records.
pub fn compress(codec: Compression, level: i32, data: &[u8]) -> std::result::Result<Vec<u8>, String> {
    match codec {
        Compression::None => Ok(data.to_vec()),
        Compression::Lz4 => {
            let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::with_capacity(data.len() / 2));
            encoder
                .write_all(data)
                .map_err(|e| format!("LZ4 compression failed: {e}"))?;
            encoder
                .finish()
                .map_err(|e| format!("LZ4 compression failed: {e}"))
        }
        Compression::Zstd => zstd::bulk::compress(data, level)
            .map_err(|e| format!("Zstd compression failed: {e}")),
    }
}

/// Decompress a chunk's records.
pub fn decompress(
    codec: Compression,
    data: &[u8],
    uncompressed_size: usize,
) -> std::result::Result<Vec<u8>, String> {
    match codec {
        Compression::None => Ok(data.to_vec()),
        Compression::Lz4 => {
            let mut out = Vec::with_capacity(uncompressed_size);
            lz4_flex::frame::FrameDecoder::new(data)
                .read_to_end(&mut out)
                .map_err(|e| format!("LZ4 decompression failed: {e}"))?;
            Ok(out)
        }
        Compression::Zstd => zstd::bulk::decompress(data, uncompressed_size)
            .map_err(|e| format!("Zstd decompression failed: {e}")),
    }
}
