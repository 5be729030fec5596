// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Pipeline data structures.
//!
//! Records flow from the dataset source through the timeline merger into the
//! chunk writer, which produces [`CompressedChunk`]s for the assembler.

pub mod chunk;
pub mod record;

pub use chunk::{ChunkConfig, CompressedChunk, Compression, MessageIndexEntry};
pub use record::{DatasetInfo, EpisodeMetadata, Record, SourceSample};
