// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! MCAP format implementation.
//!
//! - [`chunk_writer`] - Size/count-bounded chunk building with compression
//! - [`writer`] - Container assembler (data section, summary, footer)
//! - [`reader`] - Summary-driven reader with CRC validation
//! - [`records`] - Record framing shared by writer and reader

// Re-export constants at module level for convenience
pub use constants::{
    MCAP_MAGIC, OP_CHANNEL, OP_CHUNK, OP_CHUNK_INDEX, OP_DATA_END, OP_FOOTER, OP_HEADER,
    OP_MESSAGE, OP_MESSAGE_INDEX, OP_METADATA, OP_METADATA_INDEX, OP_SCHEMA, OP_STATISTICS,
    OP_SUMMARY_OFFSET,
};

pub mod chunk_writer;
pub mod compression;
pub mod constants;
pub mod index;
pub mod reader;
pub mod records;
pub mod writer;

pub use chunk_writer::ChunkWriter;
pub use index::ContainerIndex;
pub use reader::{ContainerReader, ContainerSummary, MessageIter};
pub use records::{
    ChannelRecord, ChunkIndexRecord, MessageRecord, MetadataIndexRecord, MetadataRecord,
    SchemaRecord, Statistics,
};
pub use writer::{AssemblerState, ContainerAssembler};
