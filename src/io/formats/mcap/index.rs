// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Trailer accumulator for the container assembler.
//!
//! Everything the summary section needs is collected here during the
//! streaming pass and serialized once when the container is finalized.

use std::collections::BTreeMap;

use super::records::{
    ChannelRecord, ChunkIndexRecord, MetadataIndexRecord, SchemaRecord, Statistics,
};

/// Summary data accumulated while the data section is written.
#[derive(Debug, Default, Clone)]
pub struct ContainerIndex {
    schemas: Vec<SchemaRecord>,
    channels: Vec<ChannelRecord>,
    chunk_indexes: Vec<ChunkIndexRecord>,
    metadata_indexes: Vec<MetadataIndexRecord>,
    channel_message_counts: BTreeMap<u16, u64>,
    message_count: u64,
    time_range: Option<(u64, u64)>,
}

impl ContainerIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a schema id was already recorded.
    pub fn has_schema(&self, id: u16) -> bool {
        self.schemas.iter().any(|s| s.id == id)
    }

    /// Whether a channel id was already recorded.
    pub fn has_channel(&self, id: u16) -> bool {
        self.channels.iter().any(|c| c.id == id)
    }

    pub(crate) fn add_schema(&mut self, schema: SchemaRecord) {
        self.schemas.push(schema);
    }

    pub(crate) fn add_channel(&mut self, channel: ChannelRecord) {
        self.channel_message_counts.entry(channel.id).or_insert(0);
        self.channels.push(channel);
    }

    pub(crate) fn add_chunk(&mut self, index: ChunkIndexRecord, counts: &BTreeMap<u16, u64>) {
        for (&channel_id, &count) in counts {
            *self.channel_message_counts.entry(channel_id).or_insert(0) += count;
            self.message_count += count;
        }
        self.time_range = Some(match self.time_range {
            Some((start, end)) => (
                start.min(index.message_start_time),
                end.max(index.message_end_time),
            ),
            None => (index.message_start_time, index.message_end_time),
        });
        self.chunk_indexes.push(index);
    }

    pub(crate) fn add_metadata(&mut self, index: MetadataIndexRecord) {
        self.metadata_indexes.push(index);
    }

    /// Schemas in write order.
    pub fn schemas(&self) -> &[SchemaRecord] {
        &self.schemas
    }

    /// Channels in write order.
    pub fn channels(&self) -> &[ChannelRecord] {
        &self.channels
    }

    /// Chunk indexes in write order.
    pub fn chunk_indexes(&self) -> &[ChunkIndexRecord] {
        &self.chunk_indexes
    }

    /// Metadata indexes in write order.
    pub fn metadata_indexes(&self) -> &[MetadataIndexRecord] {
        &self.metadata_indexes
    }

    /// Messages recorded so far.
    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    /// Messages per channel.
    pub fn channel_message_counts(&self) -> &BTreeMap<u16, u64> {
        &self.channel_message_counts
    }

    /// Global `(start, end)` log time range, if any chunk was written.
    pub fn time_range(&self) -> Option<(u64, u64)> {
        self.time_range
    }

    /// Build the Statistics record.
    pub fn statistics(&self) -> Statistics {
        let (message_start_time, message_end_time) = self.time_range.unwrap_or((0, 0));
        Statistics {
            message_count: self.message_count,
            schema_count: self.schemas.len() as u16,
            channel_count: self.channels.len() as u32,
            attachment_count: 0,
            metadata_count: self.metadata_indexes.len() as u32,
            chunk_count: self.chunk_indexes.len() as u32,
            message_start_time,
            message_end_time,
            channel_message_counts: self.channel_message_counts.clone(),
        }
    }
}
