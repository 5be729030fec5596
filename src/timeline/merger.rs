// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! K-way merge of per-stream sample buffers into one timeline.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};
use std::vec::IntoIter;

use crate::core::{ConvertError, Payload, Result};
use crate::types::{Record, SourceSample};

/// Head of one stream inside the heap.
struct HeadEntry {
    timestamp: u64,
    /// Index into `TimelineMerger::streams`; streams are stored in lexical
    /// key order, so comparing ranks compares keys.
    rank: usize,
    payload: Payload,
}

impl PartialEq for HeadEntry {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp && self.rank == other.rank
    }
}

impl Eq for HeadEntry {}

impl PartialOrd for HeadEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeadEntry {
    // Reversed so the max-heap pops the earliest timestamp, then the
    // lexically smallest stream key.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| other.rank.cmp(&self.rank))
    }
}

struct StreamCursor {
    key: String,
    samples: IntoIter<SourceSample>,
    last: Option<u64>,
}

/// Merges the ordered streams of one episode into a single sequence sorted
/// by `(timestamp, stream key)`.
///
/// The merge is lazy: only the head of each stream is held in the heap. A
/// stream whose timestamps decrease stops the merge with
/// [`ConvertError::NonMonotonicSource`]; after an error the iterator is
/// exhausted.
pub struct TimelineMerger {
    episode: u64,
    streams: Vec<StreamCursor>,
    heap: BinaryHeap<HeadEntry>,
    failed: Option<ConvertError>,
}

impl TimelineMerger {
    /// Create a merger over one episode's streams.
    pub fn new(episode: u64, streams: BTreeMap<String, Vec<SourceSample>>) -> Self {
        let mut merger = Self {
            episode,
            streams: Vec::with_capacity(streams.len()),
            heap: BinaryHeap::with_capacity(streams.len()),
            failed: None,
        };

        for (key, samples) in streams {
            merger.streams.push(StreamCursor {
                key,
                samples: samples.into_iter(),
                last: None,
            });
        }
        for rank in 0..merger.streams.len() {
            if let Err(e) = merger.advance(rank) {
                merger.failed = Some(e);
                break;
            }
        }

        merger
    }

    /// Episode being merged.
    pub fn episode(&self) -> u64 {
        self.episode
    }

    /// Number of records not yet yielded.
    pub fn remaining(&self) -> usize {
        self.heap.len() + self.streams.iter().map(|s| s.samples.len()).sum::<usize>()
    }

    /// Push the next sample of stream `rank` onto the heap.
    fn advance(&mut self, rank: usize) -> Result<()> {
        let stream = &mut self.streams[rank];
        let Some(sample) = stream.samples.next() else {
            return Ok(());
        };
        if let Some(previous) = stream.last {
            if sample.timestamp < previous {
                return Err(ConvertError::non_monotonic(
                    self.episode,
                    stream.key.clone(),
                    previous,
                    sample.timestamp,
                ));
            }
        }
        stream.last = Some(sample.timestamp);
        self.heap.push(HeadEntry {
            timestamp: sample.timestamp,
            rank,
            payload: sample.payload,
        });
        Ok(())
    }
}

impl Iterator for TimelineMerger {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.failed.take() {
            self.heap.clear();
            return Some(Err(e));
        }

        let head = self.heap.pop()?;
        if let Err(e) = self.advance(head.rank) {
            self.failed = Some(e);
        }

        Some(Ok(Record {
            stream_key: self.streams[head.rank].key.clone(),
            timestamp: head.timestamp,
            payload: head.payload,
        }))
    }
}
