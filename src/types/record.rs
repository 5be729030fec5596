// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Records and episode descriptions exchanged with dataset sources.

use std::collections::BTreeMap;

use crate::core::{Payload, PayloadKind, StreamShape};

/// One timestamped sample of one stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Stream key, e.g. `observation.state`
    pub stream_key: String,
    /// Absolute timestamp in nanoseconds
    pub timestamp: u64,
    /// Sample value
    pub payload: Payload,
}

impl Record {
    /// Create a record.
    pub fn new(stream_key: impl Into<String>, timestamp: u64, payload: Payload) -> Self {
        Self {
            stream_key: stream_key.into(),
            timestamp,
            payload,
        }
    }

    /// Payload kind.
    pub fn kind(&self) -> PayloadKind {
        self.payload.kind()
    }
}

/// A sample as returned by [`DatasetSource::stream_records`], before it is
/// bound to its stream key.
///
/// [`DatasetSource::stream_records`]: crate::dataset::DatasetSource::stream_records
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSample {
    /// Absolute timestamp in nanoseconds
    pub timestamp: u64,
    /// Sample value
    pub payload: Payload,
}

impl SourceSample {
    /// Create a sample.
    pub fn new(timestamp: u64, payload: Payload) -> Self {
        Self { timestamp, payload }
    }
}

/// Description of one episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeMetadata {
    /// Episode index
    pub index: u64,
    /// Absolute start time in nanoseconds
    pub start_time: u64,
    /// The source has no absolute start for this episode
    ///
    /// Sample timestamps then count from the episode's own zero, and the
    /// engine places the episode after the previous one in the container.
    pub relative_time: bool,
    /// Streams present in the episode, keyed by stream key
    pub streams: BTreeMap<String, StreamShape>,
    /// Nominal sampling rate in Hz
    pub rate_hint: Option<f64>,
}

impl EpisodeMetadata {
    /// Create an episode description with no streams.
    pub fn new(index: u64, start_time: u64) -> Self {
        Self {
            index,
            start_time,
            relative_time: false,
            streams: BTreeMap::new(),
            rate_hint: None,
        }
    }

    /// Create an episode description whose timestamps start at zero and
    /// carry no absolute start.
    pub fn relative(index: u64) -> Self {
        Self {
            relative_time: true,
            ..Self::new(index, 0)
        }
    }

    /// Add a stream.
    pub fn with_stream(mut self, key: impl Into<String>, shape: StreamShape) -> Self {
        self.streams.insert(key.into(), shape);
        self
    }
}

/// Dataset-level description written into the trailing `dataset` metadata
/// record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetInfo {
    /// Dataset name or repository id
    pub name: String,
    /// Frames per second, when known
    pub fps: Option<f64>,
    /// Robot type, when known
    pub robot_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ScalarType;

    #[test]
    fn test_episode_streams_sorted() {
        let episode = EpisodeMetadata::new(3, 100)
            .with_stream("observation.state", StreamShape::vector(ScalarType::Float32, 2))
            .with_stream("action", StreamShape::vector(ScalarType::Float32, 2));
        let keys: Vec<_> = episode.streams.keys().cloned().collect();
        assert_eq!(keys, vec!["action", "observation.state"]);
        assert!(!episode.relative_time);
    }

    #[test]
    fn test_relative_episode_starts_at_zero() {
        let episode = EpisodeMetadata::relative(2);
        assert_eq!((episode.index, episode.start_time), (2, 0));
        assert!(episode.relative_time);
    }

    #[test]
    fn test_record_kind() {
        let record = Record::new("action", 5, Payload::Numeric(vec![1.0]));
        assert_eq!(record.kind(), PayloadKind::Numeric);
        assert_eq!(record.stream_key, "action");
    }
}
