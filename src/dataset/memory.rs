// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! In-memory dataset source.

use std::collections::BTreeMap;

use super::DatasetSource;
use crate::core::{ConvertError, Payload, Result, StreamShape};
use crate::types::{DatasetInfo, EpisodeMetadata, SourceSample};

#[derive(Debug, Clone)]
struct Episode {
    metadata: EpisodeMetadata,
    samples: BTreeMap<String, Vec<SourceSample>>,
}

/// A dataset held entirely in memory.
///
/// Episodes are returned in index order. Samples are stored exactly as
/// pushed, so an out-of-order stream reaches the engine unchanged.
///
/// # Example
///
/// ```
/// use lerobot2mcap::core::{Payload, ScalarType, StreamShape};
/// use lerobot2mcap::dataset::{DatasetSource, InMemoryDataset};
///
/// let dataset = InMemoryDataset::new("demo")
///     .with_episode(0, 0)
///     .with_stream(0, "observation.state", StreamShape::vector(ScalarType::Float32, 1))
///     .with_sample(0, "observation.state", 0, Payload::Numeric(vec![0.5]));
///
/// assert_eq!(dataset.episode_indices().unwrap(), vec![0]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataset {
    info: DatasetInfo,
    episodes: BTreeMap<u64, Episode>,
}

impl InMemoryDataset {
    /// Create an empty dataset with a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: DatasetInfo {
                name: name.into(),
                ..DatasetInfo::default()
            },
            episodes: BTreeMap::new(),
        }
    }

    /// Set the nominal frame rate.
    pub fn with_fps(mut self, fps: f64) -> Self {
        self.info.fps = Some(fps);
        for episode in self.episodes.values_mut() {
            episode.metadata.rate_hint = Some(fps);
        }
        self
    }

    /// Add an empty episode.
    pub fn with_episode(mut self, index: u64, start_time: u64) -> Self {
        self.add_episode(index, start_time);
        self
    }

    /// Declare a stream in an episode. The episode is created if missing.
    pub fn with_stream(mut self, index: u64, key: &str, shape: StreamShape) -> Self {
        self.add_stream(index, key, shape);
        self
    }

    /// Append one sample. The episode and stream must already be declared.
    pub fn with_sample(mut self, index: u64, key: &str, timestamp: u64, payload: Payload) -> Self {
        self.push_sample(index, key, timestamp, payload);
        self
    }

    /// Add an empty episode.
    pub fn add_episode(&mut self, index: u64, start_time: u64) {
        self.insert_episode(EpisodeMetadata::new(index, start_time));
    }

    /// Add an empty episode without an absolute start.
    ///
    /// Its sample timestamps are episode-relative; the engine places it after
    /// the episodes written before it.
    pub fn add_relative_episode(&mut self, index: u64) {
        self.insert_episode(EpisodeMetadata::relative(index));
    }

    fn insert_episode(&mut self, metadata: EpisodeMetadata) {
        let rate_hint = self.info.fps;
        self.episodes.entry(metadata.index).or_insert_with(|| Episode {
            metadata: EpisodeMetadata {
                rate_hint,
                ..metadata
            },
            samples: BTreeMap::new(),
        });
    }

    /// Declare a stream in an episode.
    pub fn add_stream(&mut self, index: u64, key: &str, shape: StreamShape) {
        self.add_episode(index, 0);
        if let Some(episode) = self.episodes.get_mut(&index) {
            episode.metadata.streams.insert(key.to_string(), shape);
            episode.samples.entry(key.to_string()).or_default();
        }
    }

    /// Append one sample. Unknown episodes or streams are ignored.
    pub fn push_sample(&mut self, index: u64, key: &str, timestamp: u64, payload: Payload) {
        if let Some(samples) = self
            .episodes
            .get_mut(&index)
            .and_then(|episode| episode.samples.get_mut(key))
        {
            samples.push(SourceSample::new(timestamp, payload));
        }
    }

    /// Number of episodes.
    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    /// Whether there are no episodes.
    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    fn episode(&self, index: u64) -> Result<&Episode> {
        self.episodes
            .get(&index)
            .ok_or_else(|| ConvertError::source(Some(index), None, "no such episode"))
    }
}

impl DatasetSource for InMemoryDataset {
    fn episode_indices(&self) -> Result<Vec<u64>> {
        Ok(self.episodes.keys().copied().collect())
    }

    fn episode_metadata(&self, index: u64) -> Result<EpisodeMetadata> {
        Ok(self.episode(index)?.metadata.clone())
    }

    fn stream_records(&self, index: u64, stream_key: &str) -> Result<Vec<SourceSample>> {
        self.episode(index)?
            .samples
            .get(stream_key)
            .cloned()
            .ok_or_else(|| ConvertError::source(Some(index), Some(stream_key), "no such stream"))
    }

    fn dataset_info(&self) -> DatasetInfo {
        self.info.clone()
    }
}
