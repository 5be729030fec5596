// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Dataset sources.
//!
//! The conversion engine reads episodes only through [`DatasetSource`].
//!
//! - [`InMemoryDataset`] - builder-populated source
//! - [`LocalDataset`] - exported dataset directory on disk
//! - [`HubClient`] - download a dataset into a local directory

mod columnar;
pub mod hub;
pub mod local;
pub mod memory;

pub use hub::{default_download_dir, DownloadStats, HubClient, RemoteFile, DEFAULT_ENDPOINT};
pub use local::{DatasetLayout, FeatureSpec, LocalDataset};
pub use memory::InMemoryDataset;

use crate::core::Result;
use crate::types::{DatasetInfo, EpisodeMetadata, SourceSample};

/// Trait for episodic datasets the engine can convert.
///
/// Implementations must be shareable across threads: per-stream reads of
/// one episode run concurrently on the engine's decode pool. The engine
/// never mutates the source.
///
/// # Example
///
/// ```no_run
/// use lerobot2mcap::dataset::{DatasetSource, LocalDataset};
///
/// # fn main() -> lerobot2mcap::Result<()> {
/// let dataset = LocalDataset::open("data/lerobot/pusht")?;
/// for index in dataset.episode_indices()? {
///     let episode = dataset.episode_metadata(index)?;
///     println!("episode {index}: {} streams", episode.streams.len());
/// }
/// # Ok(())
/// # }
/// ```
pub trait DatasetSource: Send + Sync {
    /// Indices of all episodes, in conversion order.
    fn episode_indices(&self) -> Result<Vec<u64>>;

    /// Description of one episode.
    fn episode_metadata(&self, index: u64) -> Result<EpisodeMetadata>;

    /// All samples of one stream of one episode, ordered by timestamp.
    fn stream_records(&self, index: u64, stream_key: &str) -> Result<Vec<SourceSample>>;

    /// Dataset-level description.
    fn dataset_info(&self) -> DatasetInfo {
        DatasetInfo::default()
    }
}

impl<T: DatasetSource + ?Sized> DatasetSource for &T {
    fn episode_indices(&self) -> Result<Vec<u64>> {
        (**self).episode_indices()
    }

    fn episode_metadata(&self, index: u64) -> Result<EpisodeMetadata> {
        (**self).episode_metadata(index)
    }

    fn stream_records(&self, index: u64, stream_key: &str) -> Result<Vec<SourceSample>> {
        (**self).stream_records(index, stream_key)
    }

    fn dataset_info(&self) -> DatasetInfo {
        (**self).dataset_info()
    }
}

impl<T: DatasetSource + ?Sized> DatasetSource for Box<T> {
    fn episode_indices(&self) -> Result<Vec<u64>> {
        (**self).episode_indices()
    }

    fn episode_metadata(&self, index: u64) -> Result<EpisodeMetadata> {
        (**self).episode_metadata(index)
    }

    fn stream_records(&self, index: u64, stream_key: &str) -> Result<Vec<SourceSample>> {
        (**self).stream_records(index, stream_key)
    }

    fn dataset_info(&self) -> DatasetInfo {
        (**self).dataset_info()
    }
}
