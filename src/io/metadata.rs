// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Contents of the Metadata records written into a container.
//!
//! After each episode the engine writes an `episode` record so tools can
//! seek by episode through the summary's MetadataIndex. One `dataset`
//! record describing the whole run is written before the container is
//! finalized.

use std::collections::BTreeMap;

use crate::core::{ConvertError, Result};
use crate::types::DatasetInfo;

/// Metadata record name for per-episode records.
pub const EPISODE_METADATA_NAME: &str = "episode";

/// Metadata record name for the run description.
pub const DATASET_METADATA_NAME: &str = "dataset";

/// Time range and size of one converted episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeSummary {
    /// Episode index
    pub episode_index: u64,
    /// First log time in the episode (ns)
    pub start_time: u64,
    /// Last log time in the episode (ns)
    pub end_time: u64,
    /// Messages written for the episode
    pub message_count: u64,
    /// Shift added to the source timestamps (ns)
    ///
    /// Non-zero only for episodes whose source has no absolute start and
    /// which were placed after an earlier episode of the same container.
    pub time_offset: u64,
}

impl EpisodeSummary {
    /// Key/value form written into the Metadata record.
    pub fn to_metadata(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("episode_index".to_string(), self.episode_index.to_string()),
            ("start_time".to_string(), self.start_time.to_string()),
            ("end_time".to_string(), self.end_time.to_string()),
            ("message_count".to_string(), self.message_count.to_string()),
            ("time_offset".to_string(), self.time_offset.to_string()),
        ])
    }

    /// Parse the key/value form back.
    ///
    /// A missing `time_offset` reads as zero.
    pub fn from_metadata(metadata: &BTreeMap<String, String>) -> Result<Self> {
        let optional = |key: &str| -> Result<Option<u64>> {
            metadata
                .get(key)
                .map(|value| {
                    value.parse().map_err(|_| {
                        ConvertError::parse(
                            "episode metadata",
                            format!("'{key}' is not an integer: {value}"),
                        )
                    })
                })
                .transpose()
        };
        let field = |key: &str| -> Result<u64> {
            optional(key)?.ok_or_else(|| {
                ConvertError::parse("episode metadata", format!("missing key '{key}'"))
            })
        };

        Ok(Self {
            episode_index: field("episode_index")?,
            start_time: field("start_time")?,
            end_time: field("end_time")?,
            message_count: field("message_count")?,
            time_offset: optional("time_offset")?.unwrap_or(0),
        })
    }
}

/// Key/value form of the `dataset` Metadata record.
pub fn dataset_metadata(
    info: &DatasetInfo,
    episode_count: u64,
    aborted: bool,
) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    metadata.insert("name".to_string(), info.name.clone());
    metadata.insert("episode_count".to_string(), episode_count.to_string());
    metadata.insert("complete".to_string(), (!aborted).to_string());
    if let Some(fps) = info.fps {
        metadata.insert("fps".to_string(), fps.to_string());
    }
    if let Some(robot_type) = &info.robot_type {
        metadata.insert("robot_type".to_string(), robot_type.clone());
    }
    metadata
}
