// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! I/O layer for the output container.
//!
//! - [`formats`] - MCAP writing and reading
//! - [`metadata`] - Contents of episode and dataset Metadata records
//! - [`filter`] - Stream selection

pub mod filter;
pub mod formats;
pub mod metadata;

pub use filter::StreamFilter;
pub use formats::mcap::{ContainerAssembler, ContainerReader};
pub use metadata::{
    dataset_metadata, EpisodeSummary, DATASET_METADATA_NAME, EPISODE_METADATA_NAME,
};
