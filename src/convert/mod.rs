// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Dataset to container conversion.
//!
//! - [`ConvertConfig`] / [`ConvertConfigBuilder`] - run settings
//! - [`ConversionEngine`] - drives sources through merge, encode and chunking
//! - [`AbortHandle`] - cooperative cancellation

pub mod config;
pub mod engine;

use std::path::Path;

pub use config::{parse_byte_size, ConvertConfig, ConvertConfigBuilder, OutputLayout};
pub use engine::{AbortHandle, ConversionEngine, ConvertStats};

use crate::core::Result;
use crate::dataset::DatasetSource;

/// Convert a source into `output_dir` with one call.
///
/// # Example
///
/// ```no_run
/// use lerobot2mcap::convert::{convert_dataset, ConvertConfig};
/// use lerobot2mcap::dataset::LocalDataset;
///
/// # fn main() -> lerobot2mcap::Result<()> {
/// let stats = convert_dataset(
///     LocalDataset::open("data/lerobot/pusht")?,
///     ConvertConfig::default(),
///     "data/lerobot/pusht/mcap",
/// )?;
/// assert!(!stats.aborted);
/// # Ok(())
/// # }
/// ```
pub fn convert_dataset<S, P>(source: S, config: ConvertConfig, output_dir: P) -> Result<ConvertStats>
where
    S: DatasetSource,
    P: AsRef<Path>,
{
    ConversionEngine::new(source, config)?.convert(output_dir)
}
