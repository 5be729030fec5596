// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # lerobot2mcap
//!
//! Converts episodic robot datasets (joint/action vectors plus camera
//! frames, organized into episodes) into one chunked, indexed, CRC-checked
//! MCAP container for timeline playback and seeking.
//!
//! ## Architecture
//!
//! - `core/` - Error taxonomy, stream shapes, run-scoped schema/channel registries
//! - `dataset/` - [`DatasetSource`](dataset::DatasetSource) and its implementations
//! - `timeline/` - K-way merge of one episode's streams
//! - `encoding/` - CDR payload encoding and `ros2msg` schema generation
//! - `io/formats/mcap/` - Chunk writer, container assembler, container reader
//! - `convert/` - Configuration and the conversion engine
//!
//! ## Example: Converting a local dataset
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use lerobot2mcap::convert::{ConversionEngine, ConvertConfigBuilder};
//! use lerobot2mcap::dataset::LocalDataset;
//! use lerobot2mcap::types::Compression;
//!
//! let config = ConvertConfigBuilder::new()
//!     .compression(Compression::Lz4)
//!     .build()?;
//! let engine = ConversionEngine::new(LocalDataset::open("data/lerobot/pusht")?, config)?;
//! let stats = engine.convert("data/lerobot/pusht/mcap")?;
//! println!("{} episodes, {} messages", stats.episodes, stats.messages);
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: Reading a container
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use lerobot2mcap::io::formats::mcap::ContainerReader;
//!
//! let reader = ContainerReader::open("data/lerobot/pusht/mcap/lerobot_pusht.mcap")?;
//! for channel in reader.summary().channels.values() {
//!     println!("{} ({})", channel.topic, channel.message_encoding);
//! }
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

// Re-export core types for convenience
pub use core::{ConvertError, Payload, PixelFormat, Result, RunContext, ScalarType, StreamShape};

// Dataset sources
pub mod dataset;

// Per-episode merge
pub mod timeline;

// Payload and schema encoding
pub mod encoding;

// Pipeline types (records, chunks)
pub mod types;

// Container I/O
pub mod io;

// Conversion engine and configuration
pub mod convert;

pub use convert::{AbortHandle, ConversionEngine, ConvertConfig, ConvertConfigBuilder, ConvertStats};
pub use dataset::{DatasetSource, HubClient, InMemoryDataset, LocalDataset};
pub use io::formats::mcap::{ContainerAssembler, ContainerReader};
pub use timeline::TimelineMerger;
