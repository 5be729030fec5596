// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Conversion configuration.
//!
//! A [`ConvertConfig`] can be loaded from TOML or assembled with
//! [`ConvertConfigBuilder`]:
//!
//! ```toml
//! topic_prefix = "/robot"
//! layout = "per-episode"
//! decode_threads = 4
//! exclude_streams = ["observation.images.wrist"]
//!
//! [chunk]
//! max_uncompressed_bytes = 1048576
//! max_messages = 10000
//! compression = "lz4"
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{ConvertError, Result};
use crate::io::formats::mcap::constants::PROFILE;
use crate::io::StreamFilter;
use crate::types::{ChunkConfig, Compression};

/// How episodes are distributed over output files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputLayout {
    /// One container for the whole run
    #[default]
    Single,
    /// One container per episode, each with its own registries
    PerEpisode,
}

impl fmt::Display for OutputLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputLayout::Single => "single",
            OutputLayout::PerEpisode => "per-episode",
        })
    }
}

impl FromStr for OutputLayout {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Ok(OutputLayout::Single),
            "per-episode" | "per_episode" | "episode" => Ok(OutputLayout::PerEpisode),
            other => Err(ConvertError::parse(
                "OutputLayout",
                format!("unknown layout '{other}' (expected single or per-episode)"),
            )),
        }
    }
}

/// Settings of one conversion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    /// Chunk bounds and codec
    pub chunk: ChunkConfig,
    /// Prefix prepended to every topic
    pub topic_prefix: String,
    /// Output file layout
    pub layout: OutputLayout,
    /// Threads for per-stream source reads (`None` = one per core)
    pub decode_threads: Option<usize>,
    /// Streams to convert (empty = all)
    pub include_streams: Vec<String>,
    /// Streams to skip
    pub exclude_streams: Vec<String>,
    /// Episodes to convert (`None` = all, in source order)
    pub episodes: Option<Vec<u64>>,
    /// Header profile
    pub profile: String,
    /// File stem of the container in the single layout
    pub output_name: Option<String>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            chunk: ChunkConfig::default(),
            topic_prefix: "/".to_string(),
            layout: OutputLayout::Single,
            decode_threads: None,
            include_streams: Vec::new(),
            exclude_streams: Vec::new(),
            episodes: None,
            profile: PROFILE.to_string(),
            output_name: None,
        }
    }
}

impl ConvertConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| ConvertError::parse("config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ConvertError::parse("config", format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Check limits and names.
    pub fn validate(&self) -> Result<()> {
        if self.chunk.max_uncompressed_bytes == 0 {
            return Err(ConvertError::parse(
                "config",
                "chunk.max_uncompressed_bytes must be greater than 0",
            ));
        }
        if self.chunk.max_messages == 0 {
            return Err(ConvertError::parse(
                "config",
                "chunk.max_messages must be greater than 0",
            ));
        }
        if self.chunk.compression == Compression::Zstd && !(1..=22).contains(&self.chunk.zstd_level)
        {
            return Err(ConvertError::parse(
                "config",
                format!("chunk.zstd_level {} outside 1..=22", self.chunk.zstd_level),
            ));
        }
        if self.decode_threads == Some(0) {
            return Err(ConvertError::parse("config", "decode_threads must be at least 1"));
        }
        if let Some(name) = &self.output_name {
            if name.is_empty() || name.contains(['/', '\\']) {
                return Err(ConvertError::parse(
                    "config",
                    format!("output_name '{name}' is not a plain file name"),
                ));
            }
        }
        Ok(())
    }

    /// Topic for a stream key: the prefix plus the key with `.` as `/`.
    ///
    /// `observation.images.top` with prefix `/` becomes
    /// `/observation/images/top`.
    pub fn topic_for(&self, stream_key: &str) -> String {
        let path = stream_key.replace('.', "/");
        if self.topic_prefix.is_empty() {
            return path;
        }
        format!("{}/{path}", self.topic_prefix.trim_end_matches('/'))
    }

    /// Stream filter built from the include and exclude lists.
    pub fn stream_filter(&self) -> StreamFilter {
        StreamFilter::from_lists(&self.include_streams, &self.exclude_streams)
    }
}

/// Builder for [`ConvertConfig`].
#[derive(Debug, Clone, Default)]
pub struct ConvertConfigBuilder {
    config: ConvertConfig,
}

impl ConvertConfigBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: ConvertConfig) -> Self {
        Self { config }
    }

    /// Set the maximum uncompressed chunk size in bytes.
    pub fn max_chunk_bytes(mut self, bytes: usize) -> Self {
        self.config.chunk.max_uncompressed_bytes = bytes;
        self
    }

    /// Set the maximum messages per chunk.
    pub fn max_chunk_messages(mut self, count: usize) -> Self {
        self.config.chunk.max_messages = count;
        self
    }

    /// Set the chunk codec.
    pub fn compression(mut self, compression: Compression) -> Self {
        self.config.chunk.compression = compression;
        self
    }

    /// Set the Zstandard level (1-22).
    pub fn zstd_level(mut self, level: i32) -> Self {
        self.config.chunk.zstd_level = level;
        self
    }

    /// Set the topic prefix.
    pub fn topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.topic_prefix = prefix.into();
        self
    }

    /// Set the output layout.
    pub fn layout(mut self, layout: OutputLayout) -> Self {
        self.config.layout = layout;
        self
    }

    /// Set the number of decode threads.
    pub fn decode_threads(mut self, count: usize) -> Self {
        self.config.decode_threads = Some(count);
        self
    }

    /// Convert only these streams.
    pub fn include_streams<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.include_streams = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Skip these streams.
    pub fn exclude_streams<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.exclude_streams = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Convert only these episodes.
    pub fn episodes(mut self, episodes: Vec<u64>) -> Self {
        self.config.episodes = Some(episodes);
        self
    }

    /// Set the header profile.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config.profile = profile.into();
        self
    }

    /// Set the container file stem for the single layout.
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.config.output_name = Some(name.into());
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<ConvertConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Parse a byte size such as `4MiB`, `512 kB` or `1048576`.
pub fn parse_byte_size(text: &str) -> Result<usize> {
    use human_size::{Byte, SpecificSize};

    let text = text.trim();
    if let Ok(bytes) = text.parse::<usize>() {
        return Ok(bytes);
    }

    // human-size expects a space between value and unit
    let split = text
        .find(|c: char| c.is_ascii_alphabetic())
        .ok_or_else(|| ConvertError::parse("byte size", format!("invalid size '{text}'")))?;
    let normalized = format!("{} {}", text[..split].trim(), &text[split..]);

    let size: SpecificSize<Byte> = normalized
        .parse()
        .map_err(|e| ConvertError::parse("byte size", format!("invalid size '{text}': {e}")))?;
    let bytes = size.value();
    if !bytes.is_finite() || bytes < 0.0 || bytes > usize::MAX as f64 {
        return Err(ConvertError::parse("byte size", format!("size '{text}' out of range")));
    }
    Ok(bytes.round() as usize)
}
