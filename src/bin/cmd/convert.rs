// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Convert command - turn a downloaded dataset into MCAP.

use std::path::PathBuf;

use clap::Args;

use crate::common::{format_duration, resolve_dataset_dir, ProgressBar, Result};
use indicatif::HumanBytes;
use lerobot2mcap::convert::{
    parse_byte_size, ConversionEngine, ConvertConfig, ConvertConfigBuilder, OutputLayout,
};
use lerobot2mcap::dataset::LocalDataset;
use lerobot2mcap::io::StreamFilter;
use lerobot2mcap::types::Compression;

/// Convert a dataset to MCAP.
#[derive(Args, Clone, Debug)]
pub struct ConvertCmd {
    /// Dataset directory, or a dataset id under ./data
    #[arg(value_name = "DATASET")]
    input: String,

    /// Output directory (default: <DATASET>/mcap)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Episodes to convert (default: all)
    #[arg(short, long, num_args = 1..)]
    episodes: Vec<u64>,

    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Chunk codec: none, lz4 (fast) or zstd (high-ratio)
    #[arg(long)]
    compression: Option<Compression>,

    /// Zstandard level (1-22)
    #[arg(long)]
    zstd_level: Option<i32>,

    /// Maximum uncompressed chunk size (e.g. 4MiB)
    #[arg(long, value_parser = parse_chunk_size)]
    chunk_size: Option<usize>,

    /// Maximum messages per chunk
    #[arg(long)]
    max_messages: Option<usize>,

    /// Output layout: single or per-episode
    #[arg(long)]
    layout: Option<OutputLayout>,

    /// Prefix prepended to every topic
    #[arg(long)]
    topic_prefix: Option<String>,

    /// Streams to convert (comma separated)
    #[arg(long, value_delimiter = ',')]
    include: Vec<String>,

    /// Streams to skip (comma separated)
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Only convert streams whose key matches this regex
    #[arg(long, conflicts_with_all = ["include", "exclude"])]
    streams_matching: Option<String>,

    /// Threads used to read streams
    #[arg(short = 'j', long)]
    threads: Option<usize>,
}

fn parse_chunk_size(text: &str) -> std::result::Result<usize, String> {
    parse_byte_size(text).map_err(|e| e.to_string())
}

impl ConvertCmd {
    fn build_config(&self) -> Result<ConvertConfig> {
        let base = match &self.config {
            Some(path) => ConvertConfig::load(path)?,
            None => ConvertConfig::default(),
        };

        let mut builder = ConvertConfigBuilder::from_config(base);
        if let Some(compression) = self.compression {
            builder = builder.compression(compression);
        }
        if let Some(level) = self.zstd_level {
            builder = builder.zstd_level(level);
        }
        if let Some(bytes) = self.chunk_size {
            builder = builder.max_chunk_bytes(bytes);
        }
        if let Some(count) = self.max_messages {
            builder = builder.max_chunk_messages(count);
        }
        if let Some(layout) = self.layout {
            builder = builder.layout(layout);
        }
        if let Some(prefix) = &self.topic_prefix {
            builder = builder.topic_prefix(prefix.clone());
        }
        if !self.include.is_empty() {
            builder = builder.include_streams(self.include.iter().cloned());
        }
        if !self.exclude.is_empty() {
            builder = builder.exclude_streams(self.exclude.iter().cloned());
        }
        if !self.episodes.is_empty() {
            builder = builder.episodes(self.episodes.clone());
        }
        if let Some(threads) = self.threads {
            builder = builder.decode_threads(threads);
        }
        Ok(builder.build()?)
    }

    pub fn run(self) -> Result<()> {
        let input_dir = resolve_dataset_dir(&self.input);
        let output_dir = self
            .output_dir
            .clone()
            .unwrap_or_else(|| input_dir.join("mcap"));
        let config = self.build_config()?;

        println!("Converting: {}", input_dir.display());
        println!("  Output: {}", output_dir.display());
        println!("  Layout: {}", config.layout);
        println!("  Compression: {}", config.chunk.compression);

        let dataset = LocalDataset::open(&input_dir)?;
        let mut engine = ConversionEngine::new(dataset, config)?;
        if let Some(pattern) = &self.streams_matching {
            engine = engine.with_filter(StreamFilter::regex_include(pattern)?);
        }

        let total = engine.episodes()?.len();
        println!("  Episodes: {}", total);

        let progress = ProgressBar::new(total as u64, "convert");
        let bar = progress.clone();
        let engine = engine.on_episode(move |summary| {
            bar.inc(format!(
                "episode {} ({} messages)",
                summary.episode_index, summary.message_count
            ));
        });

        let stats = engine.convert(&output_dir)?;
        progress.finish_with_message("done".to_string());

        println!();
        if stats.aborted {
            println!("Conversion aborted; containers were finalized");
        }
        println!(
            "Wrote {} messages from {} episodes in {} chunks ({}) in {}",
            stats.messages,
            stats.episodes,
            stats.chunks,
            HumanBytes(stats.bytes_written),
            format_duration(stats.elapsed.as_nanos() as u64)
        );
        for (topic, count) in &stats.channel_messages {
            println!("  {topic}: {count}");
        }
        for path in &stats.outputs {
            println!("  -> {}", path.display());
        }

        Ok(())
    }
}
