// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Inspect command - show header, channels, chunks and metadata of a container.

use std::path::PathBuf;

use clap::Subcommand;

use crate::common::{format_duration, format_timestamp, Result};
use indicatif::HumanBytes;
use lerobot2mcap::io::formats::mcap::ContainerReader;
use lerobot2mcap::io::{EpisodeSummary, DATASET_METADATA_NAME, EPISODE_METADATA_NAME};

/// Inspect an MCAP container.
#[derive(Subcommand, Clone, Debug)]
pub enum InspectCmd {
    /// Show header and summary statistics
    Info {
        /// Input MCAP file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// List channels with their message counts
    Channels {
        /// Input MCAP file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print the schema text of each channel
        #[arg(long)]
        schemas: bool,
    },

    /// List chunks with time ranges and sizes
    Chunks {
        /// Input MCAP file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show episode and dataset metadata
    Metadata {
        /// Input MCAP file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
}

impl InspectCmd {
    pub fn run(self) -> Result<()> {
        match self {
            InspectCmd::Info { input } => cmd_info(input),
            InspectCmd::Channels { input, schemas } => cmd_channels(input, schemas),
            InspectCmd::Chunks { input } => cmd_chunks(input),
            InspectCmd::Metadata { input } => cmd_metadata(input),
        }
    }
}

/// Cmd: Show file info
fn cmd_info(input: PathBuf) -> Result<()> {
    let reader = ContainerReader::open(&input)?;
    let stats = reader.statistics();
    let size = reader.bytes().len() as u64;

    println!("=== {} ===", input.display());
    println!("Profile: {}", reader.header().profile);
    println!("Library: {}", reader.header().library);
    println!("Size: {}", HumanBytes(size));
    println!("Schemas: {}", stats.schema_count);
    println!("Channels: {}", stats.channel_count);
    println!("Messages: {}", stats.message_count);
    println!("Chunks: {}", stats.chunk_count);
    println!("Metadata: {}", stats.metadata_count);

    if stats.message_count > 0 {
        println!("Start: {}", format_timestamp(stats.message_start_time));
        println!("End: {}", format_timestamp(stats.message_end_time));
        println!(
            "Duration: {}",
            format_duration(stats.message_end_time - stats.message_start_time)
        );
    }

    Ok(())
}

/// Cmd: List channels
fn cmd_channels(input: PathBuf, show_schemas: bool) -> Result<()> {
    let reader = ContainerReader::open(&input)?;
    let summary = reader.summary();
    let stats = reader.statistics();

    println!("=== Channels in {} ===", input.display());
    println!();

    for channel in summary.channels.values() {
        let schema = summary.schemas.get(&channel.schema_id);
        let count = stats
            .channel_message_counts
            .get(&channel.id)
            .copied()
            .unwrap_or(0);

        println!("[{}] {}", channel.id, channel.topic);
        println!(
            "  Type: {}",
            schema.map(|s| s.name.as_str()).unwrap_or("(unknown)")
        );
        println!("  Encoding: {}", channel.message_encoding);
        println!("  Messages: {}", count);
        for (key, value) in &channel.metadata {
            println!("  {}: {}", key, value);
        }

        if show_schemas {
            match schema {
                Some(schema) => {
                    println!("  Schema ({}):", schema.encoding);
                    for line in String::from_utf8_lossy(&schema.data).lines() {
                        println!("    {}", line);
                    }
                }
                None => println!("  (no schema available)"),
            }
        }
        println!();
    }

    Ok(())
}

/// Cmd: List chunks
fn cmd_chunks(input: PathBuf) -> Result<()> {
    let reader = ContainerReader::open(&input)?;
    let chunks = &reader.summary().chunk_indexes;

    println!("=== {} chunks in {} ===", chunks.len(), input.display());
    println!();
    println!(
        "{:>4}  {:>12}  {:>12}  {:>12}  {:>8}  {:>10}  {:>6}  codec",
        "#", "offset", "start", "end", "messages", "size", "ratio"
    );

    for (i, chunk) in chunks.iter().enumerate() {
        let messages: usize = reader.chunk_message_counts(chunk)?.values().sum();
        let ratio = if chunk.uncompressed_size > 0 {
            chunk.compressed_size as f64 / chunk.uncompressed_size as f64
        } else {
            1.0
        };
        let codec = if chunk.compression.is_empty() {
            "none"
        } else {
            chunk.compression.as_str()
        };
        println!(
            "{:>4}  {:>12}  {:>12}  {:>12}  {:>8}  {:>10}  {:>6.2}  {}",
            i,
            chunk.chunk_start_offset,
            format_timestamp(chunk.message_start_time),
            format_timestamp(chunk.message_end_time),
            messages,
            HumanBytes(chunk.compressed_size).to_string(),
            ratio,
            codec
        );
    }

    Ok(())
}

/// Cmd: Show metadata records
fn cmd_metadata(input: PathBuf) -> Result<()> {
    let reader = ContainerReader::open(&input)?;

    println!("=== Metadata in {} ===", input.display());
    println!();

    for record in reader.metadata()? {
        match record.name.as_str() {
            EPISODE_METADATA_NAME => {
                let episode = EpisodeSummary::from_metadata(&record.metadata)?;
                print!(
                    "Episode {}: {} messages, {} .. {}",
                    episode.episode_index,
                    episode.message_count,
                    format_timestamp(episode.start_time),
                    format_timestamp(episode.end_time)
                );
                if episode.time_offset > 0 {
                    print!(" (shifted by {})", format_duration(episode.time_offset));
                }
                println!();
            }
            DATASET_METADATA_NAME => {
                println!("Dataset:");
                for (key, value) in &record.metadata {
                    println!("  {}: {}", key, value);
                }
            }
            other => {
                println!("{}:", other);
                for (key, value) in &record.metadata {
                    println!("  {}: {}", key, value);
                }
            }
        }
    }

    Ok(())
}
