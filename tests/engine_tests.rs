// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! End-to-end conversion tests writing containers to disk.

mod common;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use common::{long_dataset, scenario_dataset};
use lerobot2mcap::convert::{convert_dataset, OutputLayout};
use lerobot2mcap::io::{EpisodeSummary, DATASET_METADATA_NAME, EPISODE_METADATA_NAME};
use lerobot2mcap::types::Compression;
use lerobot2mcap::{ContainerReader, ConversionEngine, ConvertConfig, ConvertConfigBuilder};

fn config(max_messages: usize, compression: Compression) -> ConvertConfig {
    ConvertConfigBuilder::new()
        .max_chunk_messages(max_messages)
        .compression(compression)
        .decode_threads(2)
        .build()
        .unwrap()
}

// ============================================================================
// Single layout
// ============================================================================

#[test]
fn test_single_layout_writes_named_container() {
    let dir = tempfile::tempdir().unwrap();
    let stats = convert_dataset(scenario_dataset(), config(3, Compression::Zstd), dir.path()).unwrap();

    let expected = dir.path().join("test_scenario.mcap");
    assert_eq!(stats.outputs, vec![expected.clone()]);
    assert_eq!(stats.episodes, 2);
    assert_eq!(stats.messages, 7);
    assert_eq!(
        std::fs::metadata(&expected).unwrap().len(),
        stats.bytes_written
    );

    let reader = ContainerReader::open(&expected).unwrap();
    let statistics = reader.statistics();
    assert_eq!(statistics.message_count, 7);
    assert_eq!(statistics.channel_count, 2);
    assert_eq!(statistics.schema_count, 2);
    assert_eq!(statistics.message_start_time, 0);
    assert_eq!(statistics.message_end_time, 20);
    assert!(statistics.chunk_count >= 3);
    assert_eq!(reader.header().profile, "ros2");
    assert!(reader.header().library.starts_with("lerobot2mcap"));
}

#[test]
fn test_output_name_override() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConvertConfigBuilder::from_config(config(10, Compression::Lz4))
        .output_name("run")
        .build()
        .unwrap();
    let stats = convert_dataset(scenario_dataset(), config, dir.path()).unwrap();
    assert_eq!(stats.outputs, vec![dir.path().join("run.mcap")]);
    assert!(ContainerReader::open(dir.path().join("run.mcap")).is_ok());
}

#[test]
fn test_episode_metadata_follows_source_order() {
    let dir = tempfile::tempdir().unwrap();
    let stats = convert_dataset(long_dataset(3, 4), config(100, Compression::None), dir.path()).unwrap();

    let reader = ContainerReader::open(&stats.outputs[0]).unwrap();
    let metadata = reader.metadata().unwrap();
    let episodes: Vec<EpisodeSummary> = metadata
        .iter()
        .filter(|m| m.name == EPISODE_METADATA_NAME)
        .map(|m| EpisodeSummary::from_metadata(&m.metadata).unwrap())
        .collect();

    let indices: Vec<u64> = episodes.iter().map(|e| e.episode_index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    for episode in &episodes {
        let start = episode.episode_index * 1_000_000_000;
        assert_eq!(episode.start_time, start);
        assert_eq!(episode.end_time, start + 300_000_000);
        assert_eq!(episode.message_count, 4);
    }

    let dataset = metadata
        .iter()
        .find(|m| m.name == DATASET_METADATA_NAME)
        .unwrap();
    assert_eq!(dataset.metadata["name"], "test/long");
    assert_eq!(dataset.metadata["episode_count"], "3");
}

// ============================================================================
// Chunk bounds
// ============================================================================

#[test]
fn test_chunks_respect_message_limit() {
    let dir = tempfile::tempdir().unwrap();
    let stats = convert_dataset(long_dataset(2, 50), config(8, Compression::Zstd), dir.path()).unwrap();
    assert_eq!(stats.messages, 100);

    let reader = ContainerReader::open(&stats.outputs[0]).unwrap();
    let mut total = 0;
    for chunk in &reader.summary().chunk_indexes {
        let count: usize = reader.chunk_message_counts(chunk).unwrap().values().sum();
        assert!(count > 0);
        assert!(count <= 8, "chunk holds {count} messages");
        total += count;
    }
    assert_eq!(total, 100);
    assert_eq!(reader.statistics().chunk_count as u64, stats.chunks);
}

#[test]
fn test_chunks_respect_byte_limit() {
    // 2 x float64 per message: 20 bytes of CDR, 51 bytes as a Message record
    let config = ConvertConfigBuilder::new()
        .max_chunk_bytes(200)
        .compression(Compression::Lz4)
        .build()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let stats = convert_dataset(long_dataset(1, 20), config, dir.path()).unwrap();

    let reader = ContainerReader::open(&stats.outputs[0]).unwrap();
    let chunks = &reader.summary().chunk_indexes;
    assert_eq!(chunks.len(), 7);
    for chunk in chunks {
        assert!(chunk.uncompressed_size <= 200);
        assert_eq!(chunk.compression, "lz4");
    }
    assert_eq!(reader.messages().count(), 20);
}

#[test]
fn test_chunk_time_ranges_are_ordered() {
    let dir = tempfile::tempdir().unwrap();
    let stats = convert_dataset(long_dataset(3, 10), config(4, Compression::None), dir.path()).unwrap();

    let reader = ContainerReader::open(&stats.outputs[0]).unwrap();
    let chunks = &reader.summary().chunk_indexes;
    for pair in chunks.windows(2) {
        assert!(pair[0].chunk_start_offset < pair[1].chunk_start_offset);
        assert!(pair[0].message_end_time <= pair[1].message_start_time);
    }
    for chunk in chunks {
        assert!(chunk.message_start_time <= chunk.message_end_time);
        assert_eq!(chunk.compression, "");
    }
}

// ============================================================================
// Per-episode layout
// ============================================================================

#[test]
fn test_per_episode_layout() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConvertConfigBuilder::from_config(config(100, Compression::Zstd))
        .layout(OutputLayout::PerEpisode)
        .build()
        .unwrap();
    let stats = convert_dataset(long_dataset(3, 5), config, dir.path()).unwrap();

    let expected: Vec<_> = (0..3)
        .map(|i| dir.path().join(format!("episode_{i:06}.mcap")))
        .collect();
    assert_eq!(stats.outputs, expected);
    assert_eq!(stats.messages, 15);

    for path in &expected {
        let reader = ContainerReader::open(path).unwrap();
        let summary = reader.summary();
        assert_eq!(summary.schemas.len(), 1);
        assert_eq!(summary.channels.len(), 1);
        // every file starts from fresh registries
        assert!(summary.schemas.contains_key(&1));
        assert!(summary.channels.contains_key(&0));
        assert_eq!(reader.statistics().message_count, 5);

        let metadata = reader.metadata().unwrap();
        let dataset = metadata
            .iter()
            .find(|m| m.name == DATASET_METADATA_NAME)
            .unwrap();
        assert_eq!(dataset.metadata["episode_count"], "1");
        assert_eq!(dataset.metadata["complete"], "true");
    }
}

#[test]
fn test_per_episode_abort_stops_between_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConvertConfigBuilder::from_config(config(100, Compression::None))
        .layout(OutputLayout::PerEpisode)
        .build()
        .unwrap();

    let engine = ConversionEngine::new(long_dataset(4, 3), config).unwrap();
    let abort = engine.abort_handle();
    let seen = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&seen);
    let engine = engine.on_episode(move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) == 1 {
            abort.abort();
        }
    });

    let stats = engine.convert(dir.path()).unwrap();
    assert!(stats.aborted);
    assert_eq!(stats.episodes, 2);
    assert_eq!(stats.outputs.len(), 2);
    assert_eq!(seen.load(Ordering::SeqCst), 2);
    assert!(!dir.path().join("episode_000002.mcap").exists());
    for path in &stats.outputs {
        assert!(ContainerReader::open(path).is_ok());
    }
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_missing_episode_fails_but_container_is_closed() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConvertConfigBuilder::from_config(config(100, Compression::None))
        .episodes(vec![0, 7])
        .build()
        .unwrap();
    let err = convert_dataset(scenario_dataset(), config, dir.path()).unwrap_err();
    assert!(err.is_source_error());

    let reader = ContainerReader::open(dir.path().join("test_scenario.mcap")).unwrap();
    assert_eq!(reader.statistics().message_count, 5);
    let metadata = reader.metadata().unwrap();
    let dataset = metadata
        .iter()
        .find(|m| m.name == DATASET_METADATA_NAME)
        .unwrap();
    assert_eq!(dataset.metadata["complete"], "false");
}

#[test]
fn test_invalid_config_rejected_before_writing() {
    let mut config = ConvertConfig::default();
    config.chunk.max_messages = 0;
    assert!(ConversionEngine::new(scenario_dataset(), config).is_err());
}
