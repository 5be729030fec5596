// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Tests for reading exported dataset directories.

mod common;

use std::fs;

use common::{fake_png, LocalFixture};
use lerobot2mcap::dataset::{DatasetSource, LocalDataset};
use lerobot2mcap::io::{EpisodeSummary, EPISODE_METADATA_NAME};
use lerobot2mcap::types::Compression;
use lerobot2mcap::{
    ContainerReader, ConversionEngine, ConvertConfigBuilder, Payload, PixelFormat, ScalarType,
    StreamShape,
};

const SECOND: u64 = 1_000_000_000;

#[test]
fn test_open_reads_info_and_episodes() {
    let fixture = LocalFixture::new(2, 3);
    let dataset = LocalDataset::open(fixture.root()).unwrap();

    assert_eq!(dataset.episode_indices().unwrap(), vec![0, 1]);
    let info = dataset.dataset_info();
    assert_eq!(info.name, "lerobot/test");
    assert_eq!(info.fps, Some(10.0));
    assert_eq!(info.robot_type.as_deref(), Some("test_arm"));
    assert_eq!(
        dataset.data_file(1).unwrap(),
        fixture.root().join("data/chunk-000/episode_000001.jsonl")
    );
}

#[test]
fn test_episode_metadata_streams() {
    let fixture = LocalFixture::new(2, 3);
    let dataset = LocalDataset::open(fixture.root()).unwrap();
    let episode = dataset.episode_metadata(1).unwrap();

    assert_eq!(episode.index, 1);
    assert_eq!(episode.start_time, 100 * SECOND);
    assert!(!episode.relative_time);
    assert_eq!(episode.rate_hint, Some(10.0));

    let keys: Vec<&str> = episode.streams.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["action", "observation.images.top", "observation.state"]
    );
    assert_eq!(
        episode.streams["observation.state"],
        StreamShape::named_vector(ScalarType::Float32, vec!["x".into(), "y".into()])
    );
    assert_eq!(
        episode.streams["action"],
        StreamShape::vector(ScalarType::Float32, 2)
    );
    assert_eq!(
        episode.streams["observation.images.top"],
        StreamShape::image(2, 2, 3, PixelFormat::Png)
    );
}

#[test]
fn test_numeric_stream_records() {
    let fixture = LocalFixture::new(2, 3);
    let dataset = LocalDataset::open(fixture.root()).unwrap();
    let samples = dataset.stream_records(1, "observation.state").unwrap();

    let got: Vec<(u64, Payload)> = samples
        .into_iter()
        .map(|s| (s.timestamp, s.payload))
        .collect();
    let start = 100 * SECOND;
    assert_eq!(
        got,
        vec![
            (start, Payload::Numeric(vec![0.0, 1.0])),
            (start + SECOND / 10, Payload::Numeric(vec![1.0, 1.0])),
            (start + 2 * SECOND / 10, Payload::Numeric(vec![2.0, 1.0])),
        ]
    );
}

#[test]
fn test_image_stream_records_pass_frames_through() {
    let fixture = LocalFixture::new(1, 4);
    let dataset = LocalDataset::open(fixture.root()).unwrap();
    let samples = dataset.stream_records(0, "observation.images.top").unwrap();

    assert_eq!(samples.len(), 4);
    for (frame, sample) in samples.iter().enumerate() {
        match &sample.payload {
            Payload::Image {
                width,
                height,
                pixel_format,
                data,
            } => {
                assert_eq!((*width, *height), (2, 2));
                assert_eq!(*pixel_format, PixelFormat::Png);
                assert_eq!(data, &fake_png(0, frame as u64));
            }
            other => panic!("expected image payload, got {other:?}"),
        }
    }
}

#[test]
fn test_missing_episodes_file_scans_data_dir() {
    let fixture = LocalFixture::new(3, 2);
    fs::remove_file(fixture.root().join("meta/episodes.jsonl")).unwrap();

    let dataset = LocalDataset::open(fixture.root()).unwrap();
    assert_eq!(dataset.episode_indices().unwrap(), vec![0, 1, 2]);
    let episode = dataset.episode_metadata(2).unwrap();
    assert_eq!(episode.start_time, 0);
    assert!(episode.relative_time);
}

#[test]
fn test_missing_frame_is_a_source_error() {
    let fixture = LocalFixture::new(1, 3);
    fs::remove_file(
        fixture
            .root()
            .join("images/observation.images.top/episode_000000/frame_000001.png"),
    )
    .unwrap();

    let dataset = LocalDataset::open(fixture.root()).unwrap();
    let err = dataset
        .stream_records(0, "observation.images.top")
        .unwrap_err();
    assert!(err.is_source_error());
    // the numeric streams of the same episode are unaffected
    assert_eq!(dataset.stream_records(0, "action").unwrap().len(), 3);
}

#[test]
fn test_unknown_episode_and_stream() {
    let fixture = LocalFixture::new(1, 2);
    let dataset = LocalDataset::open(fixture.root()).unwrap();
    assert!(dataset.episode_metadata(9).unwrap_err().is_source_error());
    assert!(dataset
        .stream_records(0, "observation.velocity")
        .unwrap_err()
        .is_source_error());
}

#[test]
fn test_open_without_info_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = LocalDataset::open(dir.path()).unwrap_err();
    assert!(err.is_source_error());
}

#[test]
fn test_convert_local_dataset() {
    let fixture = LocalFixture::new(2, 5);
    let output = fixture.scratch("out");
    let config = ConvertConfigBuilder::new()
        .max_chunk_messages(4)
        .compression(Compression::Zstd)
        .build()
        .unwrap();

    let engine = ConversionEngine::new(LocalDataset::open(fixture.root()).unwrap(), config).unwrap();
    let stats = engine.convert(&output).unwrap();
    assert_eq!(stats.outputs, vec![output.join("lerobot_test.mcap")]);
    assert_eq!(stats.messages, 30);

    let reader = ContainerReader::open(&stats.outputs[0]).unwrap();
    let topics: Vec<&str> = reader
        .summary()
        .channels
        .values()
        .map(|c| c.topic.as_str())
        .collect();
    assert_eq!(
        topics,
        vec!["/action", "/observation/images/top", "/observation/state"]
    );

    let statistics = reader.statistics();
    assert_eq!(statistics.message_count, 30);
    assert_eq!(statistics.message_start_time, 0);
    assert_eq!(statistics.message_end_time, 100 * SECOND + 4 * SECOND / 10);

    let camera = reader
        .summary()
        .channels
        .values()
        .find(|c| c.topic == "/observation/images/top")
        .unwrap();
    assert_eq!(camera.metadata["stream_key"], "observation.images.top");
}

// ============================================================================
// Parquet data files
// ============================================================================

#[test]
fn test_parquet_episode_metadata() {
    let fixture = LocalFixture::parquet(2, 3);
    let dataset = LocalDataset::open(fixture.root()).unwrap();

    assert_eq!(dataset.episode_indices().unwrap(), vec![0, 1]);
    assert_eq!(
        dataset.data_file(1).unwrap(),
        fixture.root().join("data/chunk-000/episode_000001.parquet")
    );

    let episode = dataset.episode_metadata(1).unwrap();
    assert!(episode.relative_time);
    assert_eq!(episode.start_time, 0);
    // the video feature has no extracted frames and is left out
    let keys: Vec<&str> = episode.streams.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["action", "observation.images.top", "observation.state"]
    );
    assert_eq!(
        episode.streams["observation.images.top"],
        StreamShape::image(2, 2, 3, PixelFormat::Png)
    );
}

#[test]
fn test_parquet_numeric_records() {
    let fixture = LocalFixture::parquet(2, 3);
    let dataset = LocalDataset::open(fixture.root()).unwrap();
    let samples = dataset.stream_records(1, "observation.state").unwrap();

    let got: Vec<(u64, Payload)> = samples
        .into_iter()
        .map(|s| (s.timestamp, s.payload))
        .collect();
    assert_eq!(
        got,
        vec![
            (0, Payload::Numeric(vec![0.0, 1.0])),
            (SECOND / 10, Payload::Numeric(vec![1.0, 1.0])),
            (2 * SECOND / 10, Payload::Numeric(vec![2.0, 1.0])),
        ]
    );
}

#[test]
fn test_parquet_inline_images() {
    let fixture = LocalFixture::parquet(1, 3);
    let dataset = LocalDataset::open(fixture.root()).unwrap();
    let samples = dataset.stream_records(0, "observation.images.top").unwrap();

    assert_eq!(samples.len(), 3);
    for (frame, sample) in samples.iter().enumerate() {
        match &sample.payload {
            Payload::Image {
                pixel_format, data, ..
            } => {
                assert_eq!(*pixel_format, PixelFormat::Png);
                assert_eq!(data, &fake_png(0, frame as u64));
            }
            other => panic!("expected image payload, got {other:?}"),
        }
    }
}

#[test]
fn test_parquet_scan_without_episodes_file() {
    let fixture = LocalFixture::parquet(3, 2);
    fs::remove_file(fixture.root().join("meta/episodes.jsonl")).unwrap();
    let dataset = LocalDataset::open(fixture.root()).unwrap();
    assert_eq!(dataset.episode_indices().unwrap(), vec![0, 1, 2]);
}

#[test]
fn test_corrupt_parquet_is_a_parse_error() {
    let fixture = LocalFixture::parquet(1, 2);
    fs::write(
        fixture.root().join("data/chunk-000/episode_000000.parquet"),
        b"not parquet",
    )
    .unwrap();
    let dataset = LocalDataset::open(fixture.root()).unwrap();
    let err = dataset.stream_records(0, "action").unwrap_err();
    assert!(!err.is_source_error());
    assert!(err.to_string().contains("episode_000000.parquet"));
}

#[test]
fn test_convert_parquet_places_episodes_in_sequence() {
    let fixture = LocalFixture::parquet(3, 4);
    let output = fixture.scratch("out");
    let config = ConvertConfigBuilder::new()
        .max_chunk_messages(5)
        .compression(Compression::Lz4)
        .build()
        .unwrap();

    let engine = ConversionEngine::new(LocalDataset::open(fixture.root()).unwrap(), config).unwrap();
    let stats = engine.convert(&output).unwrap();
    assert_eq!(stats.messages, 36);

    let reader = ContainerReader::open(&stats.outputs[0]).unwrap();
    let chunks = &reader.summary().chunk_indexes;
    assert!(chunks.len() > 3);
    for pair in chunks.windows(2) {
        assert!(
            pair[0].message_start_time <= pair[1].message_start_time,
            "chunk starts go back in time: {} then {}",
            pair[0].message_start_time,
            pair[1].message_start_time
        );
    }

    // 4 frames at 10 fps: 0.0..0.3 s, next episode one frame later
    let offsets: Vec<u64> = reader
        .metadata()
        .unwrap()
        .iter()
        .filter(|m| m.name == EPISODE_METADATA_NAME)
        .map(|m| EpisodeSummary::from_metadata(&m.metadata).unwrap().time_offset)
        .collect();
    assert_eq!(offsets, vec![0, 4 * SECOND / 10, 8 * SECOND / 10]);

    let statistics = reader.statistics();
    assert_eq!(statistics.message_start_time, 0);
    assert_eq!(statistics.message_end_time, 11 * SECOND / 10);
}
