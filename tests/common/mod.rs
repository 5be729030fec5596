// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BinaryArray, Float32Array, Int64Array, ListArray, StringArray, StructArray,
};
use arrow::datatypes::{DataType, Field, Float32Type};
use arrow::record_batch::RecordBatch;
use lerobot2mcap::{InMemoryDataset, Payload, PixelFormat, ScalarType, StreamShape};
use parquet::arrow::ArrowWriter;
use tempfile::TempDir;

// ============================================================================
// In-memory fixtures
// ============================================================================

/// Two episodes: `state` at 0/10/20 and `camera` at 5/15 in episode 0,
/// `state` at 0/10 in episode 1.
pub fn scenario_dataset() -> InMemoryDataset {
    let state = StreamShape::vector(ScalarType::Float32, 2);
    let camera = StreamShape::image(2, 1, 1, PixelFormat::Mono8);

    let mut dataset = InMemoryDataset::new("test/scenario").with_fps(10.0);
    dataset.add_stream(0, "state", state.clone());
    dataset.add_stream(0, "camera", camera);
    dataset.add_stream(1, "state", state);
    for t in [0, 10, 20] {
        dataset.push_sample(0, "state", t, Payload::Numeric(vec![t as f64, 1.0]));
    }
    for t in [5, 15] {
        dataset.push_sample(0, "camera", t, mono_frame(t as u8));
    }
    for t in [0, 10] {
        dataset.push_sample(1, "state", t, Payload::Numeric(vec![t as f64, 2.0]));
    }
    dataset
}

/// A 2x1 grayscale frame.
pub fn mono_frame(value: u8) -> Payload {
    Payload::Image {
        width: 2,
        height: 1,
        pixel_format: PixelFormat::Mono8,
        data: vec![value, 255 - value],
    }
}

/// `episodes` episodes of `frames` frames each, one numeric stream.
pub fn long_dataset(episodes: u64, frames: u64) -> InMemoryDataset {
    let shape = StreamShape::named_vector(
        ScalarType::Float64,
        vec!["position".to_string(), "velocity".to_string()],
    );
    let mut dataset = InMemoryDataset::new("test/long");
    for episode in 0..episodes {
        let start = episode * 1_000_000_000;
        dataset.add_episode(episode, start);
        dataset.add_stream(episode, "observation.state", shape.clone());
        for frame in 0..frames {
            dataset.push_sample(
                episode,
                "observation.state",
                start + frame * 100_000_000,
                Payload::Numeric(vec![frame as f64, episode as f64]),
            );
        }
    }
    dataset
}

// ============================================================================
// On-disk fixtures
// ============================================================================

/// Bytes standing in for an encoded PNG frame. Frames are passed through
/// untouched, so they only need to be distinct.
pub fn fake_png(episode: u64, frame: u64) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G'];
    bytes.extend_from_slice(&episode.to_le_bytes());
    bytes.extend_from_slice(&frame.to_le_bytes());
    bytes
}

/// A dataset directory written into a temp dir.
///
/// Each episode has `frames` frames at 10 fps with `observation.state`,
/// `action` and a PNG camera stream `observation.images.top`.
pub struct LocalFixture {
    dir: TempDir,
    root: PathBuf,
}

impl LocalFixture {
    /// JSON-lines data files, per-frame PNG files and absolute episode
    /// starts 100 s apart.
    pub fn new(episodes: u64, frames: u64) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = dir.path().join("lerobot_test");
        write_dataset(&root, episodes, frames);
        Self { dir, root }
    }

    /// Parquet data files with the camera frames stored inline, an
    /// undecoded video feature, and no episode start times.
    pub fn parquet(episodes: u64, frames: u64) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = dir.path().join("lerobot_parquet");
        write_parquet_dataset(&root, episodes, frames);
        Self { dir, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A scratch directory next to the dataset.
    pub fn scratch(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::create_dir_all(&path).expect("create scratch dir");
        path
    }
}

pub const INFO_JSON: &str = r#"{
    "fps": 10,
    "robot_type": "test_arm",
    "repo_id": "lerobot/test",
    "chunks_size": 1000,
    "data_path": "data/chunk-{episode_chunk:03d}/episode_{episode_index:06d}.jsonl",
    "features": {
        "observation.state": {"dtype": "float32", "shape": [2], "names": ["x", "y"]},
        "action": {"dtype": "float32", "shape": [2], "names": null},
        "observation.images.top": {
            "dtype": "image",
            "shape": [2, 2, 3],
            "names": ["height", "width", "channels"]
        },
        "timestamp": {"dtype": "float32", "shape": [1], "names": null},
        "frame_index": {"dtype": "int64", "shape": [1], "names": null},
        "episode_index": {"dtype": "int64", "shape": [1], "names": null},
        "task_index": {"dtype": "int64", "shape": [1], "names": null}
    }
}"#;

fn write_dataset(root: &Path, episodes: u64, frames: u64) {
    let meta = root.join("meta");
    fs::create_dir_all(&meta).expect("create meta dir");
    fs::write(meta.join("info.json"), INFO_JSON).expect("write info.json");

    let mut episode_lines = String::new();
    for episode in 0..episodes {
        episode_lines.push_str(&format!(
            "{{\"episode_index\": {episode}, \"length\": {frames}, \"start_time\": {}}}\n",
            episode * 100
        ));
    }
    fs::write(meta.join("episodes.jsonl"), episode_lines).expect("write episodes.jsonl");

    let data = root.join("data").join("chunk-000");
    fs::create_dir_all(&data).expect("create data dir");
    for episode in 0..episodes {
        let mut rows = String::new();
        for frame in 0..frames {
            rows.push_str(&format!(
                "{{\"timestamp\": {:.1}, \"frame_index\": {frame}, \"episode_index\": {episode}, \
                 \"index\": {}, \"task_index\": 0, \
                 \"observation.state\": [{frame}.0, {episode}.0], \"action\": [0.5, -0.5]}}\n",
                frame as f64 / 10.0,
                episode * frames + frame
            ));
        }
        fs::write(data.join(format!("episode_{episode:06}.jsonl")), rows)
            .expect("write data file");

        let images = root
            .join("images")
            .join("observation.images.top")
            .join(format!("episode_{episode:06}"));
        fs::create_dir_all(&images).expect("create image dir");
        for frame in 0..frames {
            fs::write(
                images.join(format!("frame_{frame:06}.png")),
                fake_png(episode, frame),
            )
            .expect("write frame");
        }
    }
}

pub const PARQUET_INFO_JSON: &str = r#"{
    "codebase_version": "v2.0",
    "fps": 10,
    "robot_type": "test_arm",
    "chunks_size": 1000,
    "features": {
        "observation.state": {"dtype": "float32", "shape": [2], "names": ["x", "y"]},
        "action": {"dtype": "float32", "shape": [2], "names": null},
        "observation.images.top": {
            "dtype": "image",
            "shape": [2, 2, 3],
            "names": ["height", "width", "channel"]
        },
        "observation.images.wrist": {
            "dtype": "video",
            "shape": [96, 96, 3],
            "names": ["height", "width", "channel"]
        },
        "timestamp": {"dtype": "float32", "shape": [1], "names": null},
        "frame_index": {"dtype": "int64", "shape": [1], "names": null},
        "episode_index": {"dtype": "int64", "shape": [1], "names": null},
        "index": {"dtype": "int64", "shape": [1], "names": null},
        "task_index": {"dtype": "int64", "shape": [1], "names": null}
    }
}"#;

fn float_lists(rows: &[[f32; 2]]) -> ArrayRef {
    Arc::new(ListArray::from_iter_primitive::<Float32Type, _, _>(
        rows.iter()
            .map(|row| Some(row.iter().map(|v| Some(*v)).collect::<Vec<_>>())),
    ))
}

fn write_parquet_dataset(root: &Path, episodes: u64, frames: u64) {
    let meta = root.join("meta");
    fs::create_dir_all(&meta).expect("create meta dir");
    fs::write(meta.join("info.json"), PARQUET_INFO_JSON).expect("write info.json");

    let mut episode_lines = String::new();
    for episode in 0..episodes {
        episode_lines.push_str(&format!(
            "{{\"episode_index\": {episode}, \"tasks\": [\"push\"], \"length\": {frames}}}\n"
        ));
    }
    fs::write(meta.join("episodes.jsonl"), episode_lines).expect("write episodes.jsonl");

    let data = root.join("data").join("chunk-000");
    fs::create_dir_all(&data).expect("create data dir");
    for episode in 0..episodes {
        let frame_ids: Vec<u64> = (0..frames).collect();
        let timestamps: Vec<f32> = frame_ids.iter().map(|f| *f as f32 / 10.0).collect();
        let states: Vec<[f32; 2]> = frame_ids
            .iter()
            .map(|f| [*f as f32, episode as f32])
            .collect();
        let actions: Vec<[f32; 2]> = frame_ids.iter().map(|_| [0.5, -0.5]).collect();
        let images: Vec<Vec<u8>> = frame_ids.iter().map(|f| fake_png(episode, *f)).collect();
        let paths: Vec<String> = frame_ids.iter().map(|f| format!("frame_{f:06}.png")).collect();

        let image_column = StructArray::from(vec![
            (
                Arc::new(Field::new("bytes", DataType::Binary, true)),
                Arc::new(BinaryArray::from(
                    images.iter().map(Vec::as_slice).collect::<Vec<&[u8]>>(),
                )) as ArrayRef,
            ),
            (
                Arc::new(Field::new("path", DataType::Utf8, true)),
                Arc::new(StringArray::from(paths)) as ArrayRef,
            ),
        ]);
        let as_i64 = |values: Vec<u64>| -> ArrayRef {
            Arc::new(Int64Array::from(
                values.into_iter().map(|v| v as i64).collect::<Vec<_>>(),
            ))
        };

        let batch = RecordBatch::try_from_iter(vec![
            ("observation.state", float_lists(&states)),
            ("action", float_lists(&actions)),
            ("observation.images.top", Arc::new(image_column) as ArrayRef),
            ("timestamp", Arc::new(Float32Array::from(timestamps)) as ArrayRef),
            ("frame_index", as_i64(frame_ids.clone())),
            ("episode_index", as_i64(vec![episode; frames as usize])),
            (
                "index",
                as_i64(frame_ids.iter().map(|f| episode * frames + f).collect()),
            ),
            ("task_index", as_i64(vec![0; frames as usize])),
        ])
        .expect("build record batch");

        let file = fs::File::create(data.join(format!("episode_{episode:06}.parquet")))
            .expect("create parquet file");
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).expect("parquet writer");
        writer.write(&batch).expect("write parquet rows");
        writer.close().expect("close parquet file");
    }
}
